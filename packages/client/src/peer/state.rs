//! Negotiation states and roles.

/// Which side of the offer/answer exchange this link plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Learned about the remote through `user_joined`; sends the offer
    Caller,
    /// Learned about the remote through its `offer`; sends the answer
    Callee,
}

/// ```text
/// Idle ─┬─ caller ─> Offering ──────────── answer ─┐
///       └─ callee ─> AwaitingOffer ─> DescriptionExchanged ─> IceExchanging ─> Connected
///
/// any state ─> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    Offering,
    AwaitingOffer,
    DescriptionExchanged,
    IceExchanging,
    Connected,
    Closed,
}

impl NegotiationState {
    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }
}
