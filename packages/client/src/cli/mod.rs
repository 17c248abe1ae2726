//! Interactive terminal client.

mod domain;
mod formatter;
mod runner;
mod session;
mod ui;

pub use domain::Command;
pub use formatter::MessageFormatter;
pub use runner::run_client;
