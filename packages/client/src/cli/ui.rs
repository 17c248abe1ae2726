//! Terminal helpers.

use std::io::Write;

/// Redisplay the prompt after printing an incoming line
pub fn redisplay_prompt(username: &str) {
    print!("{}> ", username);
    std::io::stdout().flush().ok();
}
