//! CLI command implementations.

pub mod clean;
pub mod config;
pub mod history;
pub mod resolve;
pub mod scan;
pub mod share;
pub mod watch;

/// Bad user input; exits with [`crate::ExitCode::InvalidInput`].
#[derive(Debug)]
pub struct InvalidInput(pub String);

impl std::fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvalidInput {}
