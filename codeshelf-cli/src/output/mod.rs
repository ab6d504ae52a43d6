//! Output formatting for CLI.

mod json;
mod text;

pub use json::{CleanOutput, JsonFormatter, RecordOutput, ResolutionOutput};
pub use text::TextFormatter;
#[cfg(test)]
mod tests;
