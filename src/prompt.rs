//! Operator prompts. The parsing rules live in plain functions so they can be tested
//! without a terminal.

use inquire::{InquireError, Text};

use crate::report::DEFAULT_SUFFIX;

/// Empty (or blank) input becomes [DEFAULT_SUFFIX].
pub fn suffix_or_default(input: &str) -> String {
    match input.trim() {
        "" => DEFAULT_SUFFIX.to_string(),
        suffix => suffix.to_string(),
    }
}

/// Anything other than an explicit "n"/"no" counts as yes, including empty input.
pub fn is_affirmative(input: &str) -> bool {
    !matches!(input.trim().to_ascii_lowercase().as_str(), "n" | "no")
}

pub fn ask_suffix() -> Result<String, InquireError> {
    let input = Text::new("File name suffix for this run:")
        .with_help_message("e.g. test_01, leave empty for \"default\"")
        .prompt()?;
    Ok(suffix_or_default(&input))
}

/// Ask a yes/no question that defaults to yes.
pub fn confirm(question: &str) -> Result<bool, InquireError> {
    let input = Text::new(question)
        .with_help_message("y/n, default y")
        .prompt()?;
    Ok(is_affirmative(&input))
}
