use colored::Colorize;
use std::fmt::Display;

/// Writes a single warning line in the standard format.
pub fn show_warning(
    w: &mut dyn std::fmt::Write,
    subject: Option<&str>,
    message: impl Display,
) -> std::fmt::Result {
    match subject {
        Some(subject) => write!(w, "{}: {} {}", subject, "warning:".yellow().bold(), message),
        None => write!(w, "{} {}", "warning:".yellow().bold(), message),
    }
}
