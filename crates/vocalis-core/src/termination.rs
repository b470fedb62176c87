//! Completion signal detection.
//!
//! A generated line containing [`COMPLETION_SIGNAL`] anywhere ends the conversation.
//! Matching is an exact, case-sensitive substring test on the raw text.

/// Literal token the generation backend emits when a meeting is booked or a persona walks away.
pub const COMPLETION_SIGNAL: &str = "TERMINATE";

/// True if any non-empty line of the round carries the completion signal.
pub fn is_complete(sales: Option<&str>, consumer: Option<&str>) -> bool {
    [sales, consumer]
        .into_iter()
        .flatten()
        .any(|line| !line.is_empty() && line.contains(COMPLETION_SIGNAL))
}

/// Remove every occurrence of the signal and tidy the whitespace it leaves behind.
pub fn strip_completion_signal(text: &str) -> String {
    if !text.contains(COMPLETION_SIGNAL) {
        return text.trim().to_string();
    }
    text.replace(COMPLETION_SIGNAL, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
