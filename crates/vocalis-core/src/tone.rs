//! Tone markers: `*confident* Hello there.` → tone `confident`, text `Hello there.`
//!
//! Generated lines open with a delivery cue wrapped in asterisks. The cue is stripped
//! from what is shown and spoken and forwarded to speech synthesis as a tone label.

use crate::termination::strip_completion_signal;

const TONE_DELIMITER: char = '*';

/// Split the first `*...*` span with at least one non-`*` character inside off `input`.
///
/// Returns the lower-cased, trimmed tone (if any) and the remaining text, trimmed.
/// Empty pairs such as `**` are skipped, and markdown bold (`**tone**`) loses both
/// delimiter pairs. A blank span is removed but yields no tone. Never fails: without
/// a matching span the tone is absent and the text is the trimmed input.
pub fn extract_tone(input: &str) -> (Option<String>, String) {
    let marks: Vec<usize> = input.match_indices(TONE_DELIMITER).map(|(i, _)| i).collect();
    let width = TONE_DELIMITER.len_utf8();
    let Some((open, close)) = marks
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .find(|&(open, close)| close > open + width)
    else {
        return (None, input.trim().to_string());
    };

    let tone = input[open + width..close].trim().to_lowercase();
    let mut before = &input[..open];
    let mut after = &input[close + width..];
    while let (Some(b), Some(a)) = (
        before.strip_suffix(TONE_DELIMITER),
        after.strip_prefix(TONE_DELIMITER),
    ) {
        before = b;
        after = a;
    }

    let (before, after) = (before.trim(), after.trim());
    let text = match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (false, true) => before.to_string(),
        (false, false) => format!("{} {}", before, after),
    };
    ((!tone.is_empty()).then_some(tone), text)
}

/// A generated line ready for display, history and speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    pub tone: Option<String>,
    /// Tone marker and completion signal removed.
    pub text: String,
}

/// Extract the tone, then drop the completion signal so it is never displayed or spoken.
/// Termination is decided on the raw line, not on this output.
pub fn normalize_line(raw: &str) -> NormalizedLine {
    let (tone, text) = extract_tone(raw);
    NormalizedLine {
        tone,
        text: strip_completion_signal(&text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_has_no_tone() {
        assert_eq!(extract_tone("  just talking  "), (None, "just talking".to_string()));
        assert_eq!(extract_tone(""), (None, String::new()));
    }

    #[test]
    fn leading_marker_is_split_off() {
        assert_eq!(
            extract_tone("*confident* Hi, got a minute?"),
            (Some("confident".to_string()), "Hi, got a minute?".to_string())
        );
        assert_eq!(
            extract_tone("*  Skeptical *     Not really.   "),
            (Some("skeptical".to_string()), "Not really.".to_string())
        );
    }

    #[test]
    fn only_first_span_is_removed() {
        let (tone, text) = extract_tone("*friendly* Great! *laughs* Let's do it.");
        assert_eq!(tone.as_deref(), Some("friendly"));
        assert_eq!(text, "Great! *laughs* Let's do it.");
    }

    #[test]
    fn marker_later_in_line() {
        let (tone, text) = extract_tone("Well... *doubtful* I'm not sure.");
        assert_eq!(tone.as_deref(), Some("doubtful"));
        assert_eq!(text, "Well... I'm not sure.");
    }

    #[test]
    fn unmatched_or_empty_delimiters_are_left_alone() {
        assert_eq!(extract_tone("5 * 3 is fifteen"), (None, "5 * 3 is fifteen".to_string()));
        assert_eq!(extract_tone("** hmm"), (None, "** hmm".to_string()));
    }

    #[test]
    fn empty_pair_is_skipped_for_the_next_span() {
        assert_eq!(
            extract_tone("**Confident** Hello there."),
            (Some("confident".to_string()), "Hello there.".to_string())
        );
        assert_eq!(
            extract_tone("Great! **Warm** Let's talk."),
            (Some("warm".to_string()), "Great! Let's talk.".to_string())
        );
    }

    #[test]
    fn blank_span_is_removed_without_a_tone() {
        assert_eq!(extract_tone("* * hi"), (None, "hi".to_string()));
    }

    #[test]
    fn normalize_drops_completion_signal() {
        let line = normalize_line("*skeptical* Not really. TERMINATE");
        assert_eq!(line.tone.as_deref(), Some("skeptical"));
        assert_eq!(line.text, "Not really.");
    }
}
