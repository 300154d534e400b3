//! Text rules for notification content.
//!
//! Two independent policies share one length cap:
//! - log text stays as close to the original as possible (emoji included),
//!   flattened to a single line;
//! - speech text drops everything outside the Basic Multilingual Plane,
//!   which most TTS voices cannot pronounce.

/// Maximum number of characters kept by either policy.
pub const MAX_CHARS: usize = 800;

/// Substituted when a notification carries no text at all.
pub const EMPTY_PLACEHOLDER: &str = "ohne Text";

const TRUNCATION_MARKER: &str = " …";

fn is_line_control(ch: char) -> bool {
    matches!(ch, '\r' | '\n' | '\t')
}

fn non_empty(text: Option<&str>) -> &str {
    match text {
        Some(t) if !t.is_empty() => t,
        _ => EMPTY_PLACEHOLDER,
    }
}

fn truncate(text: String) -> String {
    match text.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(&text[..cut]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => text,
    }
}

/// Single-line, length-capped text for the log trail.
pub fn for_log(text: Option<&str>) -> String {
    let flat: String = non_empty(text)
        .chars()
        .map(|ch| if is_line_control(ch) { ' ' } else { ch })
        .collect();
    truncate(flat)
}

/// Length-capped text that a speech backend can pronounce.
pub fn for_speech(text: Option<&str>) -> String {
    let filtered: String = non_empty(text)
        .chars()
        .filter(|&ch| !is_line_control(ch) && u32::from(ch) <= 0xFFFF)
        .collect();
    truncate(filtered)
}
