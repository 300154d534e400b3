//! Best-effort extraction of app name and message from raw notification content.
//!
//! Expected shape (anything may be missing):
//!
//! ```json
//! { "app_info": { "display_name": "Mail" },
//!   "visual": { "bindings": [ { "texts": ["Title", "Body", "..."] } ] } }
//! ```

use serde_json::Value;
use tracing::debug;

use super::RawNotification;

/// Used when the host does not tell which app posted a notification.
pub const UNKNOWN_APP: &str = "Unbekannt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub app_name: String,
    pub message: Option<String>,
}

/// Outcome of walking the content document.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Extraction {
    Record(NotificationRecord),
    /// The document did not have the expected structure. Carries the app
    /// name if it was read before the failure.
    Failed { app_name: Option<String> },
}

/// Extract (app name, message). Never fails; malformed content degrades to
/// placeholders.
pub fn extract_record(raw: &RawNotification) -> NotificationRecord {
    match extract(&raw.content) {
        Extraction::Record(record) => record,
        Extraction::Failed { app_name } => {
            debug!("Malformed notification {}, using fallback", raw.id);
            NotificationRecord {
                app_name: app_name.unwrap_or_else(|| UNKNOWN_APP.to_string()),
                message: None,
            }
        }
    }
}

fn extract(content: &Value) -> Extraction {
    let app_name = match content.pointer("/app_info/display_name") {
        None | Some(Value::Null) => UNKNOWN_APP.to_string(),
        Some(Value::String(name)) => name.clone(),
        Some(_) => return Extraction::Failed { app_name: None },
    };

    let bindings = match content.pointer("/visual/bindings") {
        None | Some(Value::Null) => return record(app_name, None),
        Some(Value::Array(bindings)) => bindings,
        Some(_) => return Extraction::Failed { app_name: Some(app_name) },
    };

    let Some(binding) = bindings.first() else {
        return record(app_name, None);
    };

    let elements = match binding.get("texts") {
        Some(Value::Array(elements)) => elements,
        _ => return Extraction::Failed { app_name: Some(app_name) },
    };

    let texts: Vec<&str> = elements
        .iter()
        .filter_map(text_of)
        .filter(|t| !t.is_empty())
        .collect();

    let Some((title, rest)) = texts.split_first() else {
        return record(app_name, None);
    };

    let body = rest.join(" ");
    let message = if body.is_empty() {
        (*title).to_string()
    } else {
        format!("{title} – {body}")
    };

    record(app_name, Some(message))
}

/// Text elements are either plain strings or `{ "text": "..." }` objects.
fn text_of(element: &Value) -> Option<&str> {
    match element {
        Value::String(s) => Some(s.as_str()),
        Value::Object(_) => element.get("text").and_then(|t| t.as_str()),
        _ => None,
    }
}

fn record(app_name: String, message: Option<String>) -> Extraction {
    Extraction::Record(NotificationRecord { app_name, message })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::source::NotificationId;

    fn raw(content: Value) -> RawNotification {
        RawNotification {
            id: NotificationId(1),
            content,
        }
    }

    fn extracted(content: Value) -> (String, Option<String>) {
        let r = extract_record(&raw(content));
        (r.app_name, r.message)
    }

    #[test]
    fn title_and_body_joined() {
        let content = json!({
            "app_info": { "display_name": "Mail" },
            "visual": { "bindings": [ { "texts": ["Anna", "Bist du", "da?"] } ] },
        });
        assert_eq!(
            extracted(content),
            ("Mail".into(), Some("Anna – Bist du da?".into()))
        );
    }

    #[test]
    fn title_only() {
        let content = json!({
            "app_info": { "display_name": "Mail" },
            "visual": { "bindings": [ { "texts": ["Hi"] } ] },
        });
        assert_eq!(extracted(content), ("Mail".into(), Some("Hi".into())));
    }

    #[test]
    fn empty_elements_are_skipped() {
        let content = json!({
            "app_info": { "display_name": "Chat" },
            "visual": {
                "bindings": [{ "texts": ["", {"text": "Ping"}, {"text": null}, "", "pong"] }]
            },
        });
        assert_eq!(extracted(content), ("Chat".into(), Some("Ping – pong".into())));
    }

    #[test]
    fn missing_display_name_uses_placeholder() {
        let content = json!({ "visual": { "bindings": [ { "texts": ["Hi"] } ] } });
        assert_eq!(extracted(content), ("Unbekannt".into(), Some("Hi".into())));
    }

    #[test]
    fn missing_or_empty_bindings_yield_no_message() {
        assert_eq!(
            extracted(json!({ "app_info": { "display_name": "Mail" } })),
            ("Mail".into(), None)
        );
        assert_eq!(
            extracted(json!({
                "app_info": { "display_name": "Mail" },
                "visual": { "bindings": [] },
            })),
            ("Mail".into(), None)
        );
        assert_eq!(
            extracted(json!({
                "app_info": { "display_name": "Mail" },
                "visual": { "bindings": [ { "texts": ["", {"text": ""}] } ] },
            })),
            ("Mail".into(), None)
        );
    }

    #[test]
    fn wrong_types_degrade_gracefully() {
        assert_eq!(
            extracted(json!({ "app_info": { "display_name": 42 } })),
            ("Unbekannt".into(), None)
        );
        assert_eq!(
            extracted(json!({
                "app_info": { "display_name": "Mail" },
                "visual": { "bindings": "x" },
            })),
            ("Mail".into(), None)
        );
        assert_eq!(
            extracted(json!({
                "app_info": { "display_name": "Mail" },
                "visual": { "bindings": [{ "texts": 3 }] },
            })),
            ("Mail".into(), None)
        );
        assert_eq!(extracted(json!("not an object")), ("Unbekannt".into(), None));
    }
}
