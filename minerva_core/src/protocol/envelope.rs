/**
 * The Barista response envelope.
 *
 * Every reply from the batch endpoints is a JSON object of the form:
 * ```json
 * {
 *   "message-type": "success",
 *   "message": "success: 0",
 *   "signal": "merge",
 *   "intention": "action",
 *   "uid": "GOC:someone",
 *   "packet-id": "...",
 *   "data": { ... }
 * }
 * ```
 *
 * The manager only reads `message-type`, `message` and `signal`; the rest is
 * kept so listeners can inspect it. All fields are optional on the wire. A
 * reply missing `message-type` or `message` is not usable and is treated as
 * a transport failure by the manager.
 */
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::constants::DEEP_MANAGER_ERROR;

// ---------------------------------------------------------------------------
// MessageType / Signal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Error,
    Warning,
    Success,
}

impl MessageType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "success" => Some(Self::Success),
            _ => None,
        }
    }
}

/// Classifies what changed on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Incremental change to merge into the client's model.
    Merge,
    /// The whole model should be replaced.
    Rebuild,
    /// Informational result not tied to model content.
    Meta,
}

impl Signal {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "merge" => Some(Self::Merge),
            "rebuild" => Some(Self::Rebuild),
            "meta" => Some(Self::Meta),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention: Option<String>,

    /// Identifier of the user the server attributed the batch to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided_by: Option<Value>,

    /// Free-form detail; a string or an object depending on the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commentary: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /**
     * Parses a raw response body.
     *
     * Anything that is not a JSON object fails here; a JSON object with
     * missing fields parses fine and is judged by `is_usable()`.
     */
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /**
     * Builds the stand-in envelope used when no usable reply exists.
     *
     * `message_type` is always `"error"`; the transport's diagnostic, if
     * any, goes into `commentary`.
     */
    pub fn synthesized_error(commentary: Option<String>) -> Self {
        Self {
            message_type: Some("error".to_string()),
            message: Some(DEEP_MANAGER_ERROR.to_string()),
            commentary: commentary.map(Value::String),
            ..Default::default()
        }
    }

    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn signal(&self) -> Option<&str> {
        self.signal.as_deref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn commentary(&self) -> Option<&Value> {
        self.commentary.as_ref()
    }

    /// Both `message_type` and `message` are present and non-empty.
    pub fn is_usable(&self) -> bool {
        let filled = |field: Option<&str>| field.is_some_and(|v| !v.is_empty());
        filled(self.message_type()) && filled(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_envelope() {
        let body = r#"{
            "message-type": "success",
            "message": "success: 0",
            "signal": "merge",
            "intention": "action",
            "packet-id": "p1",
            "data": {"id": "gomodel:1"}
        }"#;

        let envelope = Envelope::from_json(body).expect("valid envelope");
        assert_eq!(envelope.message_type(), Some("success"));
        assert_eq!(envelope.signal(), Some("merge"));
        assert_eq!(envelope.packet_id.as_deref(), Some("p1"));
        assert_eq!(envelope.data().unwrap()["id"], "gomodel:1");
        assert!(envelope.is_usable());
    }

    #[test]
    fn test_empty_object_is_not_usable() {
        let envelope = Envelope::from_json("{}").unwrap();
        assert!(!envelope.is_usable());
    }

    #[test]
    fn test_missing_message_is_not_usable() {
        let envelope = Envelope::from_json(r#"{"message-type":"error"}"#).unwrap();
        assert!(!envelope.is_usable());
    }

    #[test]
    fn test_non_object_fails() {
        assert!(Envelope::from_json("[1, 2]").is_err());
        assert!(Envelope::from_json("<html>").is_err());
    }

    #[test]
    fn test_synthesized_error() {
        let envelope = Envelope::synthesized_error(Some("connection refused".into()));
        assert_eq!(envelope.message_type(), Some("error"));
        assert_eq!(envelope.message(), Some(DEEP_MANAGER_ERROR));
        assert_eq!(
            envelope.commentary(),
            Some(&Value::String("connection refused".into()))
        );
        assert!(envelope.is_usable());
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(MessageType::parse("warning"), Some(MessageType::Warning));
        assert_eq!(MessageType::parse("Success"), None);
        assert_eq!(Signal::parse("rebuild"), Some(Signal::Rebuild));
        assert_eq!(Signal::parse(""), None);
    }
}
