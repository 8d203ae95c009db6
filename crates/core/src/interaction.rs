//! User interactions
//!
//! An `Interaction` is one unit of user input for a session. It is immutable
//! once built; the constructors keep `modality` consistent with the payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Input modality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Image,
    Audio,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
            Modality::Audio => "audio",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw interaction payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Text {
        message: String,
    },
    Image {
        #[serde(with = "crate::encoding::base64_bytes")]
        data: Vec<u8>,
        mime_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },
    Audio {
        #[serde(with = "crate::encoding::base64_bytes")]
        data: Vec<u8>,
        format: String,
    },
}

impl Payload {
    pub fn modality(&self) -> Modality {
        match self {
            Payload::Text { .. } => Modality::Text,
            Payload::Image { .. } => Modality::Image,
            Payload::Audio { .. } => Modality::Audio,
        }
    }
}

/// A single recorded user interaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interaction {
    id: Uuid,
    session_id: String,
    modality: Modality,
    payload: Payload,
    timestamp: DateTime<Utc>,
}

impl Interaction {
    /// Build an interaction from any payload
    pub fn new(session_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            modality: payload.modality(),
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn text(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            session_id,
            Payload::Text {
                message: message.into(),
            },
        )
    }

    pub fn image(
        session_id: impl Into<String>,
        data: Vec<u8>,
        mime_type: impl Into<String>,
        prompt: Option<String>,
    ) -> Self {
        Self::new(
            session_id,
            Payload::Image {
                data,
                mime_type: mime_type.into(),
                prompt,
            },
        )
    }

    pub fn audio(session_id: impl Into<String>, data: Vec<u8>, format: impl Into<String>) -> Self {
        Self::new(
            session_id,
            Payload::Audio {
                data,
                format: format.into(),
            },
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modality_follows_payload() {
        assert_eq!(Interaction::text("s1", "hi").modality(), Modality::Text);
        assert_eq!(
            Interaction::image("s1", vec![1, 2], "image/png", None).modality(),
            Modality::Image
        );
        assert_eq!(
            Interaction::audio("s1", vec![0; 4], "wav").modality(),
            Modality::Audio
        );
    }

    #[test]
    fn test_binary_payload_serializes_as_base64() {
        let interaction = Interaction::audio("s1", b"RIFF".to_vec(), "wav");
        let json = serde_json::to_value(&interaction).unwrap();
        assert_eq!(json["modality"], "audio");
        assert_eq!(json["payload"]["type"], "audio");
        assert_eq!(json["payload"]["data"], "UklGRg==");
    }

    #[test]
    fn test_payload_deserializes_base64() {
        let payload: Payload = serde_json::from_str(
            r#"{"type":"image","data":"AQID","mime_type":"image/png"}"#,
        )
        .unwrap();
        match payload {
            Payload::Image { data, prompt, .. } => {
                assert_eq!(data, vec![1, 2, 3]);
                assert!(prompt.is_none());
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }
}
