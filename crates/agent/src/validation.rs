//! Request validation
//!
//! Checks applied before anything is recorded or dispatched. Every failure is
//! `Error::MalformedPayload`.

use safespace_core::{Error, Payload, Result};

pub const MAX_SESSION_ID_LEN: usize = 128;
pub const MAX_TEXT_CHARS: usize = 8000;
pub const MAX_SYNTHESIS_CHARS: usize = 5000;
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_AUDIO_BYTES: usize = 50 * 1024 * 1024;

pub const IMAGE_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/bmp",
    "image/webp",
];

pub const AUDIO_FORMATS: &[&str] = &["wav", "mp3", "m4a", "ogg", "flac", "webm"];

fn malformed(message: impl Into<String>) -> Error {
    Error::MalformedPayload(message.into())
}

pub fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty() || session_id.len() > MAX_SESSION_ID_LEN {
        return Err(malformed(format!(
            "session id must be 1 to {} characters",
            MAX_SESSION_ID_LEN
        )));
    }
    if !session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(malformed(
            "session id may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

fn validate_text(message: &str, max_chars: usize) -> Result<()> {
    if message.trim().is_empty() {
        return Err(malformed("message is empty"));
    }
    let chars = message.chars().count();
    if chars > max_chars {
        return Err(malformed(format!(
            "message is {} characters, limit is {}",
            chars, max_chars
        )));
    }
    Ok(())
}

pub fn validate_payload(payload: &Payload) -> Result<()> {
    match payload {
        Payload::Text { message } => validate_text(message, MAX_TEXT_CHARS),
        Payload::Image {
            data, mime_type, ..
        } => {
            if data.is_empty() {
                return Err(malformed("image is empty"));
            }
            if data.len() > MAX_IMAGE_BYTES {
                return Err(malformed(format!(
                    "image is {} bytes, limit is {}",
                    data.len(),
                    MAX_IMAGE_BYTES
                )));
            }
            let mime = mime_type.to_ascii_lowercase();
            if !IMAGE_MIME_TYPES.contains(&mime.as_str()) {
                return Err(malformed(format!("unsupported image type '{}'", mime_type)));
            }
            Ok(())
        }
        Payload::Audio { data, format } => {
            if data.is_empty() {
                return Err(malformed("audio is empty"));
            }
            if data.len() > MAX_AUDIO_BYTES {
                return Err(malformed(format!(
                    "audio is {} bytes, limit is {}",
                    data.len(),
                    MAX_AUDIO_BYTES
                )));
            }
            let format = format.to_ascii_lowercase();
            if !AUDIO_FORMATS.contains(&format.as_str()) {
                return Err(malformed(format!("unsupported audio format '{}'", format)));
            }
            Ok(())
        }
    }
}

pub fn validate_synthesis_text(text: &str) -> Result<()> {
    validate_text(text, MAX_SYNTHESIS_CHARS)
}
