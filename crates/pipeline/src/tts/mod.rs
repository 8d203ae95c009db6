//! Text-to-speech clients

mod elevenlabs;
mod google;

pub use elevenlabs::{ElevenLabsConfig, ElevenLabsTts};
pub use google::{chunk_text, GoogleTts, GoogleTtsConfig};
