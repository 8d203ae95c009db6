//! Speech-to-text clients

mod whisper;

pub use whisper::{WhisperConfig, WhisperStt};
