//! HTTP request handlers organized by functionality

pub mod error;
pub mod streaming;
pub mod survey;

// Re-export handler functions
pub use error::ApiError;
pub use streaming::{preflight_audio, stream_audio};
pub use survey::{
    AudioView, create_evaluation, create_noise_response, create_user, get_audio, get_question,
    health, list_audios, list_questions,
};
