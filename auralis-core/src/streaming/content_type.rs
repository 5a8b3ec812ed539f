//! MIME type selection for audio files

use std::path::Path;

/// Fallback for `.wav` files that the MIME table does not know.
const WAV_FALLBACK: &str = "audio/wav";
/// Fallback for everything else.
const DEFAULT_AUDIO_TYPE: &str = "audio/mpeg";

/// Pick a `Content-Type` for a file from its name alone.
///
/// Uses the extension table from `mime_guess`; when it has no answer the
/// result is `audio/wav` for names ending in `.wav` and `audio/mpeg`
/// otherwise. File contents are never inspected.
pub fn content_type_for(path: &Path) -> String {
    if let Some(mime) = mime_guess::from_path(path).first() {
        return mime.essence_str().to_string();
    }

    let is_wav = path
        .to_str()
        .is_some_and(|name| name.ends_with(".wav"));
    if is_wav {
        WAV_FALLBACK.to_string()
    } else {
        DEFAULT_AUDIO_TYPE.to_string()
    }
}
