//! Photo description tool backing the validator's `act` step.
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::groq::GroqClient;
use crate::model::ModelError;

/// Prompt sent alongside the image.
pub const DESCRIBE_PROMPT: &str = "Describe what's happening in this image.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescribeError {
    #[error("PHOTO/NOT_FOUND: {0}")]
    NotFound(String),

    #[error("PHOTO/IO: {0}")]
    Io(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Produces a text description of a photo. It does not judge validity.
pub trait PhotoDescriber: Send + Sync {
    fn describe(&self, photo_path: &str) -> Result<String, DescribeError>;
}

/// Describer backed by the vision model.
#[derive(Debug, Clone)]
pub struct VisionDescriber {
    client: Arc<GroqClient>,
}

impl VisionDescriber {
    pub fn new(client: Arc<GroqClient>) -> Self {
        Self { client }
    }
}

impl PhotoDescriber for VisionDescriber {
    fn describe(&self, photo_path: &str) -> Result<String, DescribeError> {
        let path = Path::new(photo_path);
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DescribeError::NotFound(photo_path.to_string()),
            _ => DescribeError::Io(format!("{}: {}", photo_path, e)),
        })?;

        let data_uri = image_data_uri(path, &bytes);
        tracing::debug!(photo = %photo_path, bytes = bytes.len(), "requesting photo description");
        Ok(self.client.describe_image(&data_uri, DESCRIBE_PROMPT)?)
    }
}

/// Encodes image bytes as a base64 `data:` URI, MIME type from the extension.
pub fn image_data_uri(path: &Path, bytes: &[u8]) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let mime = match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    };
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use w2g_core::config::ValidatorConfig;

    #[test]
    fn data_uri_uses_extension_mime() {
        assert_eq!(
            image_data_uri(Path::new("a/photo.PNG"), b"hi"),
            "data:image/png;base64,aGk="
        );
        assert_eq!(
            image_data_uri(Path::new("a/photo"), b"hi"),
            "data:image/jpeg;base64,aGk="
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("nope.jpg");
        let client = GroqClient::from_config(&ValidatorConfig::default()).unwrap();
        let describer = VisionDescriber::new(Arc::new(client));

        let err = describer.describe(&missing.to_string_lossy()).unwrap_err();
        assert!(matches!(err, DescribeError::NotFound(_)));
    }
}
