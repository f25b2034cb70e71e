//! Encoded camera frames

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// A single captured frame in an image container format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            bytes,
        }
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// Decode a `data:<mime>;base64,<payload>` URL or a bare base64 JPEG
    pub fn from_data_url(url: &str) -> Option<Self> {
        let (mime_type, payload) = match url.strip_prefix("data:") {
            Some(rest) => {
                let (meta, payload) = rest.split_once(',')?;
                let mime = meta.strip_suffix(";base64")?;
                (mime.to_string(), payload)
            }
            None => ("image/jpeg".to_string(), url),
        };

        let bytes = BASE64.decode(payload.trim()).ok()?;
        if bytes.is_empty() {
            return None;
        }
        Some(Self { mime_type, bytes })
    }
}
