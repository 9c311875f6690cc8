//! Turns uploaded photos into inline data URIs for the vision model.

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

use crate::models::{EncodedImagePayload, UploadedImage};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Please select an image file.")]
    Missing,
    #[error("Invalid file type. Please upload an image.")]
    NotAnImage(String),
    #[error("malformed data URI")]
    MalformedDataUri,
    #[error("invalid base64 payload: {0}")]
    Base64(String),
}

pub fn encode_image(image: Option<&UploadedImage>) -> Result<EncodedImagePayload, EncodeError> {
    let image = image.filter(|img| !img.is_empty()).ok_or(EncodeError::Missing)?;
    if !image.mime_type.starts_with("image/") {
        return Err(EncodeError::NotAnImage(image.mime_type.clone()));
    }
    let encoded = STANDARD.encode(&image.bytes);
    Ok(EncodedImagePayload { data_uri: format!("data:{};base64,{}", image.mime_type, encoded) })
}

/// Best-effort MIME detection from magic bytes, for uploads that arrive without a usable content type.
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|format| format.to_mime_type())
}

impl EncodedImagePayload {
    /// Splits the URI into `(mime_type, base64_payload)`.
    pub fn parts(&self) -> Result<(&str, &str), EncodeError> {
        self.data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .filter(|(mime, _)| !mime.is_empty())
            .ok_or(EncodeError::MalformedDataUri)
    }

    #[cfg(test)]
    pub fn decode(&self) -> Result<Vec<u8>, EncodeError> {
        let (_, payload) = self.parts()?;
        STANDARD.decode(payload).map_err(|e| EncodeError::Base64(e.to_string()))
    }
}
