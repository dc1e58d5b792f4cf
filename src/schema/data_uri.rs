//! Data URI parsing for inline document payloads.
//!
//! Documents travel inline as `data:<mimetype>;base64,<payload>`. Only the
//! base64 form is accepted; percent-encoded data URIs are rejected.

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Literal prefix every data URI must start with.
pub const DATA_URI_PREFIX: &str = "data:";

const BASE64_MARKER: &str = ";base64";

/// Reasons a string is not an acceptable data URI.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataUriError {
    /// Does not start with `data:`.
    #[error("must start with \"data:\"")]
    MissingPrefix,

    /// No `,` between the metadata and the payload.
    #[error("must separate metadata and payload with ','")]
    MissingSeparator,

    /// Metadata does not declare `;base64`.
    #[error("must declare base64 encoding (\";base64\")")]
    NotBase64,

    /// Mime type is empty or not `type/subtype`.
    #[error("must declare a media MIME type, got {0:?}")]
    InvalidMimeType(String),

    /// Payload is empty.
    #[error("payload must not be empty")]
    EmptyPayload,

    /// Payload is not valid standard base64.
    #[error("payload is not valid base64")]
    InvalidPayload,
}

/// A parsed, well-formed base64 data URI.
///
/// Only [`DataUri::parse`] builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    mime_type: String,
    data: String,
}

impl DataUri {
    /// Parse and check a data URI string.
    pub fn parse(raw: &str) -> Result<Self, DataUriError> {
        let rest = raw
            .strip_prefix(DATA_URI_PREFIX)
            .ok_or(DataUriError::MissingPrefix)?;
        let (meta, payload) = rest.split_once(',').ok_or(DataUriError::MissingSeparator)?;

        if !meta.ends_with(BASE64_MARKER) {
            return Err(DataUriError::NotBase64);
        }

        let mime_type = meta.split(';').next().unwrap_or_default();
        if !is_mime_type(mime_type) {
            return Err(DataUriError::InvalidMimeType(mime_type.to_string()));
        }

        if payload.is_empty() {
            return Err(DataUriError::EmptyPayload);
        }
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|_| DataUriError::InvalidPayload)?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: payload.to_string(),
        })
    }

    /// Media type, e.g. `application/pdf`.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload exactly as it appeared in the URI.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Decode the payload bytes.
    pub fn decode(&self) -> Result<Vec<u8>, DataUriError> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|_| DataUriError::InvalidPayload)
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{};base64,{}", DATA_URI_PREFIX, self.mime_type, self.data)
    }
}

fn is_mime_type(s: &str) -> bool {
    match s.split_once('/') {
        Some((kind, subtype)) => {
            !kind.is_empty()
                && !subtype.is_empty()
                && !subtype.contains('/')
                && !s.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text_uri() {
        let uri = DataUri::parse("data:text/plain;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime_type(), "text/plain");
        assert_eq!(uri.data(), "aGVsbG8=");
        assert_eq!(uri.decode().unwrap(), b"hello");
        assert_eq!(uri.to_string(), "data:text/plain;base64,aGVsbG8=");
    }

    #[test]
    fn test_parse_keeps_mime_without_parameters() {
        let uri = DataUri::parse("data:text/plain;charset=utf-8;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime_type(), "text/plain");
        assert_eq!(uri.decode().unwrap(), b"hello");
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        assert_eq!(
            DataUri::parse("not-a-data-uri"),
            Err(DataUriError::MissingPrefix)
        );
    }

    #[test]
    fn test_parse_rejects_bad_layouts() {
        assert_eq!(
            DataUri::parse("data:image/png;base64"),
            Err(DataUriError::MissingSeparator)
        );
        assert_eq!(
            DataUri::parse("data:image/png,aGVsbG8="),
            Err(DataUriError::NotBase64)
        );
        assert_eq!(
            DataUri::parse("data:;base64,aGVsbG8="),
            Err(DataUriError::InvalidMimeType(String::new()))
        );
        assert_eq!(
            DataUri::parse("data:png;base64,aGVsbG8="),
            Err(DataUriError::InvalidMimeType("png".to_string()))
        );
        assert_eq!(
            DataUri::parse("data:image/png;base64,"),
            Err(DataUriError::EmptyPayload)
        );
        assert_eq!(
            DataUri::parse("data:image/png;base64,@@not base64@@"),
            Err(DataUriError::InvalidPayload)
        );
    }
}
