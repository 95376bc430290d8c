//! Upload endpoint contract: request shape and response parsing.
//!
//! The transport lives in `bodyfat-io`; everything that decides what a
//! response *means* lives here so it can be tested without a browser.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::snapshot::CallerId;
use crate::types::{FileCandidate, PhotoType};

/// Header carrying the caller identity.
pub const CALLER_HEADER: &str = "X-User-Id";

/// Multipart field holding the file.
pub const FILE_FIELD: &str = "file";

/// Multipart field holding the photo type.
pub const PHOTO_TYPE_FIELD: &str = "photo_type";

/// Message used when the server gives no detail.
pub const GENERIC_UPLOAD_FAILURE: &str = "Failed to upload image";

/// Errors from the upload step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// No caller identity was available; no request was sent.
    #[error("caller unidentified: the host did not provide a user id")]
    CallerUnidentified,

    /// The server answered with a non-2xx status.
    ///
    /// Displays the server's `detail` verbatim when present.
    #[error("{}", server_message(.status, .detail.as_deref()))]
    Server {
        /// HTTP status code.
        status: u16,
        /// The `detail` message from the error body, if any.
        detail: Option<String>,
    },

    /// The request never produced a response.
    #[error("Failed to upload image: {0}")]
    Network(String),

    /// A 2xx response whose body could not be understood.
    #[error("upload succeeded but the response was invalid: {0}")]
    InvalidResponse(String),
}

#[allow(clippy::trivially_copy_pass_by_ref)] // called from error formatting with field refs
fn server_message(status: &u16, detail: Option<&str>) -> String {
    detail.map_or_else(
        || format!("{GENERIC_UPLOAD_FAILURE} (HTTP {status})"),
        ToOwned::to_owned,
    )
}

/// Everything the transport needs to send one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Full endpoint URL.
    pub endpoint: String,
    /// Value for [`CALLER_HEADER`].
    pub caller: CallerId,
    /// Value for [`PHOTO_TYPE_FIELD`].
    pub photo_type: PhotoType,
    /// The file to send in [`FILE_FIELD`].
    pub file: FileCandidate,
}

/// Build the upload URL from a base URL.
#[must_use]
pub fn upload_endpoint(base_url: &str) -> String {
    format!("{}/upload", base_url.trim_end_matches('/'))
}

/// Successful upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Server-assigned photo identifier.
    pub photo_id: String,
    /// Stored filename.
    #[serde(default)]
    pub filename: Option<String>,
    /// Stored size in bytes (after anonymization).
    #[serde(default)]
    pub size: Option<u64>,
    /// Faces found and blurred.
    #[serde(default)]
    pub faces_detected: Option<u32>,
    /// Whether anonymization was applied.
    #[serde(default)]
    pub is_anonymized: Option<bool>,
    /// Human-readable summary from the server.
    #[serde(default)]
    pub message: Option<String>,
}

/// Interpret an upload response.
///
/// # Errors
///
/// - [`UploadError::Server`] for non-2xx statuses, carrying the body's
///   `detail` when present. Validation errors reported as a list of
///   `{ "msg": ... }` objects are joined into one message.
/// - [`UploadError::InvalidResponse`] for a 2xx body that is not a
///   receipt or has an empty `photo_id`.
pub fn parse_upload_response(status: u16, body: &str) -> Result<UploadReceipt, UploadError> {
    if !(200..300).contains(&status) {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(detail_text));
        return Err(UploadError::Server { status, detail });
    }

    let receipt: UploadReceipt = serde_json::from_str(body)
        .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
    if receipt.photo_id.trim().is_empty() {
        return Err(UploadError::InvalidResponse("empty photo_id".into()));
    }
    Ok(receipt)
}

fn detail_text(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}
