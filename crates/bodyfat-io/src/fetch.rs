//! Multipart photo upload over `fetch`.
//!
//! Builds the `FormData` body, sends it with the caller header and hands
//! the raw status and body text to
//! [`bodyfat_bridge::parse_upload_response`]. Only transport failures
//! are decided here.

use bodyfat_bridge::upload::{CALLER_HEADER, FILE_FIELD, PHOTO_TYPE_FIELD};
use bodyfat_bridge::{UploadError, UploadReceipt, UploadRequest, Uploader, parse_upload_response};
use dioxus::logger::tracing;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, FormData, Headers, Request, RequestInit, Response};

use crate::host::js_message;

/// Errors raised before a response is available.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// A browser API call returned an error.
    #[error("{0}")]
    JsError(String),
}

impl From<JsValue> for FetchError {
    fn from(value: JsValue) -> Self {
        Self::JsError(js_message(&value))
    }
}

impl From<FetchError> for UploadError {
    fn from(e: FetchError) -> Self {
        Self::Network(e.to_string())
    }
}

/// [`Uploader`] backed by the browser's `fetch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchUploader;

impl Uploader for FetchUploader {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
        let (status, body) = send(request).await?;
        tracing::debug!(status, bytes = body.len(), "upload response");
        parse_upload_response(status, &body)
    }
}

/// Send the multipart request and read the response text.
async fn send(request: &UploadRequest) -> Result<(u16, String), FetchError> {
    let window = web_sys::window().ok_or_else(|| FetchError::JsError("no global window".into()))?;

    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(request.file.bytes()));
    let opts = BlobPropertyBag::new();
    opts.set_type(request.file.mime_type());
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &opts)?;

    let form = FormData::new()?;
    form.append_with_blob_and_filename(FILE_FIELD, &blob, request.file.name())?;
    form.append_with_str(PHOTO_TYPE_FIELD, request.photo_type.as_str())?;

    let headers = Headers::new()?;
    headers.set(CALLER_HEADER, request.caller.as_str())?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_body(&form);
    init.set_headers(&headers);
    let fetch_request = Request::new_with_str_and_init(&request.endpoint, &init)?;

    let response: Response = JsFuture::from(window.fetch_with_request(&fetch_request))
        .await?
        .dyn_into()?;
    let status = response.status();
    let body = JsFuture::from(response.text()?)
        .await?
        .as_string()
        .unwrap_or_default();
    Ok((status, body))
}
