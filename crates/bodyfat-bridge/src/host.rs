//! Seams to the outside world.
//!
//! The widget reaches its host, the upload endpoint and the tool
//! channel only through these traits. `bodyfat-io` implements them on
//! top of `window.openai` and `fetch`; tests implement them with fakes.
//!
//! A missing host is modeled as `Option::None` at the call site rather
//! than as a trait method, so the absence is visible in the types.

use serde_json::Value;

use crate::snapshot::{HostSnapshot, WidgetState};
use crate::tool::InvocationError;
use crate::upload::{UploadError, UploadReceipt, UploadRequest};

/// Read and write access to the host's state object.
pub trait HostBridge {
    /// Read the host's current state in full.
    fn snapshot(&self) -> HostSnapshot;

    /// Ask the host to persist the widget's state.
    ///
    /// Best-effort and fire-and-forget; implementations swallow and log
    /// failures.
    fn set_widget_state(&self, state: &WidgetState);
}

/// Host-mediated remote procedure calls.
///
/// The widget runs on a single thread, so the returned futures need not
/// be `Send`.
#[allow(async_fn_in_trait)]
pub trait ToolChannel {
    /// Invoke the tool `name` with `args` and wait for the host's
    /// acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError::BridgeUnavailable`] when the channel is
    /// missing from the environment, or [`InvocationError::Rejected`]
    /// when the host rejects the call.
    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, InvocationError>;
}

/// The photo upload endpoint.
#[allow(async_fn_in_trait)]
pub trait Uploader {
    /// Send one upload request.
    ///
    /// # Errors
    ///
    /// Returns an [`UploadError`] on network failure, on a non-2xx
    /// response, or when the success body cannot be parsed.
    async fn upload(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError>;
}
