//! bodyfat-bridge: Host bridge and upload workflow core (sans-IO).
//!
//! The widget runs sandboxed inside a host that exposes a pull-only
//! state snapshot and a tool invocation channel. This crate keeps the
//! widget's view of that host correct:
//!
//! snapshot observer -> widget state store -> drag/drop controller ->
//! file validator -> upload/analyze orchestrator.
//!
//! This crate has **no browser dependencies** -- the host, the upload
//! endpoint and the tool channel are reached through the traits in
//! [`host`], and polling is driven by explicit [`SnapshotObserver::tick`]
//! calls. All `window.openai` and `fetch` interaction lives in
//! `bodyfat-io`.

pub mod config;
pub mod drag;
pub mod error;
pub mod host;
pub mod observer;
pub mod orchestrator;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod tool;
pub mod types;
pub mod upload;
pub mod validate;
pub mod workflow;

pub use config::WidgetConfig;
pub use drag::{DragController, DragInput, DragOutcome, DragState};
pub use error::WidgetError;
pub use host::{HostBridge, ToolChannel, Uploader};
pub use observer::{DEFAULT_POLL_INTERVAL, SnapshotObserver};
pub use orchestrator::Orchestrator;
pub use session::{SessionId, SessionStatus, UploadSession};
pub use snapshot::{CallerId, DisplayMode, HostSnapshot, Theme, UploadWidgetState, WidgetState};
pub use store::{PENDING_WRITE_POLLS, WidgetStateStore};
pub use tool::{AnalysisResult, Confidence, Correlation, InvocationError, PhotoQuality, ToolCall};
pub use types::{FileCandidate, PhotoType};
pub use upload::{UploadError, UploadReceipt, UploadRequest, parse_upload_response};
pub use validate::{ValidationError, ValidationOutcome, ValidationPolicy, validate};
pub use workflow::{SessionCell, run_session};
