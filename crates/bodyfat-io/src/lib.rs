//! bodyfat-io: Browser host bridge and Dioxus component library.
//!
//! Implements the `bodyfat-bridge` seams on top of `window.openai` and
//! `fetch`, drives the snapshot observer from a browser interval timer,
//! and provides the hooks and components the widget is assembled from.

pub mod components;
pub mod fetch;
pub mod hooks;
pub mod host;
pub mod poll;

pub use components::{AnalysisSummary, PhotoDropZone, PhotoPreview, PhotoTypePicker, StatusBanner};
pub use fetch::FetchUploader;
pub use hooks::{PhotoWorkflow, WidgetStateHandle, use_host_snapshot, use_photo_workflow, use_widget_state};
pub use host::OpenAiHost;
pub use poll::SnapshotPoller;
