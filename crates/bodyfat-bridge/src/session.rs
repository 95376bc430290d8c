//! One file-selection-to-completion workflow instance.
//!
//! ```text
//! selected -> validating -> rejected
//!                        -> ready -> uploading -> upload_failed
//!                                 \            -> uploaded -> invoking_tool -> invoke_failed
//!                                  \                       \                -> complete
//!                                   -> upload_failed        -> invoke_failed
//! ```
//!
//! The direct `ready -> upload_failed` edge is taken when no caller
//! identity is available; `uploaded -> invoke_failed` when the tool
//! channel is missing. Neither sends anything over the network.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::WidgetError;
use crate::tool::AnalysisResult;
use crate::types::{FileCandidate, PhotoType};
use crate::upload::UploadReceipt;
use crate::validate::ValidationOutcome;

/// Identifies one session within a widget instance.
///
/// Monotonic: a later selection always has a larger id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub(crate) u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a session is in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// A file was picked.
    Selected,
    /// The validator is running.
    Validating,
    /// Validation failed. Terminal.
    Rejected,
    /// Validation passed; waiting for upload.
    Ready,
    /// The upload request is in flight.
    Uploading,
    /// The upload failed. Terminal.
    UploadFailed,
    /// The server accepted the photo.
    Uploaded,
    /// The tool call is in flight or its result is awaited.
    InvokingTool,
    /// The tool call failed. Terminal.
    InvokeFailed,
    /// The analysis result was observed. Terminal.
    Complete,
}

impl SessionStatus {
    /// `true` for states the workflow never leaves.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::UploadFailed | Self::InvokeFailed | Self::Complete
        )
    }

    /// `true` while a remote call is outstanding.
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Uploading | Self::InvokingTool)
    }

    /// `true` for terminal failure states.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::UploadFailed | Self::InvokeFailed
        )
    }

    /// Whether the state machine allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Selected, Self::Validating)
                | (Self::Validating, Self::Rejected | Self::Ready)
                | (Self::Ready, Self::Uploading | Self::UploadFailed)
                | (Self::Uploading, Self::UploadFailed | Self::Uploaded)
                | (Self::Uploaded, Self::InvokingTool | Self::InvokeFailed)
                | (Self::InvokingTool, Self::InvokeFailed | Self::Complete)
        )
    }

    /// Stable snake-case name, also used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Selected => "selected",
            Self::Validating => "validating",
            Self::Rejected => "rejected",
            Self::Ready => "ready",
            Self::Uploading => "uploading",
            Self::UploadFailed => "upload_failed",
            Self::Uploaded => "uploaded",
            Self::InvokingTool => "invoking_tool",
            Self::InvokeFailed => "invoke_failed",
            Self::Complete => "complete",
        }
    }

    /// Status line shown to the user while no error is present.
    #[must_use]
    pub const fn user_message(self) -> &'static str {
        match self {
            Self::Selected | Self::Validating => "Checking photo...",
            Self::Ready => "Ready to upload",
            Self::Uploading => "Uploading photo...",
            Self::Uploaded | Self::InvokingTool => "Analyzing photo...",
            Self::Complete => "Analysis complete",
            Self::Rejected => "Photo rejected",
            Self::UploadFailed => "Upload failed",
            Self::InvokeFailed => "Analysis failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one selected file as it moves through the workflow.
#[derive(Debug, Clone)]
pub struct UploadSession {
    id: SessionId,
    file: FileCandidate,
    photo_type: PhotoType,
    status: SessionStatus,
    validation: Option<ValidationOutcome>,
    error: Option<WidgetError>,
    receipt: Option<UploadReceipt>,
    result: Option<AnalysisResult>,
    preview: OnceCell<Option<Rc<str>>>,
}

impl UploadSession {
    pub(crate) fn new(id: SessionId, file: FileCandidate, photo_type: PhotoType) -> Self {
        Self {
            id,
            file,
            photo_type,
            status: SessionStatus::Selected,
            validation: None,
            error: None,
            receipt: None,
            result: None,
            preview: OnceCell::new(),
        }
    }

    /// Session id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The selected file.
    #[must_use]
    pub const fn file(&self) -> &FileCandidate {
        &self.file
    }

    /// Photo type chosen at selection time.
    #[must_use]
    pub const fn photo_type(&self) -> PhotoType {
        self.photo_type
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Validation outcome, once validation has run.
    #[must_use]
    pub const fn validation(&self) -> Option<&ValidationOutcome> {
        self.validation.as_ref()
    }

    /// The failure that ended this session.
    #[must_use]
    pub const fn error(&self) -> Option<&WidgetError> {
        self.error.as_ref()
    }

    /// Upload response, once uploaded.
    #[must_use]
    pub const fn receipt(&self) -> Option<&UploadReceipt> {
        self.receipt.as_ref()
    }

    /// Server-assigned photo id, once uploaded.
    #[must_use]
    pub fn photo_id(&self) -> Option<&str> {
        self.receipt.as_ref().map(|r| r.photo_id.as_str())
    }

    /// Analysis result, once complete.
    #[must_use]
    pub const fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// The line to show the user: the error if there is one, else the
    /// server's upload message while analysis runs, else the status.
    #[must_use]
    pub fn message(&self) -> String {
        if let Some(error) = &self.error {
            return error.to_string();
        }
        match (self.status, self.receipt.as_ref().and_then(|r| r.message.as_deref())) {
            (SessionStatus::Uploaded | SessionStatus::InvokingTool, Some(message)) => {
                format!("{message} Analyzing...")
            }
            (status, _) => status.user_message().to_owned(),
        }
    }

    /// `data:` URI for previewing the selected image.
    ///
    /// Computed on first call and shared afterwards. `None` for files
    /// without content or without an image MIME type.
    #[must_use]
    pub fn preview_data_uri(&self) -> Option<Rc<str>> {
        self.preview
            .get_or_init(|| {
                let mime = self.file.mime_type();
                let bytes = self.file.bytes();
                (!bytes.is_empty() && mime.starts_with("image/"))
                    .then(|| Rc::from(format!("data:{mime};base64,{}", STANDARD.encode(bytes))))
            })
            .clone()
    }

    pub(crate) fn advance(&mut self, next: SessionStatus) {
        debug_assert!(
            self.status.can_advance_to(next),
            "illegal session transition {} -> {next}",
            self.status
        );
        tracing::debug!(session = %self.id, from = %self.status, to = %next, "session transition");
        self.status = next;
    }

    pub(crate) fn fail(&mut self, next: SessionStatus, error: WidgetError) {
        debug_assert!(next.is_failure(), "{next} is not a failure state");
        tracing::warn!(session = %self.id, from = %self.status, to = %next, %error, "session failed");
        self.advance(next);
        self.error = Some(error);
    }

    pub(crate) fn set_validation(&mut self, outcome: ValidationOutcome) {
        self.validation = Some(outcome);
    }

    pub(crate) fn set_receipt(&mut self, receipt: UploadReceipt) {
        self.receipt = Some(receipt);
    }

    pub(crate) fn set_result(&mut self, result: AnalysisResult) {
        self.result = Some(result);
    }
}
