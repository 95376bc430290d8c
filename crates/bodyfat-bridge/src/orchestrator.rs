//! Upload-then-analyze orchestration.
//!
//! The orchestrator owns at most one [`UploadSession`]. It performs no
//! I/O: each remote step is split into a `begin_*` call that decides
//! whether to proceed and returns the request to send, and a `finish_*`
//! call that applies the response. Whoever drives it (see
//! [`crate::workflow::run_session`]) does the awaiting in between.
//!
//! Selecting a new file while a session is in flight supersedes it. The
//! old session's id stops matching, so any response that later arrives
//! for it is discarded instead of applied. After [`Orchestrator::teardown`]
//! every response is discarded.

use serde_json::Value;

use crate::config::WidgetConfig;
use crate::error::WidgetError;
use crate::session::{SessionId, SessionStatus, UploadSession};
use crate::snapshot::{CallerId, HostSnapshot};
use crate::tool::{Correlation, InvocationError, ToolCall, correlate, correlate_ack};
use crate::types::{FileCandidate, PhotoType};
use crate::upload::{UploadError, UploadReceipt, UploadRequest};
use crate::validate::ValidationPolicy;

/// Drives one session at a time through validate, upload and analyze.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    policy: ValidationPolicy,
    endpoint: String,
    tool_name: String,
    photo_type: PhotoType,
    next_id: u64,
    session: Option<UploadSession>,
    torn_down: bool,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(&WidgetConfig::default())
    }
}

impl Orchestrator {
    /// Create an idle orchestrator.
    #[must_use]
    pub fn new(config: &WidgetConfig) -> Self {
        Self {
            policy: config.validation.clone(),
            endpoint: config.upload_endpoint(),
            tool_name: config.tool_name.clone(),
            photo_type: config.default_photo_type,
            next_id: 1,
            session: None,
            torn_down: false,
        }
    }

    /// The current session, if any file has been selected.
    #[must_use]
    pub const fn session(&self) -> Option<&UploadSession> {
        self.session.as_ref()
    }

    /// Status of session `id`, or `None` if it is not the current one.
    #[must_use]
    pub fn status_of(&self, id: SessionId) -> Option<SessionStatus> {
        self.session
            .as_ref()
            .filter(|s| s.id() == id)
            .map(UploadSession::status)
    }

    /// The validation policy applied to selections.
    #[must_use]
    pub const fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Photo type used for the next selection.
    #[must_use]
    pub const fn photo_type(&self) -> PhotoType {
        self.photo_type
    }

    /// Choose the photo type for subsequent selections.
    ///
    /// A session already started keeps the type it was created with.
    pub const fn set_photo_type(&mut self, photo_type: PhotoType) {
        self.photo_type = photo_type;
    }

    /// `true` once [`teardown`](Self::teardown) has run.
    #[must_use]
    pub const fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Start a new session for `file` and validate it.
    ///
    /// Any existing session is replaced. Validation runs synchronously,
    /// so the returned session is already `ready` or `rejected`.
    /// Returns `None` after teardown.
    pub fn select(&mut self, file: FileCandidate) -> Option<SessionId> {
        if self.torn_down {
            tracing::debug!(file = file.name(), "selection after teardown ignored");
            return None;
        }
        if let Some(previous) = &self.session
            && previous.status().is_in_flight()
        {
            tracing::info!(session = %previous.id(), status = %previous.status(), "superseded by new selection");
        }

        let id = SessionId(self.next_id);
        self.next_id += 1;

        let mut session = UploadSession::new(id, file, self.photo_type);
        session.advance(SessionStatus::Validating);
        let outcome = self.policy.validate(session.file());
        if outcome.is_valid() {
            session.advance(SessionStatus::Ready);
        } else {
            session.fail(
                SessionStatus::Rejected,
                WidgetError::Validation(outcome.errors().to_vec()),
            );
        }
        session.set_validation(outcome);

        self.session = Some(session);
        Some(id)
    }

    /// Select the first of several files; the rest are ignored.
    pub fn select_first(&mut self, files: impl IntoIterator<Item = FileCandidate>) -> Option<SessionId> {
        let mut files = files.into_iter();
        let first = files.next()?;
        let ignored = files.count();
        if ignored > 0 {
            tracing::debug!(ignored, "only the first dropped file is used");
        }
        self.select(first)
    }

    /// Move a `ready` session to `uploading` and build its request.
    ///
    /// With no caller identity in `snapshot` the session goes straight
    /// to `upload_failed` and `None` is returned: nothing is sent.
    pub fn begin_upload(&mut self, id: SessionId, snapshot: &HostSnapshot) -> Option<UploadRequest> {
        let endpoint = self.endpoint.clone();
        let session = self.live(id, SessionStatus::Ready)?;

        let Some(caller) = CallerId::from_snapshot(snapshot) else {
            session.fail(
                SessionStatus::UploadFailed,
                UploadError::CallerUnidentified.into(),
            );
            return None;
        };

        session.advance(SessionStatus::Uploading);
        Some(UploadRequest {
            endpoint,
            caller,
            photo_type: session.photo_type(),
            file: session.file().clone(),
        })
    }

    /// Apply the upload response for session `id`.
    ///
    /// Returns the receipt when the session moved to `uploaded`.
    /// Responses for superseded sessions are dropped.
    pub fn finish_upload(
        &mut self,
        id: SessionId,
        outcome: Result<UploadReceipt, UploadError>,
    ) -> Option<UploadReceipt> {
        let session = self.live(id, SessionStatus::Uploading)?;
        match outcome {
            Ok(receipt) => {
                tracing::info!(session = %id, photo_id = %receipt.photo_id, "photo uploaded");
                session.set_receipt(receipt.clone());
                session.advance(SessionStatus::Uploaded);
                Some(receipt)
            }
            Err(e) => {
                session.fail(SessionStatus::UploadFailed, e.into());
                None
            }
        }
    }

    /// Move an `uploaded` session to `invoking_tool` and build the call.
    ///
    /// When `channel_available` is false the session goes straight to
    /// `invoke_failed` and `None` is returned: nothing is sent.
    pub fn begin_invoke(&mut self, id: SessionId, channel_available: bool) -> Option<ToolCall> {
        let tool_name = self.tool_name.clone();
        let session = self.live(id, SessionStatus::Uploaded)?;
        let photo_id = session.photo_id()?.to_owned();

        if !channel_available {
            session.fail(
                SessionStatus::InvokeFailed,
                InvocationError::BridgeUnavailable { tool: tool_name }.into(),
            );
            return None;
        }

        session.advance(SessionStatus::InvokingTool);
        Some(ToolCall::process_photo(&tool_name, &photo_id))
    }

    /// Apply the direct acknowledgement of a tool call.
    ///
    /// An error fails the session. A successful ack with structured
    /// content is the result of this call and completes it; a bare ack
    /// leaves the session waiting for the result to show up in a
    /// snapshot (see [`observe`](Self::observe)). Returns the status
    /// afterwards.
    pub fn finish_invoke(
        &mut self,
        id: SessionId,
        ack: Result<Value, InvocationError>,
    ) -> Option<SessionStatus> {
        let session = self.live(id, SessionStatus::InvokingTool)?;
        match ack {
            Err(e) => session.fail(SessionStatus::InvokeFailed, e.into()),
            Ok(value) => {
                let photo_id = session.photo_id()?.to_owned();
                // Only an explicit member counts: a bare envelope is not a result.
                let content = value.get("structuredContent").filter(|v| !v.is_null());
                let correlation = correlate_ack(&photo_id, content);
                apply_correlation(session, correlation);
            }
        }
        Some(session.status())
    }

    /// What `snapshot` holds for the pending tool call, without applying
    /// it.
    ///
    /// [`Correlation::Unrelated`] when no call is pending, after teardown,
    /// or when the output belongs to some other call.
    #[must_use]
    pub fn correlation_in(&self, snapshot: &HostSnapshot) -> Correlation {
        if self.torn_down {
            return Correlation::Unrelated;
        }
        let Some(photo_id) = self
            .session
            .as_ref()
            .filter(|s| s.status() == SessionStatus::InvokingTool)
            .and_then(UploadSession::photo_id)
        else {
            return Correlation::Unrelated;
        };
        correlate(photo_id, &snapshot.tool_input, snapshot.structured_output())
    }

    /// Check a snapshot for the result of the pending tool call.
    ///
    /// Only outputs that carry the pending photo id, or that name no
    /// photo while the snapshot's tool input does, are applied; anything
    /// else is left alone.
    /// Returns `true` if the session reached a terminal state.
    pub fn observe(&mut self, snapshot: &HostSnapshot) -> bool {
        let correlation = self.correlation_in(snapshot);
        if matches!(correlation, Correlation::Unrelated) {
            return false;
        }
        self.session
            .as_mut()
            .is_some_and(|session| apply_correlation(session, correlation))
    }

    /// Stop applying results. Called when the widget unmounts.
    pub fn teardown(&mut self) {
        if !self.torn_down {
            tracing::debug!("orchestrator torn down");
            self.torn_down = true;
        }
    }

    /// The current session if it is `id` and in status `expected`.
    fn live(&mut self, id: SessionId, expected: SessionStatus) -> Option<&mut UploadSession> {
        if self.torn_down {
            tracing::debug!(session = %id, "widget torn down; discarding result");
            return None;
        }
        match self.session.as_mut() {
            Some(session) if session.id() == id => {
                if session.status() == expected {
                    Some(session)
                } else {
                    tracing::debug!(
                        session = %id,
                        status = %session.status(),
                        expected = %expected,
                        "step does not apply in current status"
                    );
                    None
                }
            }
            _ => {
                tracing::debug!(session = %id, "discarding result for superseded session");
                None
            }
        }
    }
}

fn apply_correlation(session: &mut UploadSession, correlation: Correlation) -> bool {
    match correlation {
        Correlation::Complete(result) => {
            tracing::info!(
                session = %session.id(),
                photo_id = %result.photo_id,
                body_fat = ?result.body_fat_percentage,
                "analysis complete"
            );
            session.set_result(result);
            session.advance(SessionStatus::Complete);
            true
        }
        Correlation::Failed(message) => {
            session.fail(
                SessionStatus::InvokeFailed,
                InvocationError::ToolFailed(message).into(),
            );
            true
        }
        Correlation::Unrelated => false,
    }
}
