//! Async driver that runs one session end to end.
//!
//! [`run_session`] performs the awaits the [`Orchestrator`] leaves out.
//! The orchestrator lives behind a [`SessionCell`] and is only borrowed
//! between awaits, never across one, so a new selection or a teardown
//! can happen while a request is in flight.

use std::cell::RefCell;

use crate::host::{ToolChannel, Uploader};
use crate::orchestrator::Orchestrator;
use crate::session::{SessionId, SessionStatus};
use crate::snapshot::HostSnapshot;

/// Shared, interior-mutable access to an orchestrator.
pub trait SessionCell {
    /// Run `f` against the orchestrator.
    ///
    /// Returns `None` when the orchestrator is gone (for example its
    /// owning component was dropped) or already borrowed.
    fn with<R>(&self, f: impl FnOnce(&mut Orchestrator) -> R) -> Option<R>;
}

impl SessionCell for RefCell<Orchestrator> {
    fn with<R>(&self, f: impl FnOnce(&mut Orchestrator) -> R) -> Option<R> {
        match self.try_borrow_mut() {
            Ok(mut orchestrator) => Some(f(&mut orchestrator)),
            Err(e) => {
                tracing::debug!(error = %e, "orchestrator busy; dropping step result");
                None
            }
        }
    }
}

/// Upload session `id`'s file and invoke the analysis tool.
///
/// `snapshot` supplies the caller identity. `tools` is `None` when the
/// environment has no tool channel, in which case the session fails
/// without attempting a call.
///
/// Returns the session's status when the driver stops: a terminal
/// status, or `invoking_tool` when the result is still to arrive through
/// a snapshot. Returns `None` when the session was superseded or torn
/// down on the way.
#[allow(clippy::future_not_send)]
pub async fn run_session<C, U, T>(
    cell: &C,
    id: SessionId,
    snapshot: &HostSnapshot,
    uploader: &U,
    tools: Option<&T>,
) -> Option<SessionStatus>
where
    C: SessionCell + ?Sized,
    U: Uploader,
    T: ToolChannel,
{
    let status = || cell.with(|o| o.status_of(id)).flatten();

    let Some(request) = cell.with(|o| o.begin_upload(id, snapshot)).flatten() else {
        return status();
    };
    tracing::debug!(session = %id, endpoint = %request.endpoint, "uploading");
    let outcome = uploader.upload(&request).await;

    if cell.with(|o| o.finish_upload(id, outcome)).flatten().is_none() {
        return status();
    }

    let call = cell.with(|o| o.begin_invoke(id, tools.is_some())).flatten();
    let (Some(call), Some(tools)) = (call, tools) else {
        return status();
    };
    tracing::debug!(session = %id, tool = %call.name, photo_id = %call.photo_id, "invoking tool");
    let ack = tools.call_tool(&call.name, call.args).await;

    cell.with(|o| o.finish_invoke(id, ack)).flatten()
}
