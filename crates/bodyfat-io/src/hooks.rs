//! Dioxus hooks wiring the bridge core to the component tree.
//!
//! - [`use_host_snapshot`] mounts the observer and republishes every
//!   poll into a signal.
//! - [`use_widget_state`] keeps a write-through store in sync with the
//!   observed snapshot.
//! - [`use_photo_workflow`] owns the orchestrator, spawns a driver task
//!   per selection and persists ids through the store.
//!
//! Everything here is torn down with the owning component: the poll
//! timer stops and the orchestrator discards results still in flight.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bodyfat_bridge::{
    CallerId, Correlation, FileCandidate, HostSnapshot, Orchestrator, PhotoType, SessionCell,
    SessionStatus, SnapshotObserver, UploadSession, ValidationPolicy, WidgetConfig, WidgetState,
    WidgetStateStore, run_session,
};
use dioxus::logger::tracing;
use dioxus::prelude::*;
use serde_json::Value;

use crate::fetch::FetchUploader;
use crate::host::OpenAiHost;
use crate::poll::SnapshotPoller;

/// Widget state key for the caller identity.
pub const USER_ID_KEY: &str = "user_id";
/// Widget state key for the last uploaded photo.
pub const PHOTO_ID_KEY: &str = "photo_id";
/// Widget state key for the last completed analysis.
pub const ANALYSIS_ID_KEY: &str = "analysis_id";

/// Observe the host snapshot, republished on every poll.
///
/// With no host the signal holds the default snapshot forever and no
/// timer is started.
pub fn use_host_snapshot(host: Option<OpenAiHost>, interval: Duration) -> Signal<HostSnapshot> {
    let observer = use_hook(|| Rc::new(RefCell::new(SnapshotObserver::mount(host, interval))));
    let mut snapshot = use_signal(|| observer.borrow().current().clone());

    let poller = use_hook(|| {
        let observer = Rc::clone(&observer);
        Rc::new(RefCell::new(SnapshotPoller::start(observer, move |next| {
            snapshot.set(next);
        })))
    });

    use_drop(move || {
        poller.borrow_mut().stop();
        observer.borrow_mut().stop();
    });

    snapshot
}

/// Write-through widget state shared across the component tree.
#[derive(Clone)]
pub struct WidgetStateHandle {
    store: Rc<RefCell<WidgetStateStore<OpenAiHost>>>,
    view: Signal<WidgetState>,
}

impl WidgetStateHandle {
    /// Current state; subscribes the caller to changes.
    #[must_use]
    pub fn read(&self) -> WidgetState {
        self.view.read().clone()
    }

    /// Current state without subscribing.
    #[must_use]
    pub fn peek(&self) -> WidgetState {
        self.store.borrow().read().clone()
    }

    /// Set one key locally and forward the new state to the host.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let next = {
            let mut store = self.store.borrow_mut();
            store.set(key, value);
            store.read().clone()
        };
        self.publish(next);
    }

    /// Set `key` to `value` unless it already holds it.
    pub fn remember(&self, key: &str, value: &str) {
        if self.store.borrow().read().get_str(key) != Some(value) {
            self.set(key, value);
        }
    }

    fn observe(&self, snapshot: &HostSnapshot) {
        let next = {
            let mut store = self.store.borrow_mut();
            store.observe(snapshot).then(|| store.read().clone())
        };
        if let Some(next) = next {
            self.publish(next);
        }
    }

    fn publish(&self, next: WidgetState) {
        let mut view = self.view;
        if *view.peek() != next {
            view.set(next);
        }
    }
}

/// Mount the widget state store and keep it reconciled with `snapshot`.
pub fn use_widget_state(
    host: Option<OpenAiHost>,
    snapshot: Signal<HostSnapshot>,
) -> WidgetStateHandle {
    let view = use_signal(|| snapshot.peek().widget_state.clone().unwrap_or_default());
    let handle = use_hook(|| WidgetStateHandle {
        store: Rc::new(RefCell::new(WidgetStateStore::mount(host, &snapshot.peek()))),
        view,
    });

    {
        let handle = handle.clone();
        use_effect(move || {
            let current = snapshot.read().clone();
            handle.observe(&current);
        });
    }

    handle
}

/// [`SessionCell`] over a component-owned signal.
///
/// Once the owning component is gone the signal can no longer be
/// written and the cell reports the orchestrator as gone.
struct SignalCell(Signal<Orchestrator>);

impl SessionCell for SignalCell {
    fn with<R>(&self, f: impl FnOnce(&mut Orchestrator) -> R) -> Option<R> {
        let mut signal = self.0;
        match signal.try_write() {
            Ok(mut orchestrator) => Some(f(&mut orchestrator)),
            Err(e) => {
                tracing::debug!(error = %e, "orchestrator unavailable; dropping step result");
                None
            }
        }
    }
}

/// Handle to the upload workflow.
#[derive(Clone)]
pub struct PhotoWorkflow {
    orchestrator: Signal<Orchestrator>,
    host: Option<OpenAiHost>,
    snapshot: Signal<HostSnapshot>,
    state: WidgetStateHandle,
}

impl PhotoWorkflow {
    /// Inspect the current session; subscribes the caller to changes.
    pub fn session<R>(&self, f: impl FnOnce(Option<&UploadSession>) -> R) -> R {
        f(self.orchestrator.read().session())
    }

    /// Photo type used for the next selection.
    #[must_use]
    pub fn photo_type(&self) -> PhotoType {
        self.orchestrator.read().photo_type()
    }

    /// Choose the photo type for the next selection.
    pub fn set_photo_type(&self, photo_type: PhotoType) {
        let mut orchestrator = self.orchestrator;
        orchestrator.write().set_photo_type(photo_type);
    }

    /// The validation policy selections are checked against.
    #[must_use]
    pub fn policy(&self) -> ValidationPolicy {
        self.orchestrator.read().policy().clone()
    }

    /// `true` while an upload or tool call is outstanding.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.orchestrator
            .read()
            .session()
            .is_some_and(|s| s.status().is_in_flight() || s.status() == SessionStatus::Uploaded)
    }

    /// Start a session for the first of `files`.
    ///
    /// Replaces any session in flight. A file that passes validation is
    /// uploaded and analyzed by a spawned task.
    pub fn select(&self, files: Vec<FileCandidate>) {
        let mut orchestrator = self.orchestrator;
        let Some(id) = orchestrator.write().select_first(files) else {
            return;
        };
        if orchestrator.peek().status_of(id) != Some(SessionStatus::Ready) {
            return;
        }

        // The store may hold identity written since the last poll.
        let mut snapshot = self.snapshot.peek().clone();
        snapshot.widget_state = Some(self.state.peek());
        if let Some(caller) = CallerId::from_snapshot(&snapshot) {
            self.state.remember(USER_ID_KEY, caller.as_str());
        }

        let tools = self.host.clone().filter(OpenAiHost::has_tool_channel);
        spawn(async move {
            let cell = SignalCell(orchestrator);
            let status = run_session(&cell, id, &snapshot, &FetchUploader, tools.as_ref()).await;
            tracing::debug!(session = %id, ?status, "session driver finished");
        });
    }
}

/// Own the orchestrator for this widget instance.
pub fn use_photo_workflow(
    config: &WidgetConfig,
    host: Option<OpenAiHost>,
    snapshot: Signal<HostSnapshot>,
    state: WidgetStateHandle,
) -> PhotoWorkflow {
    let mut orchestrator = use_signal(|| Orchestrator::new(config));

    // Match tool results against the pending call on every poll. Only a
    // matching output takes the write guard, so idle polls re-render nothing.
    use_effect(move || {
        let current = snapshot.read();
        let related = !matches!(
            orchestrator.peek().correlation_in(&current),
            Correlation::Unrelated
        );
        if related {
            orchestrator.write().observe(&current);
        }
    });

    // Persist the ids of the current session through the host.
    {
        let state = state.clone();
        use_effect(move || {
            let (photo_id, analysis_id) = {
                let orchestrator = orchestrator.read();
                let session = orchestrator.session();
                (
                    session.and_then(UploadSession::photo_id).map(ToOwned::to_owned),
                    session
                        .and_then(UploadSession::result)
                        .and_then(|r| r.analysis_id.clone()),
                )
            };
            if let Some(photo_id) = photo_id {
                state.remember(PHOTO_ID_KEY, &photo_id);
            }
            if let Some(analysis_id) = analysis_id {
                state.remember(ANALYSIS_ID_KEY, &analysis_id);
            }
        });
    }

    use_drop(move || {
        if let Ok(mut orchestrator) = orchestrator.try_write() {
            orchestrator.teardown();
        }
    });

    use_hook(|| PhotoWorkflow {
        orchestrator,
        host,
        snapshot,
        state,
    })
}
