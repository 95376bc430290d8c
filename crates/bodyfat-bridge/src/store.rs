//! Widget state with write-through persistence to the host.
//!
//! Writes land locally first and are then forwarded to the host. The
//! host is the durable copy; the local copy is replaced by whatever the
//! host reports, except while one of our own writes has not yet been
//! echoed back. During that window the local value wins, so the UI
//! never flickers back to stale host state.
//!
//! Hosts persist widget state on a best-effort basis and may drop or
//! normalize a write. A write that is not echoed within
//! [`PENDING_WRITE_POLLS`] observations is given up on and the host's
//! state is adopted again.

use crate::host::HostBridge;
use crate::snapshot::{HostSnapshot, WidgetState};

/// Observations a local write shadows the host's state before the store
/// stops waiting for the echo.
pub const PENDING_WRITE_POLLS: u32 = 5;

/// Local widget state mirrored to the host.
#[derive(Debug, Clone)]
pub struct WidgetStateStore<H> {
    host: Option<H>,
    local: WidgetState,
    pending: Option<WidgetState>,
    unechoed_polls: u32,
}

impl<H: HostBridge> WidgetStateStore<H> {
    /// Seed the store from the host's widget state at mount.
    #[must_use]
    pub fn mount(host: Option<H>, initial: &HostSnapshot) -> Self {
        Self {
            host,
            local: initial.widget_state.clone().unwrap_or_default(),
            pending: None,
            unechoed_polls: 0,
        }
    }

    /// Current state. Reflects the last [`write`](Self::write)
    /// immediately.
    #[must_use]
    pub const fn read(&self) -> &WidgetState {
        &self.local
    }

    /// Replace the state locally and forward it to the host.
    ///
    /// Never fails: with no host the state simply stays local.
    pub fn write(&mut self, state: WidgetState) {
        if let Some(host) = &self.host {
            host.set_widget_state(&state);
            self.pending = Some(state.clone());
            self.unechoed_polls = 0;
        } else {
            tracing::debug!("host bridge absent; widget state kept locally");
        }
        self.local = state;
    }

    /// Set one key and write the result.
    pub fn set(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        let next = self.local.with(key, value);
        self.write(next);
    }

    /// Reconcile with a freshly observed snapshot.
    ///
    /// Returns `true` if the store changed (including the pending write
    /// being confirmed).
    pub fn observe(&mut self, snapshot: &HostSnapshot) -> bool {
        if self.host.is_none() {
            return false;
        }
        let observed = snapshot.widget_state.clone().unwrap_or_default();

        if let Some(pending) = &self.pending {
            if *pending == observed {
                self.pending = None;
                return true;
            }
            self.unechoed_polls += 1;
            if self.unechoed_polls < PENDING_WRITE_POLLS {
                return false;
            }
            tracing::debug!(
                polls = self.unechoed_polls,
                "widget state write never echoed; adopting host state"
            );
            self.pending = None;
        }

        if observed == self.local {
            false
        } else {
            self.local = observed;
            true
        }
    }

    /// `true` while a write has not been echoed back by the host.
    #[must_use]
    pub const fn has_pending_write(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingHost {
        writes: RefCell<Vec<WidgetState>>,
    }

    impl HostBridge for &RecordingHost {
        fn snapshot(&self) -> HostSnapshot {
            HostSnapshot::default()
        }

        fn set_widget_state(&self, state: &WidgetState) {
            self.writes.borrow_mut().push(state.clone());
        }
    }

    fn snapshot_with(state: serde_json::Value) -> HostSnapshot {
        HostSnapshot {
            widget_state: Some(WidgetState::new(state)),
            ..HostSnapshot::default()
        }
    }

    #[test]
    fn write_is_visible_without_host() {
        let mut store = WidgetStateStore::<&RecordingHost>::mount(None, &HostSnapshot::default());
        assert!(store.read().is_empty());
        store.write(WidgetState::new(json!({"photo_id": "p1"})));
        assert_eq!(store.read().get_str("photo_id"), Some("p1"));
        assert!(!store.has_pending_write());
    }

    #[test]
    fn absent_host_ignores_observations() {
        let mut store = WidgetStateStore::<&RecordingHost>::mount(None, &HostSnapshot::default());
        store.set("photo_id", "p1");
        assert!(!store.observe(&HostSnapshot::default()));
        assert_eq!(store.read().get_str("photo_id"), Some("p1"));
    }

    #[test]
    fn mount_seeds_from_host_state() {
        let store = WidgetStateStore::<&RecordingHost>::mount(
            None,
            &snapshot_with(json!({"user_id": "u1"})),
        );
        assert_eq!(store.read().get_str("user_id"), Some("u1"));
    }

    #[test]
    fn write_forwards_to_host_and_is_visible_immediately() {
        let host = RecordingHost::default();
        let mut store = WidgetStateStore::mount(Some(&host), &HostSnapshot::default());
        store.set("photo_id", "p1");
        assert_eq!(store.read().get_str("photo_id"), Some("p1"));
        assert_eq!(host.writes.borrow().len(), 1);
        assert_eq!(host.writes.borrow()[0].get_str("photo_id"), Some("p1"));
    }

    #[test]
    fn local_write_wins_until_host_catches_up() {
        let host = RecordingHost::default();
        let mut store = WidgetStateStore::mount(Some(&host), &snapshot_with(json!({"step": 1})));
        store.write(WidgetState::new(json!({"step": 2})));

        // Host has not echoed the write yet.
        assert!(!store.observe(&snapshot_with(json!({"step": 1}))));
        assert_eq!(store.read().get("step"), Some(&json!(2)));
        assert!(store.has_pending_write());

        // Host catches up.
        assert!(store.observe(&snapshot_with(json!({"step": 2}))));
        assert!(!store.has_pending_write());

        // From now on host changes replace the local copy.
        assert!(store.observe(&snapshot_with(json!({"step": 3}))));
        assert_eq!(store.read().get("step"), Some(&json!(3)));
    }

    /// Host that accepts writes but never reflects them.
    struct ForgetfulHost;

    impl HostBridge for ForgetfulHost {
        fn snapshot(&self) -> HostSnapshot {
            HostSnapshot::default()
        }

        fn set_widget_state(&self, _state: &WidgetState) {}
    }

    #[test]
    fn unechoed_write_yields_to_host_state() {
        let mut store = WidgetStateStore::mount(Some(ForgetfulHost), &HostSnapshot::default());
        store.set("photo_id", "p1");

        for step in 1..PENDING_WRITE_POLLS {
            assert!(!store.observe(&snapshot_with(json!({"step": step}))));
            assert_eq!(store.read().get_str("photo_id"), Some("p1"));
        }

        assert!(store.observe(&snapshot_with(json!({"step": 2}))));
        assert!(!store.has_pending_write());
        assert_eq!(store.read().get("step"), Some(&json!(2)));
        assert_eq!(store.read().get("photo_id"), None);

        // Later host changes keep flowing in.
        assert!(store.observe(&snapshot_with(json!({"step": 3}))));
        assert_eq!(store.read().get("step"), Some(&json!(3)));
    }

    #[test]
    fn new_write_restarts_the_echo_window() {
        let mut store = WidgetStateStore::mount(Some(ForgetfulHost), &HostSnapshot::default());
        store.set("photo_id", "p1");
        for _ in 1..PENDING_WRITE_POLLS {
            store.observe(&HostSnapshot::default());
        }
        store.set("analysis_id", "a1");
        assert!(!store.observe(&HostSnapshot::default()));
        assert_eq!(store.read().get_str("analysis_id"), Some("a1"));
        assert!(store.has_pending_write());
    }

    #[test]
    fn unchanged_observation_reports_no_change() {
        let host = RecordingHost::default();
        let mut store = WidgetStateStore::mount(Some(&host), &snapshot_with(json!({"a": 1})));
        assert!(!store.observe(&snapshot_with(json!({"a": 1}))));
    }
}
