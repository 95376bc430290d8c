//! Browser timer that ticks a [`SnapshotObserver`].

use std::cell::RefCell;
use std::rc::Rc;

use bodyfat_bridge::{HostBridge, HostSnapshot, SnapshotObserver};
use dioxus::logger::tracing;
use gloo_timers::callback::Interval;

/// Repeating timer driving an observer's ticks.
///
/// Dropping the poller cancels the timer.
pub struct SnapshotPoller {
    interval: Option<Interval>,
}

impl SnapshotPoller {
    /// Start ticking `observer` at its configured interval, passing each
    /// republished snapshot to `on_tick`.
    ///
    /// An observer that is not polling (host absent) gets no timer.
    pub fn start<H, F>(observer: Rc<RefCell<SnapshotObserver<H>>>, mut on_tick: F) -> Self
    where
        H: HostBridge + 'static,
        F: FnMut(HostSnapshot) + 'static,
    {
        let (polling, interval) = {
            let observer = observer.borrow();
            (observer.is_polling(), observer.interval())
        };
        if !polling {
            return Self { interval: None };
        }

        let millis = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
        let interval = Interval::new(millis, move || {
            let snapshot = observer
                .try_borrow_mut()
                .ok()
                .and_then(|mut o| o.tick().cloned());
            if let Some(snapshot) = snapshot {
                on_tick(snapshot);
            }
        });
        Self {
            interval: Some(interval),
        }
    }

    /// Whether the timer is still armed.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Cancel the timer. Idempotent.
    pub fn stop(&mut self) {
        if self.interval.take().is_some() {
            tracing::debug!("snapshot polling stopped");
        }
    }
}
