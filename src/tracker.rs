//! Focus change tracking.
//!
//! Watches `_NET_ACTIVE_WINDOW` notifications and protects each newly
//! focused window that belongs to the target application.

use tracing::{debug, trace};

use crate::backend::{BackendError, WindowSystem};
use crate::classify::WindowClassifier;
use crate::domain::{WindowHandle, WmEvent, WmProperty};
use crate::grab::KeyGrabber;

/// What a notification amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    /// Not an active-window notification.
    Ignored,
    /// Focus is still on the last seen window.
    Unchanged,
    /// Focus moved to `window`; `protected` if it matched and at least one
    /// grab was installed.
    Changed {
        window: WindowHandle,
        protected: bool,
    },
}

/// Remembers the last focused window.
#[derive(Debug, Default)]
pub struct FocusTracker {
    /// `None` until the first notification has been processed.
    last_seen: Option<WindowHandle>,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last window seen focused, `None` while still unknown.
    pub fn last_seen(&self) -> Option<WindowHandle> {
        self.last_seen
    }

    /// Process one protocol event.
    ///
    /// Grabs are only ever added; a window that loses focus keeps its grab.
    pub fn on_notification<W: WindowSystem + ?Sized>(
        &mut self,
        ws: &W,
        classifier: &WindowClassifier,
        grabber: &KeyGrabber,
        event: &WmEvent,
    ) -> Result<FocusOutcome, BackendError> {
        if !matches!(
            event,
            WmEvent::PropertyChanged {
                property: WmProperty::ActiveWindow,
                ..
            }
        ) {
            return Ok(FocusOutcome::Ignored);
        }

        let window = ws.active_window()?;
        if self.last_seen == Some(window) {
            trace!("Active window unchanged: {}", window);
            return Ok(FocusOutcome::Unchanged);
        }

        debug!(
            "Focus changed: {} -> {}",
            self.last_seen
                .map_or_else(|| "unknown".to_string(), |w| w.to_string()),
            window
        );
        self.last_seen = Some(window);

        let protected = classifier.matches(ws, Some(window))?
            && grabber.protect(ws, Some(window))?.installed > 0;

        Ok(FocusOutcome::Changed { window, protected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{FakeWindowSystem, active_window_changed};
    use crate::config::{ClassMatch, Config};

    struct Fixture {
        ws: FakeWindowSystem,
        classifier: WindowClassifier,
        grabber: KeyGrabber,
        tracker: FocusTracker,
    }

    impl Fixture {
        fn new() -> Self {
            let ws = FakeWindowSystem::new();
            let grabber =
                KeyGrabber::new(&ws, Config::default().key_spec().unwrap(), false).unwrap();
            Self {
                ws,
                classifier: WindowClassifier::new("Firefox", ClassMatch::Exact),
                grabber,
                tracker: FocusTracker::new(),
            }
        }

        fn focus(&mut self, xid: u32) -> FocusOutcome {
            self.ws.state.set_active(xid);
            self.deliver(&active_window_changed())
        }

        fn deliver(&mut self, event: &WmEvent) -> FocusOutcome {
            self.tracker
                .on_notification(&self.ws, &self.classifier, &self.grabber, event)
                .unwrap()
        }
    }

    #[test]
    fn test_starts_unknown() {
        assert_eq!(FocusTracker::new().last_seen(), None);
    }

    #[test]
    fn test_unrelated_events_are_ignored() {
        let mut fx = Fixture::new();
        fx.ws.state.set_active(11);
        fx.ws.state.add_window(11, &["Navigator", "Firefox"]);

        let events = [
            WmEvent::PropertyChanged {
                window: WindowHandle::from_raw(1),
                property: WmProperty::ClientList,
                deleted: false,
            },
            WmEvent::PropertyChanged {
                window: WindowHandle::from_raw(1),
                property: WmProperty::Other(355),
                deleted: false,
            },
            WmEvent::KeyPressed {
                window: WindowHandle::from_raw(11),
                keycode: 24,
                state: 0x04,
            },
            WmEvent::Other,
        ];
        for event in &events {
            assert_eq!(fx.deliver(event), FocusOutcome::Ignored);
        }

        assert_eq!(fx.tracker.last_seen(), None);
        assert_eq!(fx.ws.state.class_query_count(), 0);
    }

    #[test]
    fn test_target_window_gets_protected() {
        let mut fx = Fixture::new();
        fx.ws.state.add_window(11, &["Navigator", "Firefox"]);

        let outcome = fx.focus(11);
        let w = WindowHandle::from_raw(11);
        assert_eq!(
            outcome,
            FocusOutcome::Changed {
                window: w,
                protected: true
            }
        );
        assert_eq!(fx.ws.state.grabbed_windows().into_iter().collect::<Vec<_>>(), [w]);
    }

    #[test]
    fn test_repeated_notification_is_suppressed() {
        let mut fx = Fixture::new();
        fx.ws.state.add_window(11, &["Navigator", "Firefox"]);

        fx.focus(11);
        let queries = fx.ws.state.class_query_count();
        let requests = fx.ws.state.grab_requests.borrow().len();

        assert_eq!(fx.focus(11), FocusOutcome::Unchanged);
        assert_eq!(fx.ws.state.class_query_count(), queries);
        assert_eq!(fx.ws.state.grab_requests.borrow().len(), requests);
    }

    #[test]
    fn test_repeated_none_is_suppressed() {
        let mut fx = Fixture::new();

        assert_eq!(
            fx.focus(0),
            FocusOutcome::Changed {
                window: WindowHandle::NONE,
                protected: false
            }
        );
        assert_eq!(fx.focus(0), FocusOutcome::Unchanged);
        assert_eq!(fx.tracker.last_seen(), Some(WindowHandle::NONE));
        assert_eq!(fx.ws.state.class_query_count(), 0);
    }

    #[test]
    fn test_non_target_window_is_not_grabbed() {
        let mut fx = Fixture::new();
        fx.ws.state.add_window(20, &["xterm", "XTerm"]);

        let outcome = fx.focus(20);
        assert_eq!(
            outcome,
            FocusOutcome::Changed {
                window: WindowHandle::from_raw(20),
                protected: false
            }
        );
        assert_eq!(fx.tracker.last_seen(), Some(WindowHandle::from_raw(20)));
        assert!(fx.ws.state.grab_requests.borrow().is_empty());
    }

    #[test]
    fn test_destroyed_window_still_updates_state() {
        let mut fx = Fixture::new();

        let outcome = fx.focus(30);
        assert_eq!(
            outcome,
            FocusOutcome::Changed {
                window: WindowHandle::from_raw(30),
                protected: false
            }
        );
        assert_eq!(fx.tracker.last_seen(), Some(WindowHandle::from_raw(30)));
        assert!(fx.ws.state.grab_requests.borrow().is_empty());
    }

    #[test]
    fn test_switching_away_keeps_existing_grab() {
        let mut fx = Fixture::new();
        fx.ws.state.add_window(11, &["Navigator", "Firefox"]);
        fx.ws.state.add_window(20, &["xterm", "XTerm"]);

        fx.focus(11);
        let grabs = fx.ws.state.grabs.borrow().clone();
        fx.focus(20);
        assert_eq!(*fx.ws.state.grabs.borrow(), grabs);

        // Coming back re-grabs, which changes nothing.
        assert_eq!(
            fx.focus(11),
            FocusOutcome::Changed {
                window: WindowHandle::from_raw(11),
                protected: true
            }
        );
        assert_eq!(*fx.ws.state.grabs.borrow(), grabs);
    }

    #[test]
    fn test_dry_run_is_not_counted_as_protected() {
        let mut fx = Fixture::new();
        fx.grabber = KeyGrabber::new(&fx.ws, Config::default().key_spec().unwrap(), true).unwrap();
        fx.ws.state.add_window(11, &["Navigator", "Firefox"]);

        assert_eq!(
            fx.focus(11),
            FocusOutcome::Changed {
                window: WindowHandle::from_raw(11),
                protected: false
            }
        );
        assert!(fx.ws.state.grabs.borrow().is_empty());
    }

    #[test]
    fn test_fully_rejected_grab_is_not_counted_as_protected() {
        let mut fx = Fixture::new();
        fx.ws.state.add_window(11, &["Navigator", "Firefox"]);
        fx.ws.state.rejected_masks.borrow_mut().extend([0x04, 0x06, 0x14, 0x16]);

        assert_eq!(
            fx.focus(11),
            FocusOutcome::Changed {
                window: WindowHandle::from_raw(11),
                protected: false
            }
        );
        assert_eq!(fx.ws.state.grab_requests.borrow().len(), 4);
    }

    #[test]
    fn test_lost_connection_propagates() {
        let mut fx = Fixture::new();
        fx.ws.state.disconnected.set(true);

        let result = fx.tracker.on_notification(
            &fx.ws,
            &fx.classifier,
            &fx.grabber,
            &active_window_changed(),
        );
        assert!(result.is_err());
    }
}
