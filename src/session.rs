//! One connected run of the daemon: startup scan plus the event loop.

use std::convert::Infallible;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::backend::{BackendError, WindowSystem};
use crate::classify::WindowClassifier;
use crate::config::Config;
use crate::domain::{WindowClass, WindowHandle, WmEvent};
use crate::grab::KeyGrabber;
use crate::keysym::KeyError;
use crate::tracker::{FocusOutcome, FocusTracker};

/// Errors that end a session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Counts from the startup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupReport {
    /// Client-list windows looked at.
    pub scanned: usize,
    /// Windows that matched and were grabbed (focused window included).
    pub protected: usize,
}

/// A client window as seen by `scan_clients`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub window: WindowHandle,
    /// `None` if the window vanished before it could be queried.
    pub class: Option<WindowClass>,
    pub matches: bool,
}

/// Display connection plus everything derived from it.
///
/// Dropping a session discards all of its state, including the last seen
/// focused window.
pub struct Session<W> {
    ws: W,
    classifier: WindowClassifier,
    grabber: KeyGrabber,
    tracker: FocusTracker,
}

impl<W: WindowSystem> Session<W> {
    /// Set up a session on a fresh connection.
    pub fn new(ws: W, config: &Config) -> Result<Self, SessionError> {
        let key = config.key_spec()?;
        let grabber = KeyGrabber::new(&ws, key, config.dry_run)?;
        let classifier = WindowClassifier::new(config.target_class.clone(), config.class_match);

        Ok(Self {
            ws,
            classifier,
            grabber,
            tracker: FocusTracker::new(),
        })
    }

    pub fn tracker(&self) -> &FocusTracker {
        &self.tracker
    }

    /// Subscribe to focus changes and protect windows that already exist.
    ///
    /// The subscription is made first so no focus change is lost between the
    /// scan and the event loop.
    pub fn start(&mut self) -> Result<StartupReport, SessionError> {
        self.ws.subscribe_root()?;

        let mut report = StartupReport::default();
        for window in self.ws.client_list()? {
            report.scanned += 1;
            if self.protect_if_target(window)? {
                report.protected += 1;
            }
        }

        let focused = self.ws.active_window()?;
        if self.protect_if_target(focused)? {
            report.protected += 1;
        }
        self.ws.flush()?;

        info!(
            "Watching {} windows for {}: {} existing windows scanned, {} protected",
            self.classifier.target(),
            self.grabber.key(),
            report.scanned,
            report.protected
        );
        Ok(report)
    }

    /// Run the event loop until the connection fails.
    pub async fn run(&mut self) -> Result<Infallible, SessionError> {
        loop {
            let event = self.ws.next_event().await?;
            self.dispatch(&event)?;
        }
    }

    /// Handle a single event.
    pub fn dispatch(&mut self, event: &WmEvent) -> Result<(), SessionError> {
        match event {
            WmEvent::PropertyChanged {
                window,
                property,
                deleted,
            } => {
                if *deleted {
                    trace!("Property {:?} deleted on {}", property, window);
                }
                let outcome = self.tracker.on_notification(
                    &self.ws,
                    &self.classifier,
                    &self.grabber,
                    event,
                )?;
                if let FocusOutcome::Changed { window, protected } = outcome {
                    trace!("Focus on {} (protected={})", window, protected);
                }
            }
            WmEvent::KeyPressed {
                window,
                keycode,
                state,
            } if *keycode == self.grabber.keycode() => {
                info!(
                    "Blocked {} in window {} (modifier state {:#06x})",
                    self.grabber.key(),
                    window,
                    state
                );
            }
            WmEvent::ProtocolError { kind, bad_value } => {
                debug!("X error {} for {:#x}", kind, bad_value);
            }
            WmEvent::KeyPressed { .. } | WmEvent::Other => {}
        }
        Ok(())
    }

    /// Returns true if `window` matched and at least one grab was installed.
    fn protect_if_target(&self, window: WindowHandle) -> Result<bool, BackendError> {
        Ok(self.classifier.matches(&self.ws, Some(window))?
            && self.grabber.protect(&self.ws, Some(window))?.installed > 0)
    }
}

/// List every client window with its class, without grabbing anything.
pub fn scan_clients<W: WindowSystem + ?Sized>(
    ws: &W,
    classifier: &WindowClassifier,
) -> Result<Vec<ClientInfo>, BackendError> {
    ws.client_list()?
        .into_iter()
        .map(|window| {
            let class = ws.window_class(window)?;
            let matches = class
                .as_ref()
                .and_then(WindowClass::most_specific)
                .is_some_and(|name| classifier.class_matches(name));
            Ok(ClientInfo {
                window,
                class,
                matches,
            })
        })
        .collect()
}
