//! Window system backends.
//!
//! The focus tracker, classifier and grab manager only talk to the display
//! server through [`WindowSystem`], so they can be driven by the real X11
//! connection or by an in-memory fake in tests.

#[cfg(test)]
pub(crate) mod fake;
mod x11;

use async_trait::async_trait;
use thiserror::Error;
pub use x11::X11Display;

use crate::domain::{WindowClass, WindowHandle, WmEvent};

/// Connection to a display server with EWMH window manager conventions.
#[async_trait(?Send)]
pub trait WindowSystem {
    /// Ask for property change notifications on the root window.
    fn subscribe_root(&self) -> Result<(), BackendError>;

    /// Windows listed in the root window's `_NET_CLIENT_LIST`.
    ///
    /// An absent property is an empty list.
    fn client_list(&self) -> Result<Vec<WindowHandle>, BackendError>;

    /// The window named by the root window's `_NET_ACTIVE_WINDOW`.
    ///
    /// Returns [`WindowHandle::NONE`] when the property is absent or zero.
    fn active_window(&self) -> Result<WindowHandle, BackendError>;

    /// WM_CLASS of a window.
    ///
    /// `Ok(None)` means the window no longer exists (or could not be
    /// resolved for any protocol-level reason). Only connection failures are
    /// errors.
    fn window_class(&self, window: WindowHandle) -> Result<Option<WindowClass>, BackendError>;

    /// Keycode currently producing `keysym`, if any.
    fn keycode_for(&self, keysym: u32) -> Option<u8>;

    /// Install a passive asynchronous key grab on `window`.
    ///
    /// Per-request protocol errors (window vanished, access denied) come back
    /// as [`BackendError::Request`].
    fn grab_key(&self, window: WindowHandle, keycode: u8, modifiers: u16)
    -> Result<(), BackendError>;

    /// Push buffered requests to the server.
    fn flush(&self) -> Result<(), BackendError>;

    /// Wait for the next protocol event.
    ///
    /// This is the only call that suspends.
    async fn next_event(&mut self) -> Result<WmEvent, BackendError>;
}

/// Errors that can occur talking to the display server.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to connect to display: {0}")]
    ConnectFailed(String),

    #[error("Display connection lost: {0}")]
    Connection(String),

    #[error("Request rejected by display server: {0}")]
    Request(String),
}

impl BackendError {
    /// Returns true for errors that leave the connection unusable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Request(_))
    }
}
