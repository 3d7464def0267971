//! keyblock-focusd - keeps a key combination away from one X11 application.
//!
//! Follows `_NET_ACTIVE_WINDOW` and installs a passive key grab on every
//! focused window whose WM_CLASS names the target application, so the key
//! (Ctrl+Q by default) is swallowed before the application sees it.

pub mod backend;
pub mod classify;
pub mod config;
pub mod domain;
pub mod grab;
pub mod keysym;
pub mod modmask;
pub mod session;
pub mod supervisor;
pub mod tracker;
