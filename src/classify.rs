//! Decides whether a window belongs to the target application.

use tracing::trace;

use crate::backend::{BackendError, WindowSystem};
use crate::config::ClassMatch;
use crate::domain::WindowHandle;

/// Matches windows against one target WM_CLASS.
#[derive(Debug, Clone)]
pub struct WindowClassifier {
    target: String,
    policy: ClassMatch,
}

impl WindowClassifier {
    pub fn new(target: impl Into<String>, policy: ClassMatch) -> Self {
        Self {
            target: target.into(),
            policy,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns true if `window` belongs to the target application.
    ///
    /// Null handles, destroyed windows and windows without a class are not a
    /// match. Only a lost connection is an error.
    pub fn matches<W: WindowSystem + ?Sized>(
        &self,
        ws: &W,
        window: Option<WindowHandle>,
    ) -> Result<bool, BackendError> {
        let Some(window) = window.and_then(WindowHandle::non_null) else {
            return Ok(false);
        };

        let class = match ws.window_class(window) {
            Ok(Some(class)) => class,
            Ok(None) => {
                trace!("Window {} no longer exists", window);
                return Ok(false);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                trace!("Could not read WM_CLASS of {}: {}", window, e);
                return Ok(false);
            }
        };

        let matched = class
            .most_specific()
            .is_some_and(|name| self.class_matches(name));
        trace!("Window {} class {:?} matched={}", window, class.names(), matched);
        Ok(matched)
    }

    /// Compare a single class name against the target.
    pub fn class_matches(&self, name: &str) -> bool {
        match self.policy {
            ClassMatch::Exact => name == self.target,
            ClassMatch::IgnoreCase => name.eq_ignore_ascii_case(&self.target),
        }
    }
}
