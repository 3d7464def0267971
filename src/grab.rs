//! Installs the blocking key grab on target windows.

use tracing::{debug, info};

use crate::backend::{BackendError, WindowSystem};
use crate::domain::{KeySpec, WindowHandle};
use crate::keysym::KeyError;
use crate::modmask::vary_modmask;

/// Outcome of a grab pass over one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrabReport {
    /// Mask variants the server accepted.
    pub installed: usize,
    /// Mask variants the server rejected.
    pub failed: usize,
}

/// Grabs the configured key on windows so it never reaches them.
#[derive(Debug, Clone)]
pub struct KeyGrabber {
    key: KeySpec,
    keycode: u8,
    masks: Vec<u16>,
    dry_run: bool,
}

impl KeyGrabber {
    /// Resolve the key against the display's current keyboard map.
    pub fn new<W: WindowSystem + ?Sized>(
        ws: &W,
        key: KeySpec,
        dry_run: bool,
    ) -> Result<Self, KeyError> {
        let keycode = ws
            .keycode_for(key.keysym)
            .ok_or(KeyError::NotMapped(key.keysym))?;
        let masks = vary_modmask(key.modifiers, &key.ignored);
        debug!(
            "Blocking {} as keycode {} with masks {:x?}",
            key, keycode, masks
        );

        Ok(Self {
            key,
            keycode,
            masks,
            dry_run,
        })
    }

    pub fn key(&self) -> &KeySpec {
        &self.key
    }

    pub fn keycode(&self) -> u8 {
        self.keycode
    }

    /// Grab the key on `window` under every modifier variant.
    ///
    /// Grabbing again what is already grabbed is harmless, so this is safe to
    /// repeat for the same window. Rejected variants are skipped; only a lost
    /// connection aborts the pass.
    pub fn protect<W: WindowSystem + ?Sized>(
        &self,
        ws: &W,
        window: Option<WindowHandle>,
    ) -> Result<GrabReport, BackendError> {
        let mut report = GrabReport::default();
        let Some(window) = window.and_then(WindowHandle::non_null) else {
            return Ok(report);
        };

        if self.dry_run {
            info!("[dry-run] Would block {} on window {}", self.key, window);
            return Ok(report);
        }

        for &mask in &self.masks {
            match ws.grab_key(window, self.keycode, mask) {
                Ok(()) => report.installed += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!("Grab of mask {:#06x} on {} failed: {}", mask, window, e);
                    report.failed += 1;
                }
            }
        }

        if report.installed > 0 {
            info!("Blocking {} on window {}", self.key, window);
        }
        Ok(report)
    }
}
