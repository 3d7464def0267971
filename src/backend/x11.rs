//! X11 backend on top of `x11rb`'s pure Rust connection.
//!
//! Events are awaited through the connection's file descriptor registered
//! with tokio, so the whole daemon runs on a single thread.

use std::os::fd::{AsRawFd, RawFd};

use async_trait::async_trait;
use tokio::io::unix::AsyncFd;
use tracing::{debug, info, trace};
use x11rb::connection::Connection;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    AtomEnum, ChangeWindowAttributesAux, ConnectionExt as _, EventMask, GetPropertyReply,
    GrabMode, ModMask, Property, Window,
};
use x11rb::rust_connection::RustConnection;

use super::{BackendError, WindowSystem};
use crate::domain::{WindowClass, WindowHandle, WmEvent, WmProperty};
use crate::keysym::keysym_to_keycode;

// EWMH atoms read from the root window.
x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        _NET_ACTIVE_WINDOW,
        _NET_CLIENT_LIST,
    }
}

/// Longest WM_CLASS value read, in 32-bit units.
const WM_CLASS_MAX_LEN: u32 = 1024;

/// Raw descriptor of the X connection, registered with the tokio reactor.
struct ConnectionFd(RawFd);

impl AsRawFd for ConnectionFd {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

/// Keyboard mapping snapshot taken at connect time.
struct KeyboardMap {
    keysyms: Vec<u32>,
    keysyms_per_keycode: u8,
    min_keycode: u8,
}

/// Live connection to an X display.
pub struct X11Display {
    // Declared before `conn` so the descriptor is deregistered before the
    // connection closes it.
    readiness: AsyncFd<ConnectionFd>,
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
    keymap: KeyboardMap,
}

impl X11Display {
    /// Connect to `display` (or `$DISPLAY` when `None`) and intern atoms.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(display: Option<&str>) -> Result<Self, BackendError> {
        let (conn, screen_num) = x11rb::connect(display)?;
        let root = conn.setup().roots[screen_num].root;
        info!("Connected to X display (screen {}, root {:#x})", screen_num, root);

        let atoms = Atoms::new(&conn)?.reply()?;

        let setup = conn.setup();
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode - min_keycode + 1;
        let mapping = conn.get_keyboard_mapping(min_keycode, count)?.reply()?;
        debug!(
            "Loaded keyboard map: {} keycodes, {} keysyms each",
            count, mapping.keysyms_per_keycode
        );

        let readiness = AsyncFd::new(ConnectionFd(conn.stream().as_raw_fd()))
            .map_err(|e| BackendError::ConnectFailed(format!("register X socket: {e}")))?;

        Ok(Self {
            readiness,
            conn,
            root,
            atoms,
            keymap: KeyboardMap {
                keysyms: mapping.keysyms,
                keysyms_per_keycode: mapping.keysyms_per_keycode,
                min_keycode,
            },
        })
    }

    /// Read a root window property as a list of 32-bit values.
    fn root_property32(&self, property: u32, length: u32) -> Result<Vec<u32>, BackendError> {
        let reply = self
            .conn
            .get_property(false, self.root, property, AtomEnum::ANY, 0, length)?
            .reply()?;

        Ok(reply
            .value32()
            .map(|values| values.collect::<Vec<u32>>())
            .unwrap_or_default())
    }
}

#[async_trait(?Send)]
impl WindowSystem for X11Display {
    fn subscribe_root(&self) -> Result<(), BackendError> {
        let attrs = ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE);
        self.conn
            .change_window_attributes(self.root, &attrs)?
            .check()?;
        Ok(())
    }

    fn client_list(&self) -> Result<Vec<WindowHandle>, BackendError> {
        let windows = self.root_property32(self.atoms._NET_CLIENT_LIST, u32::MAX)?;
        Ok(windows.into_iter().map(WindowHandle::from).collect())
    }

    fn active_window(&self) -> Result<WindowHandle, BackendError> {
        let values = self.root_property32(self.atoms._NET_ACTIVE_WINDOW, 1)?;
        Ok(values
            .first()
            .copied()
            .map_or(WindowHandle::NONE, WindowHandle::from))
    }

    fn window_class(&self, window: WindowHandle) -> Result<Option<WindowClass>, BackendError> {
        if window.is_none() {
            return Ok(None);
        }

        let cookie = self.conn.get_property(
            false,
            window.raw(),
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            0,
            WM_CLASS_MAX_LEN,
        )?;

        class_from_reply(window, cookie.reply())
    }

    fn keycode_for(&self, keysym: u32) -> Option<u8> {
        keysym_to_keycode(
            &self.keymap.keysyms,
            self.keymap.keysyms_per_keycode,
            self.keymap.min_keycode,
            keysym,
        )
    }

    fn grab_key(
        &self,
        window: WindowHandle,
        keycode: u8,
        modifiers: u16,
    ) -> Result<(), BackendError> {
        self.conn
            .grab_key(
                true,
                window.raw(),
                ModMask::from(modifiers),
                keycode,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?
            .check()?;
        Ok(())
    }

    fn flush(&self) -> Result<(), BackendError> {
        self.conn.flush()?;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<WmEvent, BackendError> {
        loop {
            self.conn.flush()?;
            if let Some(event) = self.conn.poll_for_event()? {
                return Ok(translate(&self.atoms, event));
            }

            let mut guard = self
                .readiness
                .readable()
                .await
                .map_err(|e| BackendError::Connection(format!("wait for X socket: {e}")))?;
            guard.clear_ready();
        }
    }
}

fn property_kind(atoms: &Atoms, atom: u32) -> WmProperty {
    if atom == atoms._NET_ACTIVE_WINDOW {
        WmProperty::ActiveWindow
    } else if atom == atoms._NET_CLIENT_LIST {
        WmProperty::ClientList
    } else {
        WmProperty::Other(atom)
    }
}

fn translate(atoms: &Atoms, event: Event) -> WmEvent {
    match event {
        Event::PropertyNotify(e) => WmEvent::PropertyChanged {
            window: WindowHandle::from(e.window),
            property: property_kind(atoms, e.atom),
            deleted: e.state == Property::DELETE,
        },
        Event::KeyPress(e) => WmEvent::KeyPressed {
            window: WindowHandle::from(e.event),
            keycode: e.detail,
            state: u16::from(e.state),
        },
        Event::Error(e) => WmEvent::ProtocolError {
            kind: format!("{:?}", e.error_kind),
            bad_value: e.bad_value,
        },
        other => {
            trace!("Unhandled X event: {:?}", other);
            WmEvent::Other
        }
    }
}

/// A WM_CLASS query that the server rejected means the window is gone.
fn class_from_reply(
    window: WindowHandle,
    reply: Result<GetPropertyReply, ReplyError>,
) -> Result<Option<WindowClass>, BackendError> {
    match reply {
        Ok(reply) => Ok(Some(WindowClass::from_property(&reply.value))),
        Err(ReplyError::X11Error(e)) => {
            debug!("Window {} vanished: {:?}", window, e.error_kind);
            Ok(None)
        }
        Err(ReplyError::ConnectionError(e)) => Err(e.into()),
    }
}

impl From<ConnectError> for BackendError {
    fn from(e: ConnectError) -> Self {
        Self::ConnectFailed(e.to_string())
    }
}

impl From<ConnectionError> for BackendError {
    fn from(e: ConnectionError) -> Self {
        Self::Connection(e.to_string())
    }
}

impl From<ReplyError> for BackendError {
    fn from(e: ReplyError) -> Self {
        match e {
            ReplyError::ConnectionError(e) => e.into(),
            ReplyError::X11Error(e) => {
                Self::Request(format!("{:?} (bad value {:#x})", e.error_kind, e.bad_value))
            }
        }
    }
}
