//! In-memory window system for tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;

use super::{BackendError, WindowSystem};
use crate::domain::{WindowClass, WindowHandle, WmEvent, WmProperty};

/// Keycode the fake keyboard map assigns to every known keysym.
pub const FAKE_KEYCODE: u8 = 24;

/// Shared state behind a [`FakeWindowSystem`], inspectable after the fake has
/// been moved into a session.
#[derive(Default)]
pub struct FakeState {
    pub subscribed: Cell<bool>,
    pub client_list: RefCell<Vec<WindowHandle>>,
    pub active: Cell<WindowHandle>,
    /// Live windows. Anything not in here is treated as destroyed.
    pub windows: RefCell<HashMap<WindowHandle, WindowClass>>,
    pub mapped_keysyms: RefCell<Vec<u32>>,
    /// Masks for which `grab_key` reports a protocol error.
    pub rejected_masks: RefCell<Vec<u16>>,
    /// Fail every request with a connection error.
    pub disconnected: Cell<bool>,
    /// Queued events, each with the active window the server reports once
    /// the event has been delivered.
    pub events: RefCell<VecDeque<(Option<WindowHandle>, Result<WmEvent, BackendError>)>>,

    pub class_queries: RefCell<Vec<WindowHandle>>,
    pub grab_requests: RefCell<Vec<(WindowHandle, u8, u16)>>,
    pub grabs: RefCell<BTreeSet<(WindowHandle, u8, u16)>>,
}

impl FakeState {
    /// Register a live window with the given WM_CLASS entries.
    pub fn add_window(&self, xid: u32, class: &[&str]) {
        self.windows.borrow_mut().insert(
            WindowHandle::from_raw(xid),
            WindowClass::new(class.iter().map(ToString::to_string).collect()),
        );
    }

    pub fn set_active(&self, xid: u32) {
        self.active.set(WindowHandle::from_raw(xid));
    }

    /// Queue an active-window change notification for `xid`.
    pub fn push_focus_change(&self, xid: u32) {
        self.events
            .borrow_mut()
            .push_back((Some(WindowHandle::from_raw(xid)), Ok(active_window_changed())));
    }

    pub fn push_event(&self, event: Result<WmEvent, BackendError>) {
        self.events.borrow_mut().push_back((None, event));
    }

    /// Windows that received at least one grab.
    pub fn grabbed_windows(&self) -> BTreeSet<WindowHandle> {
        self.grabs.borrow().iter().map(|(w, _, _)| *w).collect()
    }

    pub fn class_query_count(&self) -> usize {
        self.class_queries.borrow().len()
    }

    fn check_connected(&self) -> Result<(), BackendError> {
        if self.disconnected.get() {
            Err(BackendError::Connection("fake display went away".to_string()))
        } else {
            Ok(())
        }
    }
}

/// The notification a window manager emits when focus moves.
pub fn active_window_changed() -> WmEvent {
    WmEvent::PropertyChanged {
        window: WindowHandle::from_raw(1),
        property: WmProperty::ActiveWindow,
        deleted: false,
    }
}

/// [`WindowSystem`] backed by a shared [`FakeState`].
///
/// When the event queue runs dry `next_event` never resolves.
#[derive(Clone, Default)]
pub struct FakeWindowSystem {
    pub state: Rc<FakeState>,
}

impl FakeWindowSystem {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.state.mapped_keysyms.borrow_mut().push(u32::from('q'));
        fake
    }
}

#[async_trait(?Send)]
impl WindowSystem for FakeWindowSystem {
    fn subscribe_root(&self) -> Result<(), BackendError> {
        self.state.check_connected()?;
        self.state.subscribed.set(true);
        Ok(())
    }

    fn client_list(&self) -> Result<Vec<WindowHandle>, BackendError> {
        self.state.check_connected()?;
        Ok(self.state.client_list.borrow().clone())
    }

    fn active_window(&self) -> Result<WindowHandle, BackendError> {
        self.state.check_connected()?;
        Ok(self.state.active.get())
    }

    fn window_class(&self, window: WindowHandle) -> Result<Option<WindowClass>, BackendError> {
        self.state.check_connected()?;
        self.state.class_queries.borrow_mut().push(window);
        Ok(self.state.windows.borrow().get(&window).cloned())
    }

    fn keycode_for(&self, keysym: u32) -> Option<u8> {
        self.state
            .mapped_keysyms
            .borrow()
            .contains(&keysym)
            .then_some(FAKE_KEYCODE)
    }

    fn grab_key(
        &self,
        window: WindowHandle,
        keycode: u8,
        modifiers: u16,
    ) -> Result<(), BackendError> {
        self.state.check_connected()?;
        self.state
            .grab_requests
            .borrow_mut()
            .push((window, keycode, modifiers));

        if !self.state.windows.borrow().contains_key(&window) {
            return Err(BackendError::Request(format!("BadWindow {window}")));
        }
        if self.state.rejected_masks.borrow().contains(&modifiers) {
            return Err(BackendError::Request(format!("BadAccess {modifiers:#x}")));
        }

        self.state
            .grabs
            .borrow_mut()
            .insert((window, keycode, modifiers));
        Ok(())
    }

    fn flush(&self) -> Result<(), BackendError> {
        self.state.check_connected()
    }

    async fn next_event(&mut self) -> Result<WmEvent, BackendError> {
        let next = self.state.events.borrow_mut().pop_front();
        match next {
            Some((active, event)) => {
                if let Some(window) = active {
                    self.state.active.set(window);
                }
                event
            }
            None => std::future::pending().await,
        }
    }
}
