//! Domain types shared by the focus tracker, classifier and grab manager.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// X11 window identifier (newtype for type safety).
///
/// The XID `0` doubles as "no window", which is what `_NET_ACTIVE_WINDOW`
/// reports when nothing is focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WindowHandle(u32);

impl WindowHandle {
    /// The null window.
    pub const NONE: Self = Self(0);

    /// Wrap a raw XID.
    pub const fn from_raw(xid: u32) -> Self {
        Self(xid)
    }

    /// Get the raw XID.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns true for the null window.
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// `None` for the null window, `Some(self)` otherwise.
    pub fn non_null(self) -> Option<Self> {
        if self.is_none() { None } else { Some(self) }
    }
}

impl From<u32> for WindowHandle {
    fn from(xid: u32) -> Self {
        Self(xid)
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// A core X11 modifier bit.
///
/// Aliases cover the usual X11 mappings (`alt` is Mod1, `numlock` is Mod2,
/// `super` is Mod4) so config files can use either spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Shift,
    #[serde(alias = "capslock")]
    Lock,
    #[serde(alias = "ctrl")]
    Control,
    #[serde(alias = "alt")]
    Mod1,
    #[serde(alias = "numlock")]
    Mod2,
    Mod3,
    #[serde(alias = "super")]
    Mod4,
    Mod5,
}

impl Modifier {
    /// The modifier's bit in an X11 key/button state mask.
    pub const fn bit(self) -> u16 {
        match self {
            Self::Shift => 1 << 0,
            Self::Lock => 1 << 1,
            Self::Control => 1 << 2,
            Self::Mod1 => 1 << 3,
            Self::Mod2 => 1 << 4,
            Self::Mod3 => 1 << 5,
            Self::Mod4 => 1 << 6,
            Self::Mod5 => 1 << 7,
        }
    }

    /// Human readable name, as used in log lines.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shift => "Shift",
            Self::Lock => "Lock",
            Self::Control => "Ctrl",
            Self::Mod1 => "Alt",
            Self::Mod2 => "Mod2",
            Self::Mod3 => "Mod3",
            Self::Mod4 => "Super",
            Self::Mod5 => "Mod5",
        }
    }

    const ALL: [Self; 8] = [
        Self::Shift,
        Self::Lock,
        Self::Control,
        Self::Mod1,
        Self::Mod2,
        Self::Mod3,
        Self::Mod4,
        Self::Mod5,
    ];
}

/// OR together a set of modifiers.
pub fn combine_modifiers(modifiers: &[Modifier]) -> u16 {
    modifiers.iter().fold(0, |mask, m| mask | m.bit())
}

/// The key combination to keep away from the target application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    /// Key name as configured (e.g. "q").
    pub name: String,

    /// Resolved X11 keysym.
    pub keysym: u32,

    /// Base modifier mask that must be held.
    pub modifiers: u16,

    /// Modifier bits whose state must not matter.
    pub ignored: Vec<u16>,
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in Modifier::ALL {
            if self.modifiers & m.bit() != 0 {
                write!(f, "{}+", m.label())?;
            }
        }
        if self.name.chars().count() == 1 {
            write!(f, "{}", self.name.to_uppercase())
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// WM_CLASS strings of a window, generic to specific.
///
/// ICCCM windows carry two entries (instance, class); anything else is
/// tolerated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowClass(Vec<String>);

impl WindowClass {
    /// Create from already split entries.
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    /// Parse a raw WM_CLASS property value.
    ///
    /// The value is Latin-1 text with every entry NUL terminated. Only the
    /// final terminator is dropped, so an empty entry keeps its position.
    pub fn from_property(value: &[u8]) -> Self {
        let value = value.strip_suffix(&[0]).unwrap_or(value);
        if value.is_empty() {
            return Self::default();
        }

        let names = value
            .split(|&b| b == 0)
            .map(|part| part.iter().copied().map(char::from).collect())
            .collect();
        Self(names)
    }

    /// The most specific entry.
    pub fn most_specific(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Root-window properties the daemon cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmProperty {
    /// `_NET_ACTIVE_WINDOW`
    ActiveWindow,
    /// `_NET_CLIENT_LIST`
    ClientList,
    /// Any other atom.
    Other(u32),
}

/// Backend-agnostic protocol event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmEvent {
    /// A property changed (or was deleted) on `window`.
    PropertyChanged {
        window: WindowHandle,
        property: WmProperty,
        deleted: bool,
    },
    /// A grabbed key was pressed while `window` had focus.
    KeyPressed {
        window: WindowHandle,
        keycode: u8,
        state: u16,
    },
    /// An asynchronous protocol error reported by the server.
    ProtocolError { kind: String, bad_value: u32 },
    /// Anything else.
    Other,
}
