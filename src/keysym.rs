//! Key symbol names and keysym to keycode lookup.

use thiserror::Error;

/// Keysyms for named (non-printable) keys, from X11's `keysymdef.h`.
const NAMED_KEYSYMS: &[(&str, u32)] = &[
    ("space", 0x0020),
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Pause", 0xff13),
    ("Escape", 0xff1b),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Prior", 0xff55),
    ("Page_Up", 0xff55),
    ("Next", 0xff56),
    ("Page_Down", 0xff56),
    ("End", 0xff57),
    ("Print", 0xff61),
    ("Insert", 0xff63),
    ("Menu", 0xff67),
    ("Delete", 0xffff),
];

/// Keysym of `F1`; `F2`..`F35` follow consecutively.
const XK_F1: u32 = 0xffbe;

/// Errors resolving the configured key.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeyError {
    #[error("Unknown key name: {0:?}")]
    UnknownName(String),

    #[error("Keysym {0:#x} is not on the current keyboard map")]
    NotMapped(u32),
}

/// Convert a key name to a keysym.
///
/// Accepts single printable Latin-1 characters (`"q"`, `"Q"`, `"1"`), the
/// named keys from `keysymdef.h` that make sense to block (`"Escape"`,
/// `"Delete"`, ...) and function keys `F1`..`F35`. Named keys match
/// case-insensitively; single characters are taken literally.
pub fn string_to_keysym(name: &str) -> Option<u32> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.clone().next()) {
        let code = u32::from(c);
        if (0x20..=0x7e).contains(&code) || (0xa0..=0xff).contains(&code) {
            return Some(code);
        }
        return None;
    }

    if let Some(&(_, keysym)) = NAMED_KEYSYMS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
    {
        return Some(keysym);
    }

    let number = name
        .strip_prefix('F')
        .or_else(|| name.strip_prefix('f'))?
        .parse::<u32>()
        .ok()?;
    if (1..=35).contains(&number) {
        Some(XK_F1 + number - 1)
    } else {
        None
    }
}

/// Find the first keycode whose keysym list contains `keysym`.
///
/// `keysyms` is the flat table from a `GetKeyboardMapping` reply covering
/// keycodes starting at `min_keycode`, `keysyms_per_keycode` entries each.
pub fn keysym_to_keycode(
    keysyms: &[u32],
    keysyms_per_keycode: u8,
    min_keycode: u8,
    keysym: u32,
) -> Option<u8> {
    let per_keycode = usize::from(keysyms_per_keycode);
    if per_keycode == 0 {
        return None;
    }

    keysyms
        .chunks(per_keycode)
        .position(|syms| syms.contains(&keysym))
        .and_then(|index| u8::try_from(index).ok())
        .and_then(|offset| min_keycode.checked_add(offset))
}
