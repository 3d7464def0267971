//! Modifier mask expansion for key grabs.
//!
//! The X server only fires a passive key grab when the live modifier state
//! equals the grabbed mask exactly. Ignoring a modifier such as NumLock or
//! CapsLock therefore means grabbing every on/off combination of it.

/// Produce every modifier mask that must be grabbed so the state of the
/// `ignored` bits does not matter.
///
/// Yields `base | OR(S)` for every subset `S` of `ignored`, `2^n` values in
/// total. The empty subset comes first and the full subset last.
pub fn vary_modmask(base: u16, ignored: &[u16]) -> Vec<u16> {
    let subsets = 1usize << ignored.len();

    (0..subsets)
        .map(|selection| {
            ignored
                .iter()
                .enumerate()
                .filter(|(i, _)| selection & (1 << i) != 0)
                .fold(base, |mask, (_, bit)| mask | bit)
        })
        .collect()
}
