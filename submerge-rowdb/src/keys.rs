//! Composite string keys for the two tables keyed on more than one
//! field. NUL-separated since none of `room`/`event_type`/`state_key`
//! can themselves contain a NUL byte (they're Matrix identifiers/type
//! strings), and it sorts the same way `redb`'s lexicographic `&str`
//! ordering would regardless of field widths.

pub fn present_key(room: &str, event_type: &str, state_key: &str) -> String {
    format!("{room}\0{event_type}\0{state_key}")
}

/// Zero-padded depth keeps per-`(room, type, state_key)` history entries
/// in depth order under plain lexicographic `&str` comparison; `index`
/// is appended so two state changes landing at the same depth (a DAG
/// fork) still get distinct keys.
pub fn history_key(room: &str, event_type: &str, state_key: &str, depth: i64, index: u64) -> String {
    format!("{room}\0{event_type}\0{state_key}\0{depth:020}\0{index:020}")
}

pub fn history_prefix(room: &str, event_type: &str, state_key: &str) -> String {
    format!("{room}\0{event_type}\0{state_key}\0")
}
