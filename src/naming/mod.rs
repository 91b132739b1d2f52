//! Setup identity naming scheme
//!
//! A synchronized setup carries its identity in its file name:
//!
//! ```text
//! <stem>__sync-<origin-track>[-<n>][.<ext>]
//! ```
//!
//! The origin track keeps two setups that share a name on different tracks
//! apart, and `-<n>` (n >= 2) resolves whatever collisions remain. The marker
//! is the only persisted sync state, so recognizing it is what makes a re-run
//! of the initial sync a no-op.

use crate::types::SyncError;

/// Marker separating the original stem from the origin track
pub const SYNC_MARKER: &str = "__sync-";

/// Upper bound for the numeric disambiguator
pub const MAX_DISAMBIGUATOR: u32 = 999;

/// Split a file name into stem and extension at the last dot.
///
/// A leading dot does not start an extension.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Check if a name already carries a sync identity
pub fn is_synchronized(name: &str) -> bool {
    marker_tail(name).is_some()
}

/// Text after the marker: origin track plus optional disambiguator
pub fn marker_tail(name: &str) -> Option<&str> {
    let (stem, _) = split_name(name);
    let idx = stem.rfind(SYNC_MARKER)?;
    let tail = &stem[idx + SYNC_MARKER.len()..];
    if tail.is_empty() {
        None
    } else {
        Some(tail)
    }
}

/// Check if a synchronized name was first assigned on `track`
pub fn names_origin(name: &str, track: &str) -> bool {
    let Some(tail) = marker_tail(name) else {
        return false;
    };
    if tail == track {
        return true;
    }
    tail.strip_prefix(track)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Check if a file name is never treated as a setup (hidden or temporary)
pub fn is_ignored_name(name: &str) -> bool {
    name.is_empty() || name.starts_with('.')
}

/// Build the `n`-th identity candidate for `name` found on `track`.
///
/// `n < 2` yields the plain form without disambiguator.
pub fn candidate(name: &str, track: &str, n: u32) -> String {
    let (stem, ext) = split_name(name);
    let mut out = format!("{stem}{SYNC_MARKER}{track}");
    if n >= 2 {
        out.push('-');
        out.push_str(&n.to_string());
    }
    if let Some(ext) = ext {
        out.push('.');
        out.push_str(ext);
    }
    out
}

/// Assign a globally unique identity to an unsynchronized setup.
///
/// `is_taken` answers whether a name is already used anywhere in the root.
/// Candidates are tried in order, so the same tree always yields the same
/// identity.
pub fn assign_identity(
    name: &str,
    track: &str,
    is_taken: impl Fn(&str) -> bool,
) -> Result<String, SyncError> {
    let first = candidate(name, track, 0);
    if !is_taken(&first) {
        return Ok(first);
    }

    for n in 2..=MAX_DISAMBIGUATOR {
        let next = candidate(name, track, n);
        if !is_taken(&next) {
            return Ok(next);
        }
    }

    Err(SyncError::NameCollision {
        name: name.to_string(),
        track: track.to_string(),
    })
}
