//! Decoded event records and the wire layout they are read from.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::os::unix::ffi::OsStrExt;

use crate::error::ChannelError;
use crate::mask::EventMask;

/// Size of the fixed `inotify_event` header: `wd`, `mask`, `cookie`, `len`.
pub const HEADER_SIZE: usize = 16;

/// Kernel-assigned handle of one watch within a session.
///
/// Unique among the watches currently active in the session that issued it.
/// The kernel may hand the same number out again after the watch is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WatchDescriptor(pub i32);

impl WatchDescriptor {
    /// Descriptor carried by [`EventMask::Q_OVERFLOW`] records.
    pub const OVERFLOW: WatchDescriptor = WatchDescriptor(-1);
}

impl fmt::Display for WatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One change notification.
///
/// `name` is empty for events about the watched path itself and holds the
/// entry's base name for events about children of a watched directory.
/// `cookie` links a [`MOVED_FROM`](EventMask::MOVED_FROM) to its
/// [`MOVED_TO`](EventMask::MOVED_TO) and is 0 otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventRecord {
    pub wd: WatchDescriptor,
    pub mask: EventMask,
    pub cookie: u32,
    pub name: OsString,
}

impl EventRecord {
    pub fn name(&self) -> Option<&OsStr> {
        if self.name.is_empty() {
            None
        } else {
            Some(self.name.as_os_str())
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mask.contains(EventMask::ISDIR)
    }

    /// The watch is gone; this is the last record for `wd`.
    pub fn is_removed(&self) -> bool {
        self.mask.contains(EventMask::IGNORED)
    }

    pub fn is_overflow(&self) -> bool {
        self.mask.contains(EventMask::Q_OVERFLOW)
    }

    pub fn is_unmount(&self) -> bool {
        self.mask.contains(EventMask::UNMOUNT)
    }
}

fn field(bytes: &[u8], at: usize) -> [u8; 4] {
    [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]
}

/// Decode the record at the start of `bytes`.
///
/// Returns the record and the number of bytes it spans (header plus `len`).
/// Fields are read in native byte order, which is how the kernel writes them.
pub(crate) fn decode_record(bytes: &[u8]) -> Result<(EventRecord, usize), ChannelError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ChannelError::Truncated {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let wd = i32::from_ne_bytes(field(bytes, 0));
    let mask = u32::from_ne_bytes(field(bytes, 4));
    let cookie = u32::from_ne_bytes(field(bytes, 8));
    let len = u32::from_ne_bytes(field(bytes, 12)) as usize;

    let span = HEADER_SIZE.saturating_add(len);
    let Some(name_field) = bytes.get(HEADER_SIZE..span) else {
        return Err(ChannelError::Truncated {
            needed: span,
            available: bytes.len(),
        });
    };

    // The name is NUL-terminated and then NUL-padded; padding length varies.
    let name = match name_field.iter().position(|&b| b == 0) {
        Some(end) => &name_field[..end],
        None => name_field,
    };

    let record = EventRecord {
        wd: WatchDescriptor(wd),
        mask: EventMask::from_bits_retain(mask),
        cookie,
        name: OsStr::from_bytes(name).to_os_string(),
    };
    Ok((record, span))
}

/// Encode a record the way the kernel lays it out, padding the name to
/// `name_field` bytes (rounded up to hold the terminating NUL).
#[cfg(test)]
pub(crate) fn encode_record(record: &EventRecord, name_field: usize) -> Vec<u8> {
    let name = record.name.as_bytes();
    let len = if name.is_empty() && name_field == 0 {
        0
    } else {
        name_field.max(name.len() + 1)
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + len);
    out.extend_from_slice(&record.wd.0.to_ne_bytes());
    out.extend_from_slice(&record.mask.bits().to_ne_bytes());
    out.extend_from_slice(&record.cookie.to_ne_bytes());
    out.extend_from_slice(&(len as u32).to_ne_bytes());
    out.extend_from_slice(name);
    out.resize(HEADER_SIZE + len, 0);
    out
}
