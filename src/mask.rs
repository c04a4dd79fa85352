//! Interest and event bit sets.
//!
//! Bit values follow `include/uapi/linux/inotify.h`. They are spelled out
//! instead of taken from `libc` because `libc` does not export every one of
//! them on every target.

use bitflags::bitflags;

bitflags! {
    /// Categories and registration modifiers passed to
    /// [`Session::add_watch`](crate::Session::add_watch).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InterestMask: u32 {
        /// File was accessed (read).
        const ACCESS = 0x0000_0001;
        /// File was modified (written, truncated).
        const MODIFY = 0x0000_0002;
        /// Metadata changed: permissions, timestamps, xattrs, link count, owner.
        const ATTRIB = 0x0000_0004;
        /// File opened for writing was closed.
        const CLOSE_WRITE = 0x0000_0008;
        /// File not opened for writing was closed.
        const CLOSE_NOWRITE = 0x0000_0010;
        /// File or directory was opened.
        const OPEN = 0x0000_0020;
        /// Entry was renamed out of a watched directory.
        const MOVED_FROM = 0x0000_0040;
        /// Entry was renamed into a watched directory.
        const MOVED_TO = 0x0000_0080;
        /// Entry was created in a watched directory.
        const CREATE = 0x0000_0100;
        /// Entry was deleted from a watched directory.
        const DELETE = 0x0000_0200;
        /// The watched path itself was deleted.
        const DELETE_SELF = 0x0000_0400;
        /// The watched path itself was moved.
        const MOVE_SELF = 0x0000_0800;

        const CLOSE = Self::CLOSE_WRITE.bits() | Self::CLOSE_NOWRITE.bits();
        const MOVE = Self::MOVED_FROM.bits() | Self::MOVED_TO.bits();
        const ALL_EVENTS = Self::ACCESS.bits()
            | Self::MODIFY.bits()
            | Self::ATTRIB.bits()
            | Self::CLOSE_WRITE.bits()
            | Self::CLOSE_NOWRITE.bits()
            | Self::OPEN.bits()
            | Self::MOVED_FROM.bits()
            | Self::MOVED_TO.bits()
            | Self::CREATE.bits()
            | Self::DELETE.bits()
            | Self::DELETE_SELF.bits()
            | Self::MOVE_SELF.bits();

        /// Only watch `path` if it is a directory.
        const ONLYDIR = 0x0100_0000;
        /// Do not dereference `path` if it is a symbolic link.
        const DONT_FOLLOW = 0x0200_0000;
        /// Stop reporting events for children once they are unlinked.
        const EXCL_UNLINK = 0x0400_0000;
        /// Fail with [`WatchError::AlreadyWatched`](crate::WatchError::AlreadyWatched)
        /// if `path` already has a watch in this session.
        const MASK_CREATE = 0x1000_0000;
        /// Union into the existing watch's mask instead of replacing it.
        const MASK_ADD = 0x2000_0000;
        /// Remove the watch after the first event.
        const ONESHOT = 0x8000_0000;
    }
}

bitflags! {
    /// Bits observed on a decoded [`EventRecord`](crate::EventRecord).
    ///
    /// Bits the kernel sets that are not named here are kept as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventMask: u32 {
        const ACCESS = 0x0000_0001;
        const MODIFY = 0x0000_0002;
        const ATTRIB = 0x0000_0004;
        const CLOSE_WRITE = 0x0000_0008;
        const CLOSE_NOWRITE = 0x0000_0010;
        const OPEN = 0x0000_0020;
        const MOVED_FROM = 0x0000_0040;
        const MOVED_TO = 0x0000_0080;
        const CREATE = 0x0000_0100;
        const DELETE = 0x0000_0200;
        const DELETE_SELF = 0x0000_0400;
        const MOVE_SELF = 0x0000_0800;

        /// Backing filesystem was unmounted. Followed by [`IGNORED`](Self::IGNORED).
        const UNMOUNT = 0x0000_2000;
        /// The kernel queue overflowed; events were lost. Carries watch descriptor -1.
        const Q_OVERFLOW = 0x0000_4000;
        /// The watch was removed, explicitly or by the kernel.
        const IGNORED = 0x0000_8000;
        /// Subject of the event is a directory.
        const ISDIR = 0x4000_0000;

        const _ = !0;
    }
}

impl EventMask {
    /// Category bits only, without status bits.
    pub fn categories(self) -> InterestMask {
        InterestMask::from_bits_truncate(self.bits()) & InterestMask::ALL_EVENTS
    }

    /// Short lowercase names of the bits that are set, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        const NAMES: &[(EventMask, &str)] = &[
            (EventMask::ACCESS, "access"),
            (EventMask::MODIFY, "modify"),
            (EventMask::ATTRIB, "attrib"),
            (EventMask::CLOSE_WRITE, "close_write"),
            (EventMask::CLOSE_NOWRITE, "close_nowrite"),
            (EventMask::OPEN, "open"),
            (EventMask::MOVED_FROM, "moved_from"),
            (EventMask::MOVED_TO, "moved_to"),
            (EventMask::CREATE, "create"),
            (EventMask::DELETE, "delete"),
            (EventMask::DELETE_SELF, "delete_self"),
            (EventMask::MOVE_SELF, "move_self"),
            (EventMask::UNMOUNT, "unmount"),
            (EventMask::Q_OVERFLOW, "q_overflow"),
            (EventMask::IGNORED, "ignored"),
            (EventMask::ISDIR, "isdir"),
        ];

        NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl InterestMask {
    /// Parse a category name as accepted on the command line.
    pub fn from_category(name: &str) -> Option<Self> {
        let mask = match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "access" => Self::ACCESS,
            "modify" => Self::MODIFY,
            "attrib" => Self::ATTRIB,
            "close_write" => Self::CLOSE_WRITE,
            "close_nowrite" => Self::CLOSE_NOWRITE,
            "close" => Self::CLOSE,
            "open" => Self::OPEN,
            "moved_from" => Self::MOVED_FROM,
            "moved_to" => Self::MOVED_TO,
            "move" => Self::MOVE,
            "create" => Self::CREATE,
            "delete" => Self::DELETE,
            "delete_self" => Self::DELETE_SELF,
            "move_self" => Self::MOVE_SELF,
            "all" => Self::ALL_EVENTS,
            _ => return None,
        };
        Some(mask)
    }
}
