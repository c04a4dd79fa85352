//! Error types for sessions, watches and event reads.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::event::WatchDescriptor;

/// Errors from [`Session::add_watch`](crate::Session::add_watch) and
/// [`Session::remove_watch`](crate::Session::remove_watch).
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Cannot watch {path}: no such file or directory")]
    NotFound { path: PathBuf },

    #[error("Cannot watch {path}: permission denied")]
    PermissionDenied { path: PathBuf },

    #[error("Cannot watch {path}: not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Cannot watch {path}: already watched in this session")]
    AlreadyWatched { path: PathBuf },

    #[error("Cannot watch {path}: path contains a NUL byte")]
    InvalidPath { path: PathBuf },

    #[error("Watch limit exceeded (see /proc/sys/fs/inotify/max_user_watches)")]
    LimitExceeded,

    #[error("Watch descriptor {0} is not active in this session")]
    NotActive(WatchDescriptor),

    #[error("Watch operation failed: {0}")]
    Io(#[from] io::Error),
}

impl WatchError {
    /// Classify an `inotify_add_watch` failure.
    pub(crate) fn from_add(err: io::Error, path: PathBuf) -> Self {
        match err.raw_os_error() {
            Some(libc::ENOENT) => WatchError::NotFound { path },
            Some(libc::EACCES) => WatchError::PermissionDenied { path },
            Some(libc::ENOTDIR) => WatchError::NotADirectory { path },
            Some(libc::EEXIST) => WatchError::AlreadyWatched { path },
            Some(libc::ENOSPC) => WatchError::LimitExceeded,
            None if err.kind() == io::ErrorKind::InvalidInput => WatchError::InvalidPath { path },
            _ => WatchError::Io(err),
        }
    }

    /// Classify an `inotify_rm_watch` failure.
    pub(crate) fn from_remove(err: io::Error, wd: WatchDescriptor) -> Self {
        match err.raw_os_error() {
            Some(libc::EINVAL) => WatchError::NotActive(wd),
            _ => WatchError::Io(err),
        }
    }
}

/// Failures of the notification channel itself.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to open inotify channel: {0}")]
    Open(#[source] io::Error),

    #[error("Failed to read from inotify channel: {0}")]
    Read(#[source] io::Error),

    #[error("Truncated event record: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
}

/// Errors from [`Session::next_event`](crate::Session::next_event).
#[derive(Error, Debug)]
pub enum EventError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("No event arrived before the deadline")]
    Timeout,
}

impl EventError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, EventError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_errno_mapping() {
        let path = PathBuf::from("/nope");
        let err = WatchError::from_add(io::Error::from_raw_os_error(libc::ENOENT), path.clone());
        assert!(matches!(err, WatchError::NotFound { path: p } if p == path));

        let err = WatchError::from_add(io::Error::from_raw_os_error(libc::ENOSPC), path.clone());
        assert!(matches!(err, WatchError::LimitExceeded));

        let err = WatchError::from_add(io::Error::from_raw_os_error(libc::EBADF), path.clone());
        assert!(matches!(err, WatchError::Io(_)));

        let nul = io::Error::new(io::ErrorKind::InvalidInput, "nul byte");
        let err = WatchError::from_add(nul, path);
        assert!(matches!(err, WatchError::InvalidPath { .. }));
    }

    #[test]
    fn test_remove_errno_mapping() {
        let wd = WatchDescriptor(7);
        let err = WatchError::from_remove(io::Error::from_raw_os_error(libc::EINVAL), wd);
        assert!(matches!(err, WatchError::NotActive(WatchDescriptor(7))));
        assert_eq!(err.to_string(), "Watch descriptor 7 is not active in this session");
    }

    #[test]
    fn test_timeout_predicate() {
        assert!(EventError::Timeout.is_timeout());
        let truncated = EventError::from(ChannelError::Truncated {
            needed: 16,
            available: 3,
        });
        assert!(!truncated.is_timeout());
    }
}
