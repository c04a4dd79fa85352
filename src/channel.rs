//! The inotify file descriptor and its raw syscalls.

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tracing::debug;

use crate::decoder::EventDecoder;
use crate::error::ChannelError;

/// Non-blocking, close-on-exec inotify instance registered with the tokio reactor.
///
/// Must be created from within a tokio runtime.
pub(crate) struct Channel {
    fd: AsyncFd<OwnedFd>,
}

impl Channel {
    pub(crate) fn open() -> io::Result<Self> {
        let fd = unsafe { libc::inotify_init1(libc::IN_NONBLOCK | libc::IN_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        // Owned from here on, so a failed registration below still closes it.
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };
        // SAFETY: the AsyncFd takes ownership of `fd`, which stays open until
        // the AsyncFd is dropped and deregisters it.
        let fd = unsafe { AsyncFd::register_with_interest(fd, Interest::READABLE) }?;
        Ok(Self { fd })
    }

    pub(crate) fn register_watch(&self, path: &Path, mask: u32) -> io::Result<i32> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let wd = unsafe { libc::inotify_add_watch(self.fd.as_raw_fd(), c_path.as_ptr(), mask) };
        if wd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(wd)
    }

    pub(crate) fn deregister_watch(&self, wd: i32) -> io::Result<()> {
        let res = unsafe { libc::inotify_rm_watch(self.fd.as_raw_fd(), wd) };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Compact `decoder`, wait for readiness, then read once into its free space.
    ///
    /// Linux answers `EINVAL` when the free space cannot hold the next record;
    /// the buffer is doubled and the read retried until it reaches
    /// [`MAX_BUFFER_CAPACITY`](crate::MAX_BUFFER_CAPACITY).
    pub(crate) async fn fill(&self, decoder: &mut EventDecoder) -> Result<usize, ChannelError> {
        decoder.compact();
        loop {
            let res = self
                .fd
                .async_io(Interest::READABLE, |fd| read_into(fd, decoder.spare_mut()))
                .await;
            match res {
                Ok(n) => return decoder.commit(n),
                Err(e) if e.raw_os_error() == Some(libc::EINVAL) && decoder.grow() => {
                    debug!(capacity = decoder.capacity(), "grew event buffer");
                }
                Err(e) => return Err(ChannelError::Read(e)),
            }
        }
    }
}

/// One `read(2)`, restarted on `EINTR`. `WouldBlock` is left to the caller.
fn read_into(fd: &OwnedFd, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        let res = unsafe { libc::read(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len()) };
        if res >= 0 {
            return Ok(res as usize);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

impl AsRawFd for Channel {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
