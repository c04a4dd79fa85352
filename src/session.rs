//! Sessions: one inotify channel, its watches and its event stream.

use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::channel::Channel;
use crate::decoder::{EventDecoder, DEFAULT_BUFFER_CAPACITY};
use crate::error::{ChannelError, EventError, WatchError};
use crate::event::{EventRecord, WatchDescriptor};
use crate::mask::InterestMask;

/// Builder for configuring and opening a [`Session`].
///
/// # Example
///
/// ```no_run
/// use inotify_events::{InterestMask, SessionBuilder};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = SessionBuilder::new().buffer_capacity(16 * 1024).open()?;
/// session.add_watch("/tmp", InterestMask::CREATE | InterestMask::DELETE)?;
/// let event = session.next_event(None).await?;
/// println!("{:?} {:?}", event.mask, event.name);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    buffer_capacity: usize,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// Defaults: a 4 KiB read buffer.
    pub fn new() -> Self {
        SessionBuilder {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }

    /// Initial size of the read buffer in bytes.
    ///
    /// Clamped to at least one record header. A buffer too small for the next
    /// record is grown automatically, so this only tunes how many records one
    /// read can pick up.
    pub fn buffer_capacity(mut self, bytes: usize) -> Self {
        self.buffer_capacity = bytes;
        self
    }

    /// Open the inotify channel. Must be called inside a tokio runtime.
    pub fn open(self) -> Result<Session, ChannelError> {
        let channel = Channel::open().map_err(ChannelError::Open)?;
        let decoder = EventDecoder::with_capacity(self.buffer_capacity);
        debug!(
            fd = channel.as_raw_fd(),
            buffer = decoder.capacity(),
            "opened inotify session"
        );
        Ok(Session { channel, decoder })
    }
}

/// An open inotify channel together with its decode buffer.
///
/// Watch descriptors issued by a session are only meaningful to that session
/// and become invalid when it is closed or dropped.
pub struct Session {
    channel: Channel,
    decoder: EventDecoder,
}

impl Session {
    /// Open a session with default settings.
    pub fn open() -> Result<Self, ChannelError> {
        SessionBuilder::new().open()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Register interest in `path`, or update the existing watch on it.
    ///
    /// Without [`InterestMask::MASK_ADD`] the new mask replaces the old one;
    /// with it the two are unioned. Either way an existing watch keeps its
    /// descriptor.
    pub fn add_watch(
        &self,
        path: impl AsRef<Path>,
        mask: InterestMask,
    ) -> Result<WatchDescriptor, WatchError> {
        let path = path.as_ref();
        let wd = self
            .channel
            .register_watch(path, mask.bits())
            .map_err(|e| WatchError::from_add(e, path.to_path_buf()))?;
        debug!(path = %path.display(), ?mask, wd, "added watch");
        Ok(WatchDescriptor(wd))
    }

    /// Remove a watch.
    ///
    /// The kernel queues one final record with [`EventMask::IGNORED`] for `wd`;
    /// it arrives through [`next_event`](Self::next_event) like any other, not
    /// before this returns.
    ///
    /// [`EventMask::IGNORED`]: crate::EventMask::IGNORED
    pub fn remove_watch(&self, wd: WatchDescriptor) -> Result<(), WatchError> {
        self.channel
            .deregister_watch(wd.0)
            .map_err(|e| WatchError::from_remove(e, wd))?;
        debug!(wd = wd.0, "removed watch");
        Ok(())
    }

    /// Wait for the next event.
    ///
    /// Buffered records are returned without touching the channel. Otherwise
    /// one read is issued; if nothing arrives before `deadline` the call fails
    /// with [`EventError::Timeout`] and the session stays usable. `None`
    /// waits indefinitely.
    ///
    /// A [`ChannelError::Truncated`] means the kernel stream is out of step.
    /// The bad bytes stay buffered, so every later call fails the same way
    /// without reading; close the session and open a new one.
    pub async fn next_event(&mut self, deadline: Option<Instant>) -> Result<EventRecord, EventError> {
        loop {
            if let Some(record) = self.decoder.next_buffered()? {
                if record.is_overflow() {
                    warn!("inotify queue overflowed, events were dropped");
                }
                return Ok(record);
            }

            let read = self.channel.fill(&mut self.decoder);
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, read)
                    .await
                    .map_err(|_| EventError::Timeout)??,
                None => read.await?,
            };
        }
    }

    /// Current size of the read buffer.
    pub fn buffer_capacity(&self) -> usize {
        self.decoder.capacity()
    }

    /// Close the channel. Every watch descriptor issued by this session is
    /// released by the kernel.
    pub fn close(self) {
        debug!(fd = self.channel.as_raw_fd(), "closing inotify session");
        drop(self);
    }
}

impl AsRawFd for Session {
    fn as_raw_fd(&self) -> RawFd {
        self.channel.as_raw_fd()
    }
}
