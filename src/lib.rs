//! Typed, pull-based event stream over the Linux inotify queue.
//!
//! A [`Session`] owns one inotify instance. Watches are registered on it with
//! [`Session::add_watch`], and every change the kernel reports for any of them
//! comes out of the same [`Session::next_event`] call, one [`EventRecord`] at
//! a time and in kernel order.
//!
//! Nothing is hidden or cached: watch descriptors are the kernel's, masks are
//! the kernel's bits, and there is no recursion, debouncing or coalescing on
//! top of what inotify itself does.
//!
//! # Platform Support
//!
//! **Linux only.** Sessions are registered with the tokio reactor, so they
//! must be opened from within a tokio runtime.
//!
//! # Quick Start
//!
//! ```no_run
//! use inotify_events::{EventMask, InterestMask, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = Session::open()?;
//!     session.add_watch("/tmp", InterestMask::CREATE | InterestMask::DELETE)?;
//!
//!     loop {
//!         let event = session.next_event(None).await?;
//!         if event.mask.contains(EventMask::CREATE) {
//!             println!("created {:?}", event.name);
//!         }
//!     }
//! }
//! ```
//!
//! # Deadlines
//!
//! [`Session::next_event`] takes an optional deadline. When it passes with no
//! record available the call fails with [`EventError::Timeout`]; bytes already
//! read stay buffered for the next call.
//!
//! ```no_run
//! use inotify_events::Session;
//! use std::time::Duration;
//! use tokio::time::Instant;
//!
//! # async fn example(session: &mut Session) {
//! match session.next_event(Some(Instant::now() + Duration::from_secs(1))).await {
//!     Ok(event) => println!("{:?}", event),
//!     Err(e) if e.is_timeout() => println!("quiet second"),
//!     Err(e) => eprintln!("{}", e),
//! }
//! # }
//! ```
//!
//! # Removing Watches
//!
//! [`Session::remove_watch`] returns as soon as the kernel accepts the
//! request. The watch's last record, with [`EventMask::IGNORED`] set, is
//! delivered later through `next_event`; only then should the descriptor be
//! considered retired.

mod channel;
mod decoder;
mod error;
mod event;
mod mask;
mod session;

pub use decoder::{EventDecoder, DEFAULT_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY, MIN_BUFFER_CAPACITY};
pub use error::{ChannelError, EventError, WatchError};
pub use event::{EventRecord, WatchDescriptor, HEADER_SIZE};
pub use mask::{EventMask, InterestMask};
pub use session::{Session, SessionBuilder};
