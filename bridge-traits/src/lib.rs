//! # Host Bridge Traits
//!
//! Capability traits the synchronization core consumes but does not implement
//! itself.
//!
//! ## Overview
//!
//! The core never touches the filesystem, the audio tag format or the system
//! clock directly. Each of those concerns is expressed as a trait here and
//! injected at construction time, which keeps the decision engine testable with
//! in-memory fakes.
//!
//! ## Traits
//!
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Recursive file listing and modification times
//! - [`TagCodec`](tags::TagCodec) - Read/merge named tag fields on a single file
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Implementations
//! should convert platform-specific errors into it and include the offending
//! path in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single implementation can be
//! shared behind an `Arc` across async tasks.

pub mod error;
pub mod storage;
pub mod tags;
pub mod time;

pub use error::BridgeError;

pub use storage::{FileMetadata, FileSystemAccess};
pub use tags::{TagCodec, TagMap, TagValue};
pub use time::{Clock, LogLevel, ManualClock, SystemClock};
