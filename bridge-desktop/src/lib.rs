//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemAccess` using `tokio::fs`, with a recursive lister that keeps
//!   walking when a single subdirectory cannot be read
//!
//! The tag codec lives in `core-metadata` because it depends on `lofty`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::TokioFileSystem;
//! use bridge_traits::FileSystemAccess;
//!
//! #[tokio::main]
//! async fn main() {
//!     let fs = TokioFileSystem::new();
//!     let tracks = fs.list_files(Path::new("/music/a"), "mp3").await?;
//! }
//! ```

mod filesystem;

pub use filesystem::TokioFileSystem;
