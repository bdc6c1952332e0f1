//! # Tag Metadata Module
//!
//! Reads, rewrites and derives ID3v2 tag fields for the synchronization engine.
//!
//! ## Overview
//!
//! This module handles:
//! - ID3v2 frame access through `lofty` ([`codec::Id3TagCodec`])
//! - Genre cleanup and comment derivation applied before values leave
//!   Source A ([`transformer::TagTransformer`])
//!
//! The codec implements [`bridge_traits::tags::TagCodec`], so the sync engine
//! never touches `lofty` types directly.

pub mod codec;
pub mod error;
pub mod transformer;

pub use codec::Id3TagCodec;
pub use error::{MetadataError, Result};
pub use transformer::TagTransformer;
