//! ID3v2 Tag Codec
//!
//! [`TagCodec`] implementation for MP3 files backed by the `lofty` crate.
//!
//! ## Field identifiers
//!
//! - Four-character frame ids (`TIT2`, `TKEY`, `TCON`) address text frames.
//!   Frames holding several NUL-separated values are returned as
//!   [`TagValue::List`].
//! - `TXXX:<description>` addresses a user-defined text frame. The
//!   description is matched case-insensitively on both read and write.
//! - `COMM` addresses the comment frame with an empty description, falling
//!   back to the first comment when none has an empty description.
//!
//! Writes merge into the existing tag: frames that are not named in the
//! update are preserved. All file access runs on the blocking thread pool.

use crate::error::{MetadataError, Result};
use async_trait::async_trait;
use bridge_traits::tags::{TagCodec, TagMap, TagValue};
use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::AudioFile;
use lofty::id3::v2::{
    CommentFrame, ExtendedTextFrame, Frame, FrameId, Id3v2Tag, TextInformationFrame,
};
use lofty::mpeg::MpegFile;
use lofty::tag::TagExt;
use lofty::TextEncoding;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const USER_TEXT_PREFIX: &str = "TXXX:";
const COMMENT_ID: &str = "COMM";
const DEFAULT_COMMENT_LANGUAGE: [u8; 3] = *b"eng";

/// `lofty`-backed codec for ID3v2 tags on MP3 files
#[derive(Debug, Clone, Copy)]
pub struct Id3TagCodec {
    parse_options: ParseOptions,
}

impl Id3TagCodec {
    pub fn new() -> Self {
        Self {
            parse_options: ParseOptions::new(),
        }
    }

    /// Read the ID3v2 tag of a file, `None` when the file has no tag
    fn load_tag(path: &Path, options: ParseOptions) -> Result<Option<Id3v2Tag>> {
        let mut file = File::open(path).map_err(|e| {
            MetadataError::ReadFailed(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let mpeg = MpegFile::read_from(&mut file, options).map_err(|e| {
            MetadataError::UnsupportedFormat(format!("{}: {}", path.display(), e))
        })?;

        Ok(mpeg.id3v2().cloned())
    }

    fn read_blocking(path: &Path, fields: &[String], options: ParseOptions) -> Result<TagMap> {
        match Self::load_tag(path, options)? {
            Some(tag) => Ok(read_from_tag(&tag, fields)),
            None => Ok(TagMap::new()),
        }
    }

    fn write_blocking(path: &Path, values: &TagMap, options: ParseOptions) -> Result<()> {
        let mut tag = Self::load_tag(path, options)?.unwrap_or_default();
        merge_into_tag(&mut tag, values)?;

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| {
                MetadataError::WriteFailed(format!("Failed to save {}: {}", path.display(), e))
            })
    }
}

impl Default for Id3TagCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TagCodec for Id3TagCodec {
    #[instrument(skip(self, fields), fields(path = %path.display(), count = fields.len()))]
    async fn read_fields(
        &self,
        path: &Path,
        fields: &[String],
    ) -> bridge_traits::error::Result<TagMap> {
        let owned_path: PathBuf = path.to_path_buf();
        let owned_fields = fields.to_vec();
        let options = self.parse_options;

        let tags = tokio::task::spawn_blocking(move || {
            Self::read_blocking(&owned_path, &owned_fields, options)
        })
        .await
        .map_err(|e| MetadataError::ReadFailed(format!("Tag read task failed: {}", e)))??;

        debug!(found = tags.len(), "Read tag fields");
        Ok(tags)
    }

    #[instrument(skip(self, values), fields(path = %path.display(), count = values.len()))]
    async fn write_fields(
        &self,
        path: &Path,
        values: &TagMap,
    ) -> bridge_traits::error::Result<()> {
        if values.is_empty() {
            return Ok(());
        }

        let owned_path = path.to_path_buf();
        let owned_values = values.clone();
        let options = self.parse_options;

        tokio::task::spawn_blocking(move || {
            Self::write_blocking(&owned_path, &owned_values, options)
        })
        .await
        .map_err(|e| MetadataError::WriteFailed(format!("Tag write task failed: {}", e)))??;

        debug!("Wrote tag fields");
        Ok(())
    }
}

// =============================================================================
// Frame mapping
// =============================================================================

/// Description part of a `TXXX:<description>` identifier
fn user_text_description(id: &str) -> Option<&str> {
    let prefix = id.get(..USER_TEXT_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(USER_TEXT_PREFIX) {
        id.get(USER_TEXT_PREFIX.len()..)
    } else {
        None
    }
}

/// Extract the requested fields from an in-memory tag
///
/// Keys of the result are spelled exactly as requested; absent fields are
/// left out.
pub fn read_from_tag(tag: &Id3v2Tag, fields: &[String]) -> TagMap {
    let mut values = TagMap::new();

    for field in fields {
        let value = if let Some(description) = user_text_description(field) {
            read_user_text(tag, description)
        } else if field.eq_ignore_ascii_case(COMMENT_ID) {
            read_comment(tag)
        } else {
            read_text_frame(tag, field)
        };

        if let Some(value) = value {
            values.insert(field.clone(), value);
        }
    }

    values
}

fn read_user_text(tag: &Id3v2Tag, description: &str) -> Option<TagValue> {
    tag.into_iter().find_map(|frame| match frame {
        Frame::UserText(f) if f.description.eq_ignore_ascii_case(description) => {
            Some(TagValue::Text(f.content.to_string()))
        }
        _ => None,
    })
}

fn read_comment(tag: &Id3v2Tag) -> Option<TagValue> {
    let comments: Vec<_> = tag
        .into_iter()
        .filter_map(|frame| match frame {
            Frame::Comment(f) => Some(f),
            _ => None,
        })
        .collect();

    comments
        .iter()
        .find(|f| f.description.is_empty())
        .or_else(|| comments.first())
        .map(|f| TagValue::Text(f.content.to_string()))
}

fn read_text_frame(tag: &Id3v2Tag, id: &str) -> Option<TagValue> {
    tag.into_iter().find_map(|frame| match frame {
        Frame::Text(f) if frame.id_str() == id => {
            let value = f.value.to_string();
            if value.contains('\0') {
                Some(TagValue::List(
                    value
                        .split('\0')
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect(),
                ))
            } else {
                Some(TagValue::Text(value))
            }
        }
        _ => None,
    })
}

/// Merge field values into an in-memory tag, replacing frames of the same id
///
/// # Errors
///
/// Returns `InvalidField` for identifiers that are not valid ID3v2 frame ids.
pub fn merge_into_tag(tag: &mut Id3v2Tag, values: &TagMap) -> Result<()> {
    for (field, value) in values {
        if let Some(description) = user_text_description(field) {
            tag.retain(|frame| {
                !matches!(frame, Frame::UserText(f) if f.description.eq_ignore_ascii_case(description))
            });
            tag.insert(Frame::UserText(ExtendedTextFrame::new(
                TextEncoding::UTF8,
                description.to_string(),
                value.as_text(),
            )));
        } else if field.eq_ignore_ascii_case(COMMENT_ID) {
            write_comment(tag, value);
        } else {
            let id = FrameId::new(field.clone())
                .map_err(|e| MetadataError::InvalidField(format!("{}: {}", field, e)))?;
            tag.insert(Frame::Text(TextInformationFrame::new(
                id,
                TextEncoding::UTF8,
                value.as_text(),
            )));
        }
    }

    Ok(())
}

fn write_comment(tag: &mut Id3v2Tag, value: &TagValue) {
    let existing_language = (&*tag).into_iter().find_map(|frame| match frame {
        Frame::Comment(f) if f.description.is_empty() => Some(f.language),
        _ => None,
    });

    let language = match value {
        TagValue::Comment { language, .. } => language_code(language),
        _ => None,
    }
    .or(existing_language)
    .unwrap_or(DEFAULT_COMMENT_LANGUAGE);

    tag.retain(|frame| !matches!(frame, Frame::Comment(f) if f.description.is_empty()));
    tag.insert(Frame::Comment(CommentFrame::new(
        TextEncoding::UTF8,
        language,
        String::new(),
        value.as_text(),
    )));
}

fn language_code(language: &str) -> Option<[u8; 3]> {
    let bytes = language.as_bytes();
    if bytes.len() == 3 && bytes.iter().all(u8::is_ascii_alphabetic) {
        Some([bytes[0], bytes[1], bytes[2]])
    } else {
        None
    }
}
