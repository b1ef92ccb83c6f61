// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, Utc};
use tracing::{debug, warn};

use crate::config::{FeedConfig, Policy, TitleSource};
use crate::error::ExtractError;

use super::cover::find_cover;
use super::tags::TagReader;

/// Raw metadata for one audio file, before any ordering is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFile {
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the served root, used for URLs and GUIDs
    pub relative_path: PathBuf,
    /// Embedded title, only read when the policy asks for tag titles
    pub tag_title: Option<String>,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Duration in seconds, 0 when unknown
    pub duration_secs: u64,
    pub mime_type: String,
    /// Cover image relative to the served root
    pub cover: Option<PathBuf>,
}

impl AudioFile {
    /// Title derived from the file name, without extension
    pub fn file_title(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Extract episode metadata for `path`.
///
/// Files whose extension is not in the allow-list are rejected with
/// [`ExtractError::Unsupported`]. Paths that cannot be expressed in a URL
/// (non UTF-8) and modification times outside the representable range are
/// rejected too, as are dates outside the years 1 to 9999, which an RSS
/// date cannot express. Tag problems are never surfaced: a missing or corrupt title
/// falls back to the file name and an unknown duration is 0.
pub fn extract(
    path: &Path,
    root: &Path,
    policy: &Policy,
    feed: &FeedConfig,
    tags: &dyn TagReader,
) -> Result<AudioFile, ExtractError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| feed.is_allowed_extension(ext))
        .ok_or_else(|| ExtractError::Unsupported {
            path: path.to_path_buf(),
        })?;

    let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    if relative_path.to_str().is_none() {
        return Err(ExtractError::NonUtf8Path {
            path: path.to_path_buf(),
        });
    }

    let metadata = std::fs::metadata(path).map_err(|source| ExtractError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    if !metadata.is_file() {
        return Err(ExtractError::Unsupported {
            path: path.to_path_buf(),
        });
    }

    let modified = metadata
        .modified()
        .map_err(|source| ExtractError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
    let modified = to_utc(modified)
        .filter(|date| (1..=9999).contains(&date.year()))
        .ok_or_else(|| ExtractError::InvalidTimestamp {
            path: path.to_path_buf(),
        })?;

    let embedded = tags
        .open(path)
        .map_err(|e| warn!(error = %e, "Could not read tags"))
        .ok();

    let tag_title = match (policy.title_source, &embedded) {
        (TitleSource::Id3, Some(embedded)) => embedded.title().unwrap_or_else(|e| {
            debug!(error = %e, "No readable title tag, using file name");
            None
        }),
        _ => None,
    };

    let duration_secs = embedded
        .as_deref()
        .and_then(|embedded| {
            embedded.duration().unwrap_or_else(|e| {
                warn!(error = %e, "Could not read duration");
                None
            })
        })
        .unwrap_or(0);

    let cover = find_cover(path)
        .and_then(|cover| cover.strip_prefix(root).ok().map(Path::to_path_buf));

    Ok(AudioFile {
        path: path.to_path_buf(),
        relative_path,
        tag_title,
        size: metadata.len(),
        modified,
        duration_secs,
        mime_type: mime_type_for(&extension)
            .unwrap_or("application/octet-stream")
            .to_string(),
        cover,
    })
}

/// Convert a file time to UTC, `None` when chrono cannot represent it
fn to_utc(time: SystemTime) -> Option<DateTime<Utc>> {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => {
            let secs = i64::try_from(after.as_secs()).ok()?;
            DateTime::from_timestamp(secs, after.subsec_nanos())
        }
        Err(before) => {
            let before = before.duration();
            let secs = i64::try_from(before.as_secs()).ok()?.checked_neg()?;
            match before.subsec_nanos() {
                0 => DateTime::from_timestamp(secs, 0),
                nanos => DateTime::from_timestamp(secs.checked_sub(1)?, 1_000_000_000 - nanos),
            }
        }
    }
}

/// Map an audio file extension to its MIME type
pub fn mime_type_for(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "mp3" => Some("audio/mpeg"),
        "m4a" | "mp4" => Some("audio/mp4"),
        "m4b" => Some("audio/x-m4b"),
        "aac" => Some("audio/aac"),
        "ogg" | "oga" => Some("audio/ogg"),
        "opus" => Some("audio/opus"),
        "wav" => Some("audio/wav"),
        "flac" => Some("audio/flac"),
        "aif" | "aiff" => Some("audio/aiff"),
        _ => None,
    }
}
