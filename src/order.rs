// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, SubsecRound, TimeDelta, Utc};
use sha2::{Digest, Sha256};

use crate::config::{OrderBy, Policy, TitleSource};
use crate::links::path_segments;
use crate::metadata::AudioFile;

/// Gap between consecutive synthetic publish dates
pub const SYNTHETIC_STEP_SECS: i64 = 60;

/// A fully resolved episode, ready for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeMetadata {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub title: String,
    /// Publish date; real mtime or synthetic, strictly decreasing within a feed
    pub published: DateTime<Utc>,
    /// Duration in seconds, 0 when unknown
    pub duration_secs: u64,
    pub size: u64,
    pub mime_type: String,
    pub cover: Option<PathBuf>,
}

impl EpisodeMetadata {
    /// Stable identifier derived from the relative path only
    pub fn guid(&self) -> String {
        let key = path_segments(&self.relative_path).join("/");
        format!("{:x}", Sha256::digest(key.as_bytes()))
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Name of the directory holding the file
    pub fn directory_name(&self) -> String {
        self.path
            .parent()
            .and_then(|dir| dir.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Order files and assign final titles and publish dates.
///
/// The result is newest first. With [`OrderBy::Mtime`] episodes are sorted
/// by modification time; with [`OrderBy::Filename`] they follow natural
/// filename order and get synthetic dates stepping back one minute per
/// position from the newest mtime in the group, so a reader sorting by date
/// shows the first file on top. Equal keys fall back to the relative path,
/// and dates are truncated to whole seconds and kept strictly decreasing.
pub fn resolve(mut files: Vec<AudioFile>, policy: &Policy) -> Vec<EpisodeMetadata> {
    match policy.order_by {
        OrderBy::Mtime => {
            files.sort_by(|a, b| {
                b.modified
                    .cmp(&a.modified)
                    .then_with(|| a.relative_path.cmp(&b.relative_path))
            });

            let mut previous: Option<DateTime<Utc>> = None;
            files
                .into_iter()
                .map(|file| {
                    let mut published = clamp_date(file.modified.trunc_subsecs(0));
                    if let Some(prev) = previous
                        && published >= prev
                    {
                        published = step_back(prev, 1);
                    }
                    previous = Some(published);
                    into_episode(file, policy.title_source, published)
                })
                .collect()
        }
        OrderBy::Filename => {
            files.sort_by(|a, b| compare_by_name(&a.relative_path, &b.relative_path));

            let anchor = files
                .iter()
                .map(|file| file.modified)
                .max()
                .map(|anchor| clamp_date(anchor.trunc_subsecs(0)))
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

            files
                .into_iter()
                .enumerate()
                .map(|(position, file)| {
                    let steps = i64::try_from(position).unwrap_or(i64::MAX);
                    let published = step_back(anchor, SYNTHETIC_STEP_SECS.saturating_mul(steps));
                    into_episode(file, policy.title_source, published)
                })
                .collect()
        }
    }
}

/// Keep a date within the years an RFC 2822 date can express
fn clamp_date(date: DateTime<Utc>) -> DateTime<Utc> {
    let bound = |year, month, day, hour, min, sec| {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|day| day.and_hms_opt(hour, min, sec))
            .map(|time| time.and_utc())
    };

    match (bound(1, 1, 1, 0, 0, 0), bound(9999, 12, 31, 23, 59, 59)) {
        (Some(earliest), Some(latest)) => date.clamp(earliest, latest),
        _ => date,
    }
}

/// `secs` seconds before `date`, clamped to the earliest expressible date
fn step_back(date: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    let earlier = TimeDelta::try_seconds(secs).and_then(|delta| date.checked_sub_signed(delta));
    clamp_date(earlier.unwrap_or(DateTime::<Utc>::MIN_UTC))
}

fn into_episode(
    file: AudioFile,
    title_source: TitleSource,
    published: DateTime<Utc>,
) -> EpisodeMetadata {
    let file_title = file.file_title();
    let title = match title_source {
        TitleSource::Id3 => file.tag_title.unwrap_or(file_title),
        TitleSource::Filename => file_title,
    };

    EpisodeMetadata {
        path: file.path,
        relative_path: file.relative_path,
        title,
        published,
        duration_secs: file.duration_secs,
        size: file.size,
        mime_type: file.mime_type,
        cover: file.cover,
    }
}

/// Natural order of relative paths, with plain path order as the tie-break
pub fn compare_by_name(a: &Path, b: &Path) -> Ordering {
    let left = path_segments(a).join("/");
    let right = path_segments(b).join("/");
    natural_cmp(&left, &right).then_with(|| a.cmp(b))
}

/// Case-insensitive comparison treating digit runs as numbers.
///
/// `Track 2` sorts before `Track 10`, `01 - A` and `1 - a` compare equal.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);

    for (x, y) in left.iter().zip(right.iter()) {
        let ordering = x.cmp(y);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    left.len().cmp(&right.len())
}

/// A run of digits or a run of lowercased text
#[derive(Debug, PartialEq, Eq)]
enum Chunk {
    Text(String),
    Number(String),
}

impl Ord for Chunk {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Chunk::Number(a), Chunk::Number(b)) => {
                let a = a.trim_start_matches('0');
                let b = b.trim_start_matches('0');
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }
            (Chunk::Text(a), Chunk::Text(b)) => a.cmp(b),
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Chunk {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Split into alternating text and number chunks, always starting with text
fn chunks(s: &str) -> Vec<Chunk> {
    let mut result = vec![Chunk::Text(String::new())];

    for c in s.chars() {
        let is_digit = c.is_ascii_digit();
        let in_number = matches!(result.last(), Some(Chunk::Number(_)));

        if is_digit != in_number {
            result.push(if is_digit {
                Chunk::Number(String::new())
            } else {
                Chunk::Text(String::new())
            });
        }

        if let Some(Chunk::Number(run) | Chunk::Text(run)) = result.last_mut() {
            if is_digit {
                run.push(c);
            } else {
                run.extend(c.to_lowercase());
            }
        }
    }

    result
}
