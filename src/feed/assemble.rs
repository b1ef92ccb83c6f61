// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Component, Path};

use tracing::{debug, warn};

use crate::config::{FeedConfig, Policy};
use crate::error::ScanError;
use crate::links::LinkResolver;
use crate::metadata::TagReader;
use crate::order::{EpisodeMetadata, resolve};

use super::scan::{has_audio, list_subfolders, scan_audio};

/// One logical feed: a channel and its ordered episodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedGroup {
    pub title: String,
    /// Explicit channel link; when unset the group's feed URL is used
    pub link: Option<String>,
    pub description: String,
    /// Subfolder name in folder-feeds mode, `None` for the combined feed
    pub folder: Option<String>,
    /// Newest first
    pub episodes: Vec<EpisodeMetadata>,
}

impl FeedGroup {
    /// Channel link, resolved against `links` unless set explicitly
    pub fn link(&self, links: &LinkResolver) -> String {
        self.link
            .clone()
            .unwrap_or_else(|| links.feed_url(self.folder.as_deref()).to_string())
    }

    /// Cover of the first episode that has one
    pub fn cover(&self) -> Option<&Path> {
        self.episodes.iter().find_map(|episode| episode.cover.as_deref())
    }
}

/// Build the feed groups for `root`.
///
/// Without folder feeds this is a single group covering every audio file
/// found recursively. With folder feeds there is one group per immediate
/// subfolder that directly contains audio; files in `root` itself and in
/// nested subfolders are left out. Folders that fail to scan are skipped.
pub fn assemble(
    root: &Path,
    policy: &Policy,
    feed: &FeedConfig,
    tags: &dyn TagReader,
) -> Result<Vec<FeedGroup>, ScanError> {
    if !feed.folder_feeds {
        return Ok(vec![assemble_all(root, policy, feed, tags)?]);
    }

    let mut groups = Vec::new();
    for folder in list_subfolders(root)? {
        match assemble_folder(root, &folder, policy, feed, tags) {
            Ok(Some(group)) => groups.push(group),
            Ok(None) => debug!(folder, "Skipping folder without audio"),
            Err(e) => warn!(folder, error = %e, "Skipping folder"),
        }
    }

    Ok(groups)
}

/// Build the combined feed of every audio file under `root`
pub fn assemble_all(
    root: &Path,
    policy: &Policy,
    feed: &FeedConfig,
    tags: &dyn TagReader,
) -> Result<FeedGroup, ScanError> {
    let files = scan_audio(root, root, true, policy, feed, tags)?;

    Ok(FeedGroup {
        title: feed.title.clone().unwrap_or_else(|| directory_title(root)),
        link: feed.link.clone(),
        description: feed.description.clone(),
        folder: None,
        episodes: resolve(files, policy),
    })
}

/// Build the feed of a single immediate subfolder.
///
/// Returns `None` when `folder` is not a plain folder name, does not exist
/// or holds no audio files directly.
pub fn assemble_folder(
    root: &Path,
    folder: &str,
    policy: &Policy,
    feed: &FeedConfig,
    tags: &dyn TagReader,
) -> Result<Option<FeedGroup>, ScanError> {
    if !is_plain_name(folder) {
        return Ok(None);
    }

    let dir = root.join(folder);
    if !dir.is_dir() || !has_audio(&dir, feed) {
        return Ok(None);
    }

    let files = scan_audio(&dir, root, false, policy, feed, tags)?;
    if files.is_empty() {
        return Ok(None);
    }

    Ok(Some(FeedGroup {
        title: feed.title.clone().unwrap_or_else(|| folder.to_string()),
        link: feed.link.clone(),
        description: feed.description.clone(),
        folder: Some(folder.to_string()),
        episodes: resolve(files, policy),
    }))
}

fn is_plain_name(folder: &str) -> bool {
    let mut components = Path::new(folder).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn directory_title(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .or_else(|| {
            root.canonicalize()
                .ok()
                .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| root.display().to_string())
}
