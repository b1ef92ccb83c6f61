// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

/// Image extensions recognized as cover art
pub const COVER_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Conventional cover file stems, in order of preference
const COVER_STEMS: [&str; 4] = ["cover", "folder", "front", "album"];

/// Find cover art for an audio file.
///
/// Looks in the file's directory for, in order: an image with the same stem
/// (`ep1.mp3` → `ep1.jpg`), a conventionally named image (`cover.jpg`,
/// `folder.png`, ...) and finally any image, picking the first by name.
pub fn find_cover(audio_path: &Path) -> Option<PathBuf> {
    let dir = audio_path.parent()?;
    let stem = audio_path.file_stem()?;

    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_image(path) && path.is_file())
        .collect();
    images.sort();

    if let Some(image) = images.iter().find(|image| image.file_stem() == Some(stem)) {
        return Some(image.clone());
    }

    for cover_stem in COVER_STEMS {
        if let Some(image) = images.iter().find(|image| {
            image
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.eq_ignore_ascii_case(cover_stem))
        }) {
            return Some(image.clone());
        }
    }

    images.into_iter().next()
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            COVER_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
