// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{FeedConfig, Policy};
use crate::error::{ExtractError, ScanError};
use crate::metadata::{AudioFile, TagReader, extract};

/// List the files in `dir`, descending into subdirectories when `recursive`.
///
/// Only a failure to read `dir` itself is an error. Entries that vanish or
/// cannot be read mid-scan are skipped, as are nested directories that cannot
/// be opened. Symlinked directories are not followed.
pub fn list_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, ScanError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ScanError::ReadDirectoryFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            debug!(path = %path.display(), "Skipping entry without file type");
            continue;
        };

        if file_type.is_dir() {
            if recursive {
                match list_files(&path, true) {
                    Ok(nested) => files.extend(nested),
                    Err(e) => warn!(error = %e, "Skipping unreadable directory"),
                }
            }
        } else {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Names of the immediate subdirectories of `root`, sorted
pub fn list_subfolders(root: &Path) -> Result<Vec<String>, ScanError> {
    let entries = std::fs::read_dir(root).map_err(|e| ScanError::ReadDirectoryFailed {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut folders: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| match entry.file_name().into_string() {
            Ok(name) => Some(name),
            Err(name) => {
                warn!(folder = ?name, "Skipping folder with non UTF-8 name");
                None
            }
        })
        .collect();

    folders.sort();
    Ok(folders)
}

/// Extract metadata for every qualifying audio file under `dir`.
///
/// Paths in the result are relative to `root`. Unsupported and unreadable
/// files are skipped, as are files whose names cannot appear in a URL.
pub fn scan_audio(
    dir: &Path,
    root: &Path,
    recursive: bool,
    policy: &Policy,
    feed: &FeedConfig,
    tags: &dyn TagReader,
) -> Result<Vec<AudioFile>, ScanError> {
    let files = list_files(dir, recursive)?;

    let audio = files
        .iter()
        .filter_map(|path| match extract(path, root, policy, feed, tags) {
            Ok(file) => Some(file),
            Err(ExtractError::Unsupported { .. }) => None,
            Err(e) => {
                warn!(error = %e, "Skipping file");
                None
            }
        })
        .collect();

    Ok(audio)
}

/// Whether `dir` directly contains at least one qualifying audio file
pub fn has_audio(dir: &Path, feed: &FeedConfig) -> bool {
    list_files(dir, false).is_ok_and(|files| {
        files.iter().any(|path| {
            path.is_file()
                && path.file_name().and_then(|name| name.to_str()).is_some()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| feed.is_allowed_extension(ext))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FakeTags;
    use tempfile::tempdir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"audio").unwrap();
    }

    #[test]
    fn lists_files_flat() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "b.mp3");
        touch(dir.path(), "a.mp3");
        touch(dir.path(), "sub/c.mp3");

        let files = list_files(dir.path(), false).unwrap();
        assert_eq!(files, vec![dir.path().join("a.mp3"), dir.path().join("b.mp3")]);
    }

    #[test]
    fn lists_files_recursively() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.mp3");
        touch(dir.path(), "sub/deeper/c.mp3");

        let files = list_files(dir.path(), true).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains(&dir.path().join("sub/deeper/c.mp3")));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        let result = list_files(&dir.path().join("missing"), true);
        assert!(matches!(result, Err(ScanError::ReadDirectoryFailed { .. })));
    }

    #[test]
    fn subfolders_are_sorted() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "Solaris/01.mp3");
        touch(dir.path(), "Roadside Picnic/01.mp3");
        touch(dir.path(), "loose.mp3");

        let folders = list_subfolders(dir.path()).unwrap();
        assert_eq!(folders, vec!["Roadside Picnic", "Solaris"]);
    }

    #[test]
    fn scan_skips_non_audio() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "ep1.mp3");
        touch(dir.path(), "cover.jpg");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "nested/ep2.opus");

        let audio = scan_audio(
            dir.path(),
            dir.path(),
            true,
            &Policy::default(),
            &FeedConfig::default(),
            &FakeTags::default(),
        )
        .unwrap();

        let mut relative: Vec<_> = audio.iter().map(|f| f.relative_path.clone()).collect();
        relative.sort();
        assert_eq!(
            relative,
            vec![PathBuf::from("ep1.mp3"), PathBuf::from("nested/ep2.opus")]
        );
    }

    fn scan_root(dir: &Path) -> Vec<PathBuf> {
        scan_audio(
            dir,
            dir,
            true,
            &Policy::default(),
            &FeedConfig::default(),
            &FakeTags::default(),
        )
        .unwrap()
        .into_iter()
        .map(|file| file.relative_path)
        .collect()
    }

    #[cfg(unix)]
    #[test]
    fn scan_skips_dangling_symlinks() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "good.mp3");
        std::os::unix::fs::symlink(dir.path().join("gone.mp3"), dir.path().join("x.mp3")).unwrap();

        assert_eq!(scan_root(dir.path()), vec![PathBuf::from("good.mp3")]);
    }

    #[cfg(unix)]
    #[test]
    fn scan_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        touch(dir.path(), "good.mp3");
        for name in [&b"caf\xe9.mp3"[..], &b"caf\xe8.mp3"[..]] {
            if std::fs::write(dir.path().join(OsStr::from_bytes(name)), b"audio").is_err() {
                // Filesystem insists on UTF-8 names
                return;
            }
        }

        assert_eq!(scan_root(dir.path()), vec![PathBuf::from("good.mp3")]);
    }

    #[cfg(unix)]
    #[test]
    fn folder_with_only_non_utf8_files_has_no_audio() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let folder = dir.path().join("Show");
        std::fs::create_dir(&folder).unwrap();
        if std::fs::write(folder.join(OsStr::from_bytes(b"caf\xe9.mp3")), b"audio").is_err() {
            return;
        }

        assert!(!has_audio(&folder, &FeedConfig::default()));
    }

    #[test]
    fn detects_audio_in_folder() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "with/ep.m4b");
        touch(dir.path(), "without/readme.txt");
        touch(dir.path(), "nested_only/inner/ep.mp3");

        let feed = FeedConfig::default();
        assert!(has_audio(&dir.path().join("with"), &feed));
        assert!(!has_audio(&dir.path().join("without"), &feed));
        assert!(!has_audio(&dir.path().join("nested_only"), &feed));
    }
}
