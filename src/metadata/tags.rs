// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;

use lofty::{Accessor, AudioFile, TaggedFile, TaggedFileExt};

use crate::error::TagError;

/// Source of embedded audio metadata, abstracted for testability.
///
/// A file is parsed once by [`TagReader::open`]; each field then has its own
/// fallible accessor on the returned [`Tags`]. Callers pair every call with a
/// default, so a broken tag never takes the whole file down with it.
pub trait TagReader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn Tags>, TagError>;
}

/// Embedded metadata of one parsed audio file
pub trait Tags {
    /// Embedded title, `Ok(None)` when the file has no usable title tag
    fn title(&self) -> Result<Option<String>, TagError>;

    /// Playback duration in whole seconds, `Ok(None)` when unknown
    fn duration(&self) -> Result<Option<u64>, TagError>;
}

/// Default tag reader implementation using lofty
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    pub fn new() -> Self {
        Self
    }
}

impl TagReader for LoftyTagReader {
    fn open(&self, path: &Path) -> Result<Box<dyn Tags>, TagError> {
        let tagged_file = lofty::read_from_path(path).map_err(|source| TagError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Box::new(LoftyTags(tagged_file)))
    }
}

struct LoftyTags(TaggedFile);

impl Tags for LoftyTags {
    fn title(&self) -> Result<Option<String>, TagError> {
        let title = self
            .0
            .primary_tag()
            .or_else(|| self.0.first_tag())
            .and_then(|tag| tag.title().map(|title| title.trim().to_string()))
            .filter(|title| !title.is_empty());

        Ok(title)
    }

    fn duration(&self) -> Result<Option<u64>, TagError> {
        let seconds = self.0.properties().duration().as_secs();
        Ok(Some(seconds).filter(|s| *s > 0))
    }
}
