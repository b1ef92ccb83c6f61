mod cover;
mod extract;
mod tags;

pub use cover::{COVER_EXTENSIONS, find_cover};
pub use extract::{AudioFile, extract, mime_type_for};
pub use tags::{LoftyTagReader, TagReader, Tags};

#[cfg(test)]
pub(crate) use tags::fake::FakeTags;
