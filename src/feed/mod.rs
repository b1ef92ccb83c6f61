mod assemble;
mod html;
mod scan;
mod xml;

pub use assemble::{FeedGroup, assemble, assemble_all, assemble_folder};
pub use html::{DEFAULT_INDEX_TITLE, render_html, render_index};
pub use scan::{has_audio, list_files, list_subfolders, scan_audio};
pub use xml::{build_channel, format_duration, render_xml};

use url::Url;

use crate::error::RenderError;
use crate::links::LinkResolver;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Output format of a rendered feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Xml,
    Html,
}

/// A rendered feed, ready to be printed or sent over HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    pub format: Format,
    pub body: String,
}

impl FeedDocument {
    pub fn content_type(&self) -> &'static str {
        match self.format {
            Format::Xml => RSS_CONTENT_TYPE,
            Format::Html => HTML_CONTENT_TYPE,
        }
    }
}

/// Render a feed group in the requested format.
///
/// `index` is only used by HTML listings, to link back to the folder index.
pub fn render(
    group: &FeedGroup,
    links: &LinkResolver,
    format: Format,
    index: Option<&Url>,
) -> Result<FeedDocument, RenderError> {
    let body = match format {
        Format::Xml => render_xml(group, links)?,
        Format::Html => render_html(group, links, index),
    };

    Ok(FeedDocument { format, body })
}
