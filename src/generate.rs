// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use tracing::debug;

use crate::config::Config;
use crate::error::GenerateError;
use crate::feed::{
    FeedDocument, FeedGroup, Format, assemble, assemble_all, assemble_folder, render, render_index,
};
use crate::links::LinkResolver;
use crate::metadata::TagReader;

/// Printed by `generate` when folder feeds are enabled but no folder qualifies
pub const NO_FOLDERS_MESSAGE: &str = "No subfolders with audio files found.";

/// Render the combined feed of every audio file under the configured root.
///
/// Every call rescans the directory, so the result always reflects the
/// current state of the filesystem.
pub fn generate_feed(
    config: &Config,
    links: &LinkResolver,
    tags: &dyn TagReader,
    format: Format,
) -> Result<FeedDocument, GenerateError> {
    let group = assemble_all(&config.root, &config.policy, &config.feed, tags)?;
    debug!(episodes = group.episodes.len(), "Assembled feed");
    Ok(render(&group, links, format, None)?)
}

/// Render the feed of one immediate subfolder, `None` if it has no audio
pub fn generate_folder(
    config: &Config,
    links: &LinkResolver,
    tags: &dyn TagReader,
    folder: &str,
    format: Format,
) -> Result<Option<FeedDocument>, GenerateError> {
    let Some(group) = assemble_folder(&config.root, folder, &config.policy, &config.feed, tags)?
    else {
        return Ok(None);
    };

    debug!(folder, episodes = group.episodes.len(), "Assembled folder feed");
    let index = links.web_url(None);
    Ok(Some(render(&group, links, format, Some(&index))?))
}

/// Render the HTML index of every folder feed
pub fn generate_index(
    config: &Config,
    links: &LinkResolver,
    tags: &dyn TagReader,
) -> Result<FeedDocument, GenerateError> {
    let groups = folder_groups(config, tags)?;
    Ok(index_document(&groups, links, config))
}

/// Build the text printed by the `generate` and `generate_html` commands.
///
/// Without folder feeds this is the single document. With folder feeds,
/// XML output is every folder feed preceded by a comment header naming the
/// folder and its URL path, and HTML output is the folder index.
pub fn generate_output(
    config: &Config,
    links: &LinkResolver,
    tags: &dyn TagReader,
    format: Format,
) -> Result<String, GenerateError> {
    if !config.feed.folder_feeds {
        return Ok(generate_feed(config, links, tags, format)?.body);
    }

    let groups = folder_groups(config, tags)?;

    if format == Format::Html {
        return Ok(index_document(&groups, links, config).body);
    }

    if groups.is_empty() {
        return Ok(NO_FOLDERS_MESSAGE.to_string());
    }

    let mut sections = Vec::with_capacity(groups.len());
    for group in &groups {
        let folder = group.folder.as_deref().unwrap_or_default();
        let document = render(group, links, Format::Xml, None)?;
        sections.push(format!(
            "# Feed for folder: {folder}\n# URL: {}\n{}",
            feed_path(links, folder),
            document.body
        ));
    }

    Ok(sections.join("\n\n"))
}

fn folder_groups(config: &Config, tags: &dyn TagReader) -> Result<Vec<FeedGroup>, GenerateError> {
    let groups = assemble(&config.root, &config.policy, &config.feed, tags)?;
    debug!(folders = groups.len(), "Assembled folder feeds");
    Ok(groups)
}

fn index_document(groups: &[FeedGroup], links: &LinkResolver, config: &Config) -> FeedDocument {
    FeedDocument {
        format: Format::Html,
        body: render_index(groups, links, config.feed.title.as_deref()),
    }
}

/// Percent-encoded path of a folder feed, without scheme and host
fn feed_path(links: &LinkResolver, folder: &str) -> String {
    links.feed_url(Some(folder)).path().to_string()
}
