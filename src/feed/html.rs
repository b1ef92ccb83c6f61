// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use html_escape::{encode_double_quoted_attribute, encode_text};
use indicatif::HumanBytes;
use url::Url;

use crate::links::LinkResolver;
use crate::order::EpisodeMetadata;

use super::assemble::FeedGroup;
use super::xml::format_duration;

/// Title of the folder index page when none is configured
pub const DEFAULT_INDEX_TITLE: &str = "Podcast Feeds";

const STYLE: &str = "body { font-family: sans-serif; max-width: 48em; margin: 0 auto; padding: 1em; } \
                     article { border-top: 1px solid #ddd; padding: 1em 0; } \
                     .book-cover { max-width: 200px; max-height: 200px; }";

/// Render a feed group as a standalone HTML listing.
///
/// `index` links back to the folder index when the page is one of several
/// folder feeds.
pub fn render_html(group: &FeedGroup, links: &LinkResolver, index: Option<&Url>) -> String {
    let feed_url = links.feed_url(group.folder.as_deref()).to_string();

    let mut intro = Element::new("p")
        .text(format!("{}. RSS feed at ", group.description.trim_end_matches('.')))
        .child(Element::new("a").attr("href", &feed_url).text(&feed_url))
        .text(".");

    if let Some(index) = index {
        intro = intro
            .text(" ")
            .child(Element::new("a").attr("href", index.as_str()).text("All feeds"));
    }

    let body = Element::new("body")
        .child(Element::new("h1").text(&group.title))
        .child(intro)
        .children(group.episodes.iter().map(|episode| episode_article(episode, links)));

    page(&group.title, body)
}

/// Render the index of all folder feeds
pub fn render_index(groups: &[FeedGroup], links: &LinkResolver, title: Option<&str>) -> String {
    let title = title.unwrap_or(DEFAULT_INDEX_TITLE);

    let summary = match groups.len() {
        0 => "No subfolders with audio files found.".to_string(),
        1 => "1 feed.".to_string(),
        n => format!("{n} feeds."),
    };

    let body = Element::new("body")
        .child(Element::new("h1").text(title))
        .child(Element::new("p").text(summary))
        .children(groups.iter().map(|group| folder_article(group, links)));

    page(title, body)
}

fn episode_article(episode: &EpisodeMetadata, links: &LinkResolver) -> Element {
    let url = links.file_url(&episode.relative_path).to_string();

    let mut details = Element::new("ul")
        .child(Element::new("li").text(format!("Directory: {}", episode.directory_name())))
        .child(Element::new("li").text(format!("File: {}", episode.file_name())))
        .child(Element::new("li").text(format!(
            "Date: {}",
            episode.published.format("%Y-%m-%d %H:%M:%S UTC")
        )))
        .child(Element::new("li").text(format!("Size: {}", HumanBytes(episode.size))));

    if let Some(duration) = format_duration(episode.duration_secs) {
        details = details.child(Element::new("li").text(format!("Duration: {duration}")));
    }

    details = details.child(Element::new("li").text(format!("Mimetype: {}", episode.mime_type)));

    let mut article = Element::new("article").child(
        Element::new("h2").child(Element::new("a").attr("href", &url).text(&episode.title)),
    );

    if let Some(cover) = &episode.cover {
        article = article.child(cover_image(links.file_url(cover), &episode.title));
    }

    article.child(details).child(
        Element::new("audio")
            .flag("controls")
            .attr("preload", "none")
            .child(
                Element::void("source")
                    .attr("src", &url)
                    .attr("type", &episode.mime_type),
            ),
    )
}

fn folder_article(group: &FeedGroup, links: &LinkResolver) -> Element {
    let folder = group.folder.as_deref();
    let name = folder.unwrap_or(&group.title);
    let feed_url = links.feed_url(folder).to_string();

    let mut article = Element::new("article").child(
        Element::new("h2").child(
            Element::new("a")
                .attr("href", links.web_url(folder).as_str())
                .text(name),
        ),
    );

    if let Some(cover) = group.cover() {
        article = article.child(cover_image(links.file_url(cover), name));
    }

    article.child(
        Element::new("ul")
            .child(Element::new("li").text(format!("Episodes: {}", group.episodes.len())))
            .child(
                Element::new("li")
                    .text("RSS: ")
                    .child(Element::new("a").attr("href", &feed_url).text(&feed_url)),
            ),
    )
}

fn cover_image(url: Url, title: &str) -> Element {
    Element::void("img")
        .attr("class", "book-cover")
        .attr("src", url.as_str())
        .attr("alt", format!("Cover of {title}"))
}

fn page(title: &str, body: Element) -> String {
    let html = Element::new("html")
        .attr("lang", "en")
        .child(
            Element::new("head")
                .child(Element::void("meta").attr("charset", "utf-8"))
                .child(
                    Element::void("meta")
                        .attr("name", "viewport")
                        .attr("content", "width=device-width, initial-scale=1"),
                )
                .child(Element::new("title").text(title))
                .child(Element::new("style").raw(STYLE)),
        )
        .child(body);

    let mut out = String::from("<!DOCTYPE html>\n");
    html.write(&mut out, 0);
    out
}

enum Node {
    Element(Element),
    Text(String),
    Raw(&'static str),
}

/// Minimal HTML element tree; all text and attribute values are escaped on write
struct Element {
    tag: &'static str,
    attrs: Vec<(&'static str, Option<String>)>,
    children: Vec<Node>,
    void: bool,
}

impl Element {
    fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
            void: false,
        }
    }

    /// Element without children or closing tag
    fn void(tag: &'static str) -> Self {
        Self {
            void: true,
            ..Self::new(tag)
        }
    }

    fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, Some(value.into())));
        self
    }

    /// Boolean attribute
    fn flag(mut self, name: &'static str) -> Self {
        self.attrs.push((name, None));
        self
    }

    fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Trusted markup, written verbatim
    fn raw(mut self, markup: &'static str) -> Self {
        self.children.push(Node::Raw(markup));
        self
    }

    fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children.into_iter().map(Node::Element));
        self
    }

    fn write(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        self.write_open(out);

        if self.void {
            out.push('\n');
            return;
        }

        let inline = self
            .children
            .iter()
            .all(|child| !matches!(child, Node::Element(element) if !element.is_inline()));

        if inline {
            self.write_children_inline(out);
        } else {
            out.push('\n');
            for child in &self.children {
                match child {
                    Node::Element(element) => element.write(out, depth + 1),
                    Node::Text(text) => {
                        out.push_str(&indent);
                        out.push_str("  ");
                        out.push_str(&encode_text(text));
                        out.push('\n');
                    }
                    Node::Raw(markup) => {
                        out.push_str(&indent);
                        out.push_str("  ");
                        out.push_str(markup);
                        out.push('\n');
                    }
                }
            }
            out.push_str(&indent);
        }

        out.push_str("</");
        out.push_str(self.tag);
        out.push_str(">\n");
    }

    fn write_open(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            if let Some(value) = value {
                out.push_str("=\"");
                out.push_str(&encode_double_quoted_attribute(value));
                out.push('"');
            }
        }
        out.push('>');
    }

    fn write_children_inline(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Element(element) => {
                    element.write_open(out);
                    element.write_children_inline(out);
                    out.push_str("</");
                    out.push_str(element.tag);
                    out.push('>');
                }
                Node::Text(text) => out.push_str(&encode_text(text)),
                Node::Raw(markup) => out.push_str(markup),
            }
        }
    }

    /// Phrasing elements that stay on their parent's line
    fn is_inline(&self) -> bool {
        matches!(self.tag, "a" | "span" | "em" | "strong")
            && self
                .children
                .iter()
                .all(|child| !matches!(child, Node::Element(_)))
    }
}
