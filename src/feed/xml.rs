// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use rss::extension::itunes::{
    self, ITunesChannelExtensionBuilder, ITunesItemExtension, ITunesItemExtensionBuilder,
};
use rss::{
    Channel, ChannelBuilder, EnclosureBuilder, GuidBuilder, Image, ImageBuilder, Item,
    ItemBuilder,
};

use crate::error::RenderError;
use crate::links::LinkResolver;
use crate::order::EpisodeMetadata;

use super::assemble::FeedGroup;

const GENERATOR: &str = concat!("podfeed ", env!("CARGO_PKG_VERSION"));

/// Build the RSS channel for a feed group.
///
/// Items keep the group's order. Nothing in the channel depends on the
/// wall clock, so an unchanged directory always yields the same document.
pub fn build_channel(group: &FeedGroup, links: &LinkResolver) -> Channel {
    let link = group.link(links);
    let cover_url = group
        .cover()
        .map(|cover| links.file_url(cover).to_string());

    let mut namespaces = BTreeMap::new();
    namespaces.insert("itunes".to_string(), itunes::NAMESPACE.to_string());

    let itunes_ext = cover_url.clone().map(|url| {
        ITunesChannelExtensionBuilder::default()
            .image(Some(url))
            .build()
    });

    ChannelBuilder::default()
        .namespaces(namespaces)
        .title(group.title.clone())
        .link(link.clone())
        .description(group.description.clone())
        .generator(Some(GENERATOR.to_string()))
        .image(cover_url.map(|url| channel_image(url, &group.title, &link)))
        .itunes_ext(itunes_ext)
        .items(
            group
                .episodes
                .iter()
                .map(|episode| build_item(episode, links))
                .collect::<Vec<_>>(),
        )
        .build()
}

/// Render a feed group as a pretty-printed RSS 2.0 document
pub fn render_xml(group: &FeedGroup, links: &LinkResolver) -> Result<String, RenderError> {
    let channel = build_channel(group, links);
    let bytes = channel.pretty_write_to(Vec::new(), b' ', 2)?;
    Ok(String::from_utf8(bytes)?)
}

fn channel_image(url: String, title: &str, link: &str) -> Image {
    ImageBuilder::default()
        .url(url)
        .title(title.to_string())
        .link(link.to_string())
        .build()
}

fn build_item(episode: &EpisodeMetadata, links: &LinkResolver) -> Item {
    let url = links.file_url(&episode.relative_path).to_string();

    let enclosure = EnclosureBuilder::default()
        .url(url.clone())
        .length(episode.size.to_string())
        .mime_type(episode.mime_type.clone())
        .build();

    let guid = GuidBuilder::default()
        .value(episode.guid())
        .permalink(false)
        .build();

    ItemBuilder::default()
        .title(Some(episode.title.clone()))
        .link(Some(url))
        .guid(Some(guid))
        .pub_date(Some(episode.published.to_rfc2822()))
        .enclosure(Some(enclosure))
        .itunes_ext(item_extension(episode, links))
        .build()
}

fn item_extension(
    episode: &EpisodeMetadata,
    links: &LinkResolver,
) -> Option<ITunesItemExtension> {
    let duration = format_duration(episode.duration_secs);
    let image = episode
        .cover
        .as_deref()
        .map(|cover| links.file_url(cover).to_string());

    if duration.is_none() && image.is_none() {
        return None;
    }

    Some(
        ITunesItemExtensionBuilder::default()
            .duration(duration)
            .image(image)
            .build(),
    )
}

/// Format seconds as `HH:MM:SS`, or `MM:SS` below one hour.
///
/// Returns `None` for an unknown (zero) duration.
pub fn format_duration(secs: u64) -> Option<String> {
    if secs == 0 {
        return None;
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    Some(if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rss::validation::Validate;
    use std::path::PathBuf;

    fn episode(relative: &str, title: &str, published: DateTime<Utc>) -> EpisodeMetadata {
        EpisodeMetadata {
            path: PathBuf::from("/srv/audio").join(relative),
            relative_path: PathBuf::from(relative),
            title: title.to_string(),
            published,
            duration_secs: 0,
            size: 1024,
            mime_type: "audio/mpeg".to_string(),
            cover: None,
        }
    }

    fn group(episodes: Vec<EpisodeMetadata>) -> FeedGroup {
        FeedGroup {
            title: "Audiobooks".to_string(),
            link: None,
            description: "Feed generated by podfeed".to_string(),
            folder: None,
            episodes,
        }
    }

    fn links() -> LinkResolver {
        LinkResolver::new(None, "localhost", 5000).unwrap()
    }

    fn parse(xml: &str) -> Channel {
        let channel = Channel::read_from(xml.as_bytes()).unwrap();
        channel.validate().unwrap();
        channel
    }

    #[test]
    fn renders_valid_rss() {
        let published = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let group = group(vec![
            episode("Roadside Picnic/02.mp3", "Chapter 2", published),
            episode(
                "Roadside Picnic/01.mp3",
                "Chapter 1",
                published - chrono::TimeDelta::seconds(60),
            ),
        ]);

        let xml = render_xml(&group, &links()).unwrap();
        let channel = parse(&xml);

        assert_eq!(channel.title(), "Audiobooks");
        assert_eq!(channel.link(), "http://localhost:5000/");
        assert_eq!(channel.generator(), Some(GENERATOR));
        assert_eq!(channel.items().len(), 2);

        let first = &channel.items()[0];
        assert_eq!(first.title(), Some("Chapter 2"));
        assert_eq!(first.pub_date(), Some("Fri, 15 Mar 2024 12:00:00 +0000"));

        let enclosure = first.enclosure().unwrap();
        assert_eq!(
            enclosure.url(),
            "http://localhost:5000/static/Roadside%20Picnic/02.mp3"
        );
        assert_eq!(enclosure.length(), "1024");
        assert_eq!(enclosure.mime_type(), "audio/mpeg");
    }

    #[test]
    fn guid_is_stable_and_not_a_permalink() {
        let published = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let group = group(vec![episode("a/b.mp3", "B", published)]);

        let local = parse(&render_xml(&group, &links()).unwrap());
        let proxied = parse(
            &render_xml(
                &group,
                &LinkResolver::from_base("https://pods.example.com").unwrap(),
            )
            .unwrap(),
        );

        let guid = local.items()[0].guid().unwrap();
        assert!(!guid.is_permalink());
        assert_eq!(guid.value().len(), 64);
        assert_eq!(guid.value(), proxied.items()[0].guid().unwrap().value());
    }

    #[test]
    fn empty_group_is_a_valid_feed() {
        let xml = render_xml(&group(Vec::new()), &links()).unwrap();
        let channel = parse(&xml);
        assert!(channel.items().is_empty());
    }

    #[test]
    fn escapes_markup_in_titles() {
        let published = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let mut group = group(vec![episode("a.mp3", "Tom & Jerry <live>", published)]);
        group.title = "Q&A".to_string();

        let xml = render_xml(&group, &links()).unwrap();
        assert!(xml.contains("Tom &amp; Jerry &lt;live&gt;"));

        let channel = parse(&xml);
        assert_eq!(channel.title(), "Q&A");
        assert_eq!(channel.items()[0].title(), Some("Tom & Jerry <live>"));
    }

    #[test]
    fn duration_and_cover_use_itunes_extension() {
        let published = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let mut with_extras = episode("Solaris/01.mp3", "One", published);
        with_extras.duration_secs = 3725;
        with_extras.cover = Some(PathBuf::from("Solaris/cover.jpg"));

        let xml = render_xml(&group(vec![with_extras]), &links()).unwrap();
        assert!(xml.contains("xmlns:itunes"));

        let channel = parse(&xml);
        let cover = "http://localhost:5000/static/Solaris/cover.jpg";
        assert_eq!(channel.image().map(|image| image.url()), Some(cover));
        assert_eq!(channel.itunes_ext().and_then(|ext| ext.image()), Some(cover));

        let ext = channel.items()[0].itunes_ext().unwrap();
        assert_eq!(ext.duration(), Some("01:02:05"));
        assert_eq!(ext.image(), Some(cover));
    }

    #[test]
    fn unknown_duration_is_omitted() {
        let published = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let xml = render_xml(&group(vec![episode("a.mp3", "A", published)]), &links()).unwrap();

        assert!(!xml.contains("itunes:duration"));
        assert!(parse(&xml).items()[0].itunes_ext().is_none());
    }

    #[test]
    fn explicit_link_is_used_for_channel() {
        let mut group = group(Vec::new());
        group.link = Some("https://example.com/about".to_string());

        let channel = parse(&render_xml(&group, &links()).unwrap());
        assert_eq!(channel.link(), "https://example.com/about");
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(0), None);
        assert_eq!(format_duration(59), Some("00:59".to_string()));
        assert_eq!(format_duration(125), Some("02:05".to_string()));
        assert_eq!(format_duration(3600), Some("01:00:00".to_string()));
        assert_eq!(format_duration(36_061), Some("10:01:01".to_string()));
    }
}
