// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Component, Path};

use url::Url;

use crate::error::ConfigError;

/// Path prefix under which the audio directory is served
pub const STATIC_PATH: &str = "static";
/// Path prefix of the HTML listings
pub const WEB_PATH: &str = "web";
/// Path prefix of per-folder feeds
pub const FEED_PATH: &str = "feed";

/// Builds absolute links to feeds, listings and served files.
///
/// Every link is derived from one base URL: either the public URL of a
/// reverse proxy or `http://host:port`. Path segments are percent-encoded
/// individually, so `/` inside a file name never splits a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkResolver {
    base: Url,
}

impl LinkResolver {
    /// Resolver for the public URL if given, otherwise for `http://host:port`
    pub fn new(public_url: Option<&str>, host: &str, port: u16) -> Result<Self, ConfigError> {
        match public_url {
            Some(url) => Self::from_base(url),
            None => Self::from_base(&format!("http://{}:{}", bracket_ipv6(host), port)),
        }
    }

    /// Resolver rooted at an arbitrary base URL
    pub fn from_base(base: &str) -> Result<Self, ConfigError> {
        let mut url = Url::parse(base.trim()).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base.to_string(),
            source,
        })?;

        if url.cannot_be_a_base() {
            return Err(ConfigError::CannotBeABase(base.to_string()));
        }

        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { base: url })
    }

    /// Resolver for the `Host` header of an incoming request
    pub fn from_host_header(host: &str) -> Result<Self, ConfigError> {
        Self::from_base(&format!("http://{host}"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Absolute URL of a file, given its path relative to the served root
    pub fn file_url(&self, relative: &Path) -> Url {
        let segments = std::iter::once(STATIC_PATH.to_string()).chain(path_segments(relative));
        self.join(segments)
    }

    /// URL of the RSS feed: the base itself, or `/feed/<folder>`
    pub fn feed_url(&self, folder: Option<&str>) -> Url {
        match folder {
            Some(folder) => self.join([FEED_PATH, folder]),
            None => self.base.clone(),
        }
    }

    /// URL of the HTML listing: `/web` or `/web/<folder>`
    pub fn web_url(&self, folder: Option<&str>) -> Url {
        match folder {
            Some(folder) => self.join([WEB_PATH, folder]),
            None => self.join([WEB_PATH]),
        }
    }

    fn join<I, S>(&self, segments: I) -> Url
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.base.clone();
        // Checked in `from_base`, a base URL always has path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Resolve a file path relative to the served root into an absolute URL
pub fn resolve(
    relative_path: &Path,
    public_url: Option<&str>,
    host: &str,
    port: u16,
) -> Result<Url, ConfigError> {
    Ok(LinkResolver::new(public_url, host, port)?.file_url(relative_path))
}

/// Split a relative path into raw (unencoded) URL path segments.
///
/// Root, prefix, `.` and `..` components are dropped.
pub fn path_segments(relative: &Path) -> Vec<String> {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Wrap a bare IPv6 address in brackets for use in URLs and socket addresses
pub(crate) fn bracket_ipv6(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::percent_decode_str;

    fn decoded_relative_path(url: &Url) -> String {
        url.path_segments()
            .unwrap()
            .skip(1)
            .map(|segment| percent_decode_str(segment).decode_utf8().unwrap().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    #[test]
    fn builds_url_from_host_and_port() {
        let url = resolve(Path::new("show/ep1.mp3"), None, "localhost", 5000).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/static/show/ep1.mp3");
    }

    #[test]
    fn public_url_overrides_host_and_port() {
        let url = resolve(
            Path::new("ep1.mp3"),
            Some("https://pods.example.com"),
            "0.0.0.0",
            8080,
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://pods.example.com/static/ep1.mp3");
    }

    #[test]
    fn public_url_keeps_path_prefix() {
        for base in ["https://example.com/pods", "https://example.com/pods/"] {
            let url = resolve(Path::new("ep1.mp3"), Some(base), "localhost", 5000).unwrap();
            assert_eq!(url.as_str(), "https://example.com/pods/static/ep1.mp3");
        }
    }

    #[test]
    fn encodes_spaces_and_non_ascii() {
        let url = resolve(Path::new("Roadside Picnic/01 – Café.mp3"), None, "localhost", 5000)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/static/Roadside%20Picnic/01%20%E2%80%93%20Caf%C3%A9.mp3"
        );
    }

    #[test]
    fn encoded_path_round_trips() {
        let relative = "Солярис/Chapter #1 [50%] ?.mp3";
        let url = resolve(Path::new(relative), None, "localhost", 5000).unwrap();

        assert!(!url.as_str().contains(' '));
        assert_eq!(decoded_relative_path(&url), relative);
    }

    #[test]
    fn ignores_dot_components() {
        let url = resolve(Path::new("./a/../b.mp3"), None, "localhost", 5000).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/static/a/b.mp3");
    }

    #[test]
    fn feed_and_web_urls() {
        let links = LinkResolver::new(None, "localhost", 5000).unwrap();

        assert_eq!(links.feed_url(None).as_str(), "http://localhost:5000/");
        assert_eq!(
            links.feed_url(Some("Roadside Picnic")).as_str(),
            "http://localhost:5000/feed/Roadside%20Picnic"
        );
        assert_eq!(links.web_url(None).as_str(), "http://localhost:5000/web");
        assert_eq!(
            links.web_url(Some("Solaris")).as_str(),
            "http://localhost:5000/web/Solaris"
        );
    }

    #[test]
    fn folder_names_with_slashes_stay_one_segment() {
        let links = LinkResolver::new(None, "localhost", 5000).unwrap();
        assert_eq!(
            links.feed_url(Some("AC/DC")).as_str(),
            "http://localhost:5000/feed/AC%2FDC"
        );
    }

    #[test]
    fn brackets_ipv6_hosts() {
        let links = LinkResolver::new(None, "::1", 5000).unwrap();
        assert_eq!(links.base().as_str(), "http://[::1]:5000/");
    }

    #[test]
    fn host_header_resolver() {
        let links = LinkResolver::from_host_header("media.local:8080").unwrap();
        assert_eq!(
            links.file_url(Path::new("a.mp3")).as_str(),
            "http://media.local:8080/static/a.mp3"
        );
    }

    #[test]
    fn strips_query_and_fragment_from_base() {
        let links = LinkResolver::from_base("https://example.com/pods?x=1#top").unwrap();
        assert_eq!(
            links.file_url(Path::new("a.mp3")).as_str(),
            "https://example.com/pods/static/a.mp3"
        );
    }

    #[test]
    fn rejects_invalid_base() {
        assert!(matches!(
            LinkResolver::from_base("example.com"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            LinkResolver::from_base("mailto:someone@example.com"),
            Err(ConfigError::CannotBeABase(_))
        ));
    }
}
