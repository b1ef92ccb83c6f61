// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::links::{LinkResolver, bracket_ipv6};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DESCRIPTION: &str = "Feed generated by podfeed";

/// Extensions treated as episodes unless overridden
pub const DEFAULT_EXTENSIONS: [&str; 9] = [
    "mp3", "m4a", "m4b", "aac", "ogg", "oga", "opus", "wav", "flac",
];

/// Sort key used to order episodes within a feed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderBy {
    /// Newest modification time first
    #[default]
    Mtime,
    /// Natural filename order, with synthetic publish dates
    Filename,
}

/// Where episode titles come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TitleSource {
    /// Embedded title tag, falling back to the file name
    #[default]
    Id3,
    /// File name without extension, tags are never read
    Filename,
}

/// Ordering and title policy applied to every feed group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub order_by: OrderBy,
    pub title_source: TitleSource,
}

impl Policy {
    /// Build a policy from the command line switches
    pub fn from_flags(
        force_order_by_name: bool,
        title_from_id3: bool,
        title_from_filename: bool,
    ) -> Result<Self, ConfigError> {
        let title_source = match (title_from_id3, title_from_filename) {
            (true, true) => return Err(ConfigError::ConflictingTitleSources),
            (_, true) => TitleSource::Filename,
            _ => TitleSource::Id3,
        };

        let order_by = if force_order_by_name {
            OrderBy::Filename
        } else {
            OrderBy::Mtime
        };

        Ok(Self {
            order_by,
            title_source,
        })
    }
}

/// Channel level settings shared by every generated feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Explicit channel title; otherwise derived from the directory name
    pub title: Option<String>,
    /// Explicit channel link; otherwise the feed URL
    pub link: Option<String>,
    pub description: String,
    /// One feed per immediate subfolder instead of one combined feed
    pub folder_feeds: bool,
    /// Lowercase audio extensions, without the leading dot
    pub extensions: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: None,
            link: None,
            description: DEFAULT_DESCRIPTION.to_string(),
            folder_feeds: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl FeedConfig {
    /// Replace the extension allow-list, normalizing case and leading dots
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        self
    }

    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Complete, validated configuration for one invocation.
///
/// Built once from the command line and passed by reference; nothing in the
/// library reads process-wide state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Canonical path of the served directory
    pub root: PathBuf,
    pub policy: Policy,
    pub feed: FeedConfig,
    pub host: String,
    pub port: u16,
    /// Base URL used for links when running behind a reverse proxy
    pub public_url: Option<String>,
}

impl Config {
    /// Create a configuration for `root`, which must be an existing directory
    pub fn new(root: &Path) -> Result<Self, ConfigError> {
        if !root.exists() {
            return Err(ConfigError::DirectoryNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ConfigError::NotADirectory(root.to_path_buf()));
        }

        let root = root
            .canonicalize()
            .map_err(|source| ConfigError::ResolveFailed {
                path: root.to_path_buf(),
                source,
            })?;

        Ok(Self {
            root,
            policy: Policy::default(),
            feed: FeedConfig::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_url: None,
        })
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_feed(mut self, feed: FeedConfig) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_public_url(mut self, public_url: Option<String>) -> Self {
        self.public_url = public_url.filter(|url| !url.trim().is_empty());
        self
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", bracket_ipv6(&self.host), self.port)
    }

    /// Link resolver for this configuration, validating the public URL
    pub fn links(&self) -> Result<LinkResolver, ConfigError> {
        LinkResolver::new(self.public_url.as_deref(), &self.host, self.port)
    }
}
