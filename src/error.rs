// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors in the user supplied configuration, reported before any scan begins
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("--title-from-id3 and --title-from-filename are mutually exclusive")]
    ConflictingTitleSources,

    #[error("Directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to resolve directory {path}: {source}")]
    ResolveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid public URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL '{0}' cannot be used as a base for links")]
    CannotBeABase(String),
}

/// Errors for a single file during metadata extraction.
///
/// These never abort a scan; the file is skipped instead.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Not a supported audio file: {path}")]
    Unsupported { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Modification time of {path} is out of range")]
    InvalidTimestamp { path: PathBuf },

    #[error("Path is not valid UTF-8: {path}")]
    NonUtf8Path { path: PathBuf },
}

/// Errors reported by a tag reader
#[derive(Error, Debug)]
pub enum TagError {
    #[error("Failed to read tags from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },
}

/// Errors that can occur when scanning a directory for episodes
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while serializing a feed document
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to write RSS document: {0}")]
    Xml(#[from] rss::Error),

    #[error("Rendered document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Top-level errors for producing feed documents
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Errors from the HTTP server
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Server(#[source] std::io::Error),
}

/// Errors while answering a single HTTP request
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid base URL: {0}")]
    Links(#[from] ConfigError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("Feed task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
