pub mod config;
pub mod error;
pub mod feed;
pub mod generate;
pub mod links;
pub mod metadata;
pub mod order;
pub mod serve;

// Re-export main types for convenience
pub use config::{Config, FeedConfig, OrderBy, Policy, TitleSource};
pub use error::{
    ConfigError, ExtractError, GenerateError, RenderError, RequestError, ScanError, ServeError,
    TagError,
};
pub use feed::{
    FeedDocument, FeedGroup, Format, assemble, assemble_folder, render, render_html,
    render_index, render_xml,
};
pub use generate::{generate_feed, generate_folder, generate_index, generate_output};
pub use links::LinkResolver;
pub use metadata::{AudioFile, LoftyTagReader, TagReader, Tags, extract};
pub use order::{EpisodeMetadata, resolve};
pub use serve::{AppState, router, serve};
