use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use console::Emoji;
use tracing_subscriber::EnvFilter;

use podfeed::config::{DEFAULT_HOST, DEFAULT_PORT};
use podfeed::feed::{has_audio, list_subfolders};
use podfeed::{
    Config, FeedConfig, Format, LinkResolver, LoftyTagReader, Policy, generate_output, serve,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static GLOBE: Emoji<'_, '_> = Emoji("🌐 ", "[>] ");
static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
static LINK: Emoji<'_, '_> = Emoji("🔗 ", "[~] ");

/// Podcast feed generator and server for a directory of audio files
#[derive(Parser, Debug)]
#[command(name = "podfeed")]
#[command(about = "Turn a directory of audio files into podcast feeds and serve them over HTTP")]
#[command(version)]
struct Args {
    /// `generate` prints the RSS feed, `generate_html` the HTML listing,
    /// `serve` runs the built-in web server
    #[arg(value_enum, value_name = "COMMAND")]
    command: Command,

    /// Directory with episode audio files
    #[arg(value_name = "DIRECTORY")]
    directory: PathBuf,

    /// Listen hostname or IP address
    #[arg(long, env = "PODFEED_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Listen TCP port
    #[arg(long, env = "PODFEED_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Public base URL for links in the feed, when running behind a reverse proxy
    #[arg(long, env = "PODFEED_PUBLIC_URL")]
    public_url: Option<String>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,

    /// Feed title (defaults to the directory or folder name)
    #[arg(long)]
    title: Option<String>,

    /// Feed link (defaults to the feed URL)
    #[arg(long)]
    link: Option<String>,

    /// Order episodes by filename instead of modification time, with
    /// synthetic publish dates
    #[arg(long)]
    force_order_by_name: bool,

    /// One feed per immediate subfolder instead of one combined feed
    #[arg(long)]
    folder_feeds: bool,

    /// Use the embedded title tag, falling back to the filename
    #[arg(long, conflicts_with = "title_from_filename")]
    title_from_id3: bool,

    /// Use only the filename (without extension), ignoring tags
    #[arg(long)]
    title_from_filename: bool,

    /// Comma separated audio file extensions to include
    #[arg(long, value_delimiter = ',', value_name = "EXT")]
    extensions: Option<Vec<String>>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    /// Print the RSS feed
    Generate,
    /// Print the HTML listing
    #[value(name = "generate_html", alias = "generate-html")]
    GenerateHtml,
    /// Serve feeds and audio files over HTTP
    Serve,
}

impl Args {
    /// Collect the flags into one validated configuration
    fn config(&self) -> Result<Config> {
        let policy = Policy::from_flags(
            self.force_order_by_name,
            self.title_from_id3,
            self.title_from_filename,
        )?;

        let mut feed = FeedConfig {
            title: self.title.clone(),
            link: self.link.clone(),
            folder_feeds: self.folder_feeds,
            ..FeedConfig::default()
        };
        if let Some(extensions) = &self.extensions {
            feed = feed.with_extensions(extensions);
        }

        let config = Config::new(&self.directory)
            .with_context(|| format!("Cannot use {}", self.directory.display()))?
            .with_policy(policy)
            .with_feed(feed)
            .with_server(self.host.clone(), self.port)
            .with_public_url(self.public_url.clone());

        Ok(config)
    }
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "podfeed=debug,tower_http=debug,info"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_banner(config: &Config, links: &LinkResolver) {
    println!(
        "\n{}{} {}\n",
        MICROPHONE,
        "podfeed".bold().magenta(),
        "- Podcast Feed Server".dimmed()
    );
    println!(
        "{GLOBE}Listening on {}",
        format!("http://{}", config.bind_addr()).cyan()
    );
    if let Some(public_url) = &config.public_url {
        println!("{LINK}Using public URL: {}", public_url.cyan());
    }

    if !config.feed.folder_feeds {
        println!(
            "\n{HEADPHONES}Feed: {}",
            links.feed_url(None).to_string().green().bold()
        );
        println!("{HEADPHONES}Web:  {}\n", links.web_url(None).to_string().green());
        return;
    }

    let folders: Vec<String> = list_subfolders(&config.root)
        .unwrap_or_default()
        .into_iter()
        .filter(|folder| has_audio(&config.root.join(folder), &config.feed))
        .collect();

    println!(
        "\n{FOLDER}Found {} folder(s) with audio files:",
        folders.len().to_string().cyan()
    );
    for folder in &folders {
        println!("  - {}", folder.bold());
        println!("    RSS: {}", links.feed_url(Some(folder)).to_string().green());
        println!("    Web: {}", links.web_url(Some(folder)).to_string().dimmed());
    }
    println!(
        "\n{HEADPHONES}Index: {}\n",
        links.web_url(None).to_string().green().bold()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let config = args.config()?;
    let links = config.links().context("Invalid --public-url")?;
    let tags = LoftyTagReader::new();

    match args.command {
        Command::Generate | Command::GenerateHtml => {
            let format = if args.command == Command::Generate {
                Format::Xml
            } else {
                Format::Html
            };
            let output = generate_output(&config, &links, &tags, format)
                .context("Failed to generate feed")?;
            println!("{output}");
        }
        Command::Serve => {
            print_banner(&config, &links);
            serve(config, Arc::new(tags))
                .await
                .context("Failed to serve feeds")?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use podfeed::{ConfigError, OrderBy, TitleSource};
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("podfeed").chain(args.iter().copied()))
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse(&["generate", "."]).unwrap().command, Command::Generate);
        assert_eq!(
            parse(&["generate_html", "."]).unwrap().command,
            Command::GenerateHtml
        );
        assert_eq!(
            parse(&["generate-html", "."]).unwrap().command,
            Command::GenerateHtml
        );
        assert_eq!(parse(&["serve", "."]).unwrap().command, Command::Serve);
        assert!(parse(&["publish", "."]).is_err());
    }

    #[test]
    fn title_flags_conflict() {
        let result = parse(&[
            "generate",
            ".",
            "--title-from-id3",
            "--title-from-filename",
        ]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn builds_config_from_flags() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_str().unwrap();
        let args = parse(&[
            "serve",
            root,
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--title",
            "Books",
            "--force-order-by-name",
            "--title-from-filename",
            "--folder-feeds",
            "--extensions",
            "mp3,.OGG",
        ])
        .unwrap();

        let config = args.config().unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.policy.order_by, OrderBy::Filename);
        assert_eq!(config.policy.title_source, TitleSource::Filename);
        assert_eq!(config.feed.title.as_deref(), Some("Books"));
        assert!(config.feed.folder_feeds);
        assert_eq!(config.feed.extensions, vec!["mp3", "ogg"]);
    }

    #[test]
    fn rejects_missing_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        let args = parse(&["generate", missing.to_str().unwrap()]).unwrap();

        let error = args.config().unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ConfigError>(),
            Some(ConfigError::DirectoryNotFound(_))
        ));
    }
}
