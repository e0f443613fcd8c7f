use clap::{Parser, Subcommand};
use log::{debug, info};
use reelsync::{
    config::{self, Config},
    share_link::{self, SavedEntry},
};

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the playlist carried by a share link
    Inspect {
        /// Absolute page url carrying the playlist
        share_url: String,
    },
    /// Build a share link from `<url>|<start>` entries
    Share {
        /// Page url to attach the playlist to (default: share.base_url)
        #[arg(long)]
        base: Option<String>,
        entries: Vec<String>,
    },
}

fn config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("reelsync.toml"))
}

fn load_config() -> Result<Config, config::ConfigError> {
    match config_path() {
        Some(path) => config::load_or_create_config(&path),
        None => {
            info!("No config directory available. Using default config");
            Ok(Config::default())
        }
    }
}

fn inspect(config: &Config, share_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let decoded = share_link::decode_query(&share_link::query_of(share_url), &config.share);
    info!(
        "Decoded {} entries from {:?}",
        decoded.entries.len(),
        decoded.source
    );
    println!("{}", serde_json::to_string_pretty(&decoded.entries)?);
    Ok(())
}

fn share(
    config: &Config,
    base: Option<&str>,
    values: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let base_url = base.unwrap_or(config.share.base_url.as_str());
    let entries: Vec<SavedEntry> = values
        .iter()
        .map(|value| {
            let entry = share_link::parse_legacy_value(value, config.share.legacy_delimiter);
            debug!("Adding entry url={} start={}", entry.url, entry.start_time);
            entry
        })
        .collect();
    println!(
        "{}",
        share_link::share_url(base_url, &entries, &config.share)?
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();

    let config = load_config()?;

    match &cli.command {
        Command::Inspect { share_url } => inspect(&config, share_url),
        Command::Share { base, entries } => share(&config, base.as_deref(), entries),
    }
}
