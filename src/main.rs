use std::{
    fs,
    path::PathBuf,
    time::Duration,
};

use anyhow::{
    bail,
    Context,
};
use clap::{
    Parser,
    Subcommand,
};
use jpdb_sync::{
    core::{
        Card,
        Ease,
        Note,
    },
    hooks::DEFAULT_BULK_DELAY,
    persistence::{
        get_data_file_path,
        CACHE_FILE,
        CONFIG_FILE,
    },
    settings::SettingKey,
    Host,
    JpdbClient,
    JpdbSync,
    Outcome,
    Settings,
    SyncError,
    WordCache,
};
use tracing::{
    error,
    info,
};
use tracing_subscriber::EnvFilter;

/// Sync words and reviews with a jpdb.io deck
#[derive(Parser)]
#[command(name = "jpdb-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (JSON object of add-on settings)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Word cache file
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    #[arg(long, env = "JPDB_API_KEY", global = true, hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "JPDB_SESSION_TOKEN", global = true, hide_env_values = true)]
    session_token: Option<String>,

    /// Override the jpdb base url
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a word to the mining deck, as when a note is created
    Add { word: String },

    /// Add a word if needed and send a review grade for it
    Review {
        word: String,

        /// 1: Again, 2: Hard, 3: Good, 4: Easy
        #[arg(long, default_value_t = 3)]
        ease: u8,
    },

    /// Sync a file of new words, one per line, stopping at the first cached word
    SyncNew {
        file: PathBuf,

        /// Pause between words, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Print the cached words
    Cache,
}

struct ConsoleHost;

impl Host for ConsoleHost {
    fn show_critical(&self, message: &str) {
        error!("{}", message);
        eprintln!("{message}");
    }

    fn report_progress(&self, done: usize, total: usize, label: &str) {
        info!("[{}/{}] {}", done, total, label);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let path = cli.config.clone().unwrap_or_else(|| get_data_file_path(CONFIG_FILE));
    let mut settings =
        Settings::load(&path).with_context(|| format!("reading {}", path.display()))?;

    if let Some(key) = &cli.api_key {
        settings.set(SettingKey::ApiKey, key.as_str());
    }
    if let Some(token) = &cli.session_token {
        settings.set(SettingKey::SessionToken, token.as_str());
    }
    Ok(settings)
}

fn note_for(settings: &Settings, word: &str) -> anyhow::Result<Note> {
    let fields = settings.word_fields()?;
    let Some(field) = fields.first() else {
        bail!("word_fields is empty");
    };
    Ok(Note::new().with_field(field.as_str(), word))
}

fn report(outcome: &Outcome) -> anyhow::Result<()> {
    match outcome {
        Outcome::Failed(step) => bail!("{}", step.message()),
        other => {
            println!("{other:?}");
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = load_settings(&cli)?;
    let cache_path = cli.cache.clone().unwrap_or_else(|| get_data_file_path(CACHE_FILE));
    let cache = WordCache::load(&cache_path)
        .with_context(|| format!("loading word cache {}", cache_path.display()))?;

    if let Command::Cache = cli.command {
        for entry in cache.entries() {
            println!("{}\t{}\t{}\t{}", entry.word, entry.vocab.vid, entry.vocab.sid, entry.state);
        }
        return Ok(());
    }

    let mut client = JpdbClient::from_settings(&settings)?;
    if let Some(base_url) = &cli.base_url {
        client = client.with_base_url(base_url.as_str());
    }
    let mut sync = JpdbSync::new(settings, cache, client, ConsoleHost);

    let result = match &cli.command {
        Command::Add { word } => {
            let note = note_for(sync.settings(), word)?;
            sync.on_note_will_be_added(&note).map_err(anyhow::Error::from).and_then(|o| report(&o))
        }
        Command::Review { word, ease } => {
            let ease = Ease::try_from(*ease)?;
            let note = note_for(sync.settings(), word)?;
            sync.on_card_answered(&note, ease).map_err(anyhow::Error::from).and_then(|o| report(&o))
        }
        Command::SyncNew { file, delay_ms } => {
            let text =
                fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
            let mut cards = Vec::new();
            for (i, word) in text.lines().map(str::trim).filter(|w| !w.is_empty()).enumerate() {
                cards.push(Card { id: i as u64, note: note_for(sync.settings(), word)?, is_new: true });
            }
            let delay = delay_ms.map(Duration::from_millis).unwrap_or(DEFAULT_BULK_DELAY);
            sync.sync_new_cards(&cards, delay).map_err(anyhow::Error::from).map(|report| {
                println!("{report:?}");
            })
        }
        Command::Cache => Ok(()),
    };

    finish(result, sync.on_profile_will_close())
}

/// The cache is flushed whatever the command did; a failed command keeps its
/// own error even when the flush fails too.
fn finish(result: anyhow::Result<()>, flush: Result<(), SyncError>) -> anyhow::Result<()> {
    match (result, flush) {
        (Err(command), Err(flush)) => {
            error!("Saving the word cache failed: {flush}");
            Err(command)
        }
        (result, flush) => result.and(flush.context("saving word cache")),
    }
}
