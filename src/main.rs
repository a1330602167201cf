//! skeuokit - command line entry point.
//!
//! Wires the library pieces together for scripting and inspection:
//! - Logging infrastructure (file rotation + optional console output)
//! - Configuration loading ([`ConfigManager`], `skeuokit.yaml` + env overrides)
//! - Tokio runtime for the asset loader
//! - Settings store over the configured storage backend
//!
//! # Execution Flow
//!
//! 1. Parse arguments and load `skeuokit.yaml` from `--config-dir`
//! 2. Initialize logging → `<logging.dir>/<logging.prefix>.<date>`
//! 3. Create a tokio runtime and run the requested command on it
//! 4. Log the metrics summary and shut the runtime down
//!
//! Command output goes to stdout; logs go to the log file and stderr.

use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use skeuokit::models::game_center::{
    LeaderboardEntry, LeaderboardSortKey, format_players_online, format_score, sort_leaderboard,
};
use skeuokit::models::{AssetCategory, AssetFormat};
use skeuokit::services::{
    AssetLoader, AssetPayload, FsAssetSource, LoadOptions, LogSink, ManifestGenerator,
    ResolveOptions, SoundManager,
};
use skeuokit::state::{SettingUpdate, ToggleField};
use skeuokit::{APP_NAME, AppConfig, ConfigManager, Metrics, SettingsStore, VERSION};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

/// Settings engine and asset tooling for the skeuomorphic Game Center
#[derive(Parser, Debug)]
#[command(name = "skeuokit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding skeuokit.yaml; relative config paths resolve against it
    #[arg(long, default_value = ".")]
    config_dir: Utf8PathBuf,

    /// Log at debug level regardless of the configured level
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the asset directory and write the manifest
    Manifest {
        /// Asset root (default: assets.root)
        #[arg(long)]
        root: Option<Utf8PathBuf>,

        /// Output file (default: <root>/<assets.manifest_file>)
        #[arg(long)]
        output: Option<Utf8PathBuf>,
    },

    /// Inspect or change persisted settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Resolve, load and preload assets through the manifest
    #[command(subcommand)]
    Assets(AssetsCommand),

    /// Play a UI sound cue (lock, unlock, tap, notification)
    Sound { cue: String },

    /// Print a leaderboard JSON file in ranked order
    Leaderboard {
        file: Utf8PathBuf,

        #[arg(long, value_enum, default_value_t = SortArg::Score)]
        sort: SortArg,

        /// Also print an "N online" line for this many players
        #[arg(long)]
        online: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print the current settings as JSON
    Show,

    /// Flip a boolean field, e.g. `connectivity.wifiEnabled`
    Toggle { path: String },

    /// Set a field from a string, e.g. `sounds.volume 40`
    Set { path: String, value: String },

    /// Clear persisted settings
    Reset,
}

#[derive(Subcommand, Debug)]
enum AssetsCommand {
    /// Print the entry a name or id resolves to
    Resolve {
        key: String,

        /// Exact format wanted
        #[arg(long)]
        format: Option<String>,

        /// Fallback formats in order, comma separated
        #[arg(long, value_delimiter = ',')]
        prefer: Vec<String>,
    },

    /// Load an asset and describe its content
    Load {
        key: String,

        /// Preload even if the entry does not ask for it
        #[arg(long)]
        preload: bool,
    },

    /// Preload every asset of a category
    Preload { category: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Score,
    Streak,
    Name,
}

impl From<SortArg> for LeaderboardSortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Score => LeaderboardSortKey::Score,
            SortArg::Streak => LeaderboardSortKey::Streak,
            SortArg::Name => LeaderboardSortKey::Name,
        }
    }
}

/// Everything a command needs
struct App {
    config_manager: ConfigManager,
    config: AppConfig,
    metrics: Arc<Metrics>,
}

impl App {
    fn asset_root(&self) -> Utf8PathBuf {
        self.config_manager.resolve_path(&self.config.assets.root)
    }

    fn settings_store(&self) -> SettingsStore {
        let persistence = self.config_manager.open_persistence(&self.config.storage);
        SettingsStore::with_metrics(persistence, Arc::clone(&self.metrics))
    }

    fn asset_loader(&self) -> AssetLoader {
        let source = FsAssetSource::new(self.asset_root(), &self.config.assets.web_prefix)
            .with_metrics(Arc::clone(&self.metrics));
        AssetLoader::with_manifest_url(Arc::new(source), self.config.assets.manifest_url())
            .with_metrics(Arc::clone(&self.metrics))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let config = config_manager.load()?;

    let mut logging = config.logging.clone();
    logging.dir = config_manager
        .resolve_path(Utf8Path::new(&logging.dir))
        .into_string();
    let _guard = skeuokit::logging::setup_logging_from_config(&logging, cli.debug)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("skeuokit-worker")
        .build()?;

    let app = App {
        config_manager,
        config,
        metrics: Arc::new(Metrics::new()),
    };

    let result = runtime.block_on(run(cli.command, &app));

    app.metrics.log_summary();
    runtime.shutdown_timeout(Duration::from_secs(5));

    if let Err(e) = &result {
        tracing::error!("Command failed: {:#}", e);
    }
    result
}

async fn run(command: Command, app: &App) -> Result<()> {
    match command {
        Command::Manifest { root, output } => generate_manifest(app, root, output),
        Command::Settings(command) => settings(app, command),
        Command::Assets(command) => assets(app, command).await,
        Command::Sound { cue } => play_sound(app, &cue),
        Command::Leaderboard { file, sort, online } => leaderboard(&file, sort, online),
    }
}

fn generate_manifest(
    app: &App,
    root: Option<Utf8PathBuf>,
    output: Option<Utf8PathBuf>,
) -> Result<()> {
    let root = root.unwrap_or_else(|| app.asset_root());
    let output = output.unwrap_or_else(|| root.join(&app.config.assets.manifest_file));

    let manifest = ManifestGenerator::new(&root)
        .with_output(&output)
        .with_web_prefix(&app.config.assets.web_prefix)
        .generate()
        .with_context(|| format!("Failed to generate manifest for {}", root))?;

    println!("Wrote {} assets to {}", manifest.asset_count, output);
    Ok(())
}

fn settings(app: &App, command: SettingsCommand) -> Result<()> {
    let store = app.settings_store();

    match command {
        SettingsCommand::Show => {
            let snapshot = store.snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            let presentation = snapshot.presentation();
            println!(
                "brightness={:.2} sounds={} doNotDisturb={}",
                presentation.brightness, presentation.sounds_on, presentation.do_not_disturb_on
            );
        }
        SettingsCommand::Toggle { path } => {
            let field: ToggleField = path.parse()?;
            store.toggle(field);
            println!("{} = {}", field, store.read(|s| field.get(s)));
        }
        SettingsCommand::Set { path, value } => {
            let update = SettingUpdate::from_path(&path, &value)?;
            let field = update.field();
            store.set(update);
            println!("{} set from {:?}", field, value);
        }
        SettingsCommand::Reset => {
            store.reset();
            println!("Settings reset to defaults");
        }
    }

    Ok(())
}

async fn assets(app: &App, command: AssetsCommand) -> Result<()> {
    let loader = app.asset_loader();

    match command {
        AssetsCommand::Resolve {
            key,
            format,
            prefer,
        } => {
            let options = ResolveOptions {
                format: format.as_deref().map(AssetFormat::from),
                prefer_formats: prefer.iter().map(|f| AssetFormat::from(f.as_str())).collect(),
                id: None,
            };
            let record = loader
                .resolve(&key, &options)
                .await?
                .ok_or_else(|| anyhow!("No asset matches {}", key))?;
            println!("{}", serde_json::to_string_pretty(&record.entry)?);
        }
        AssetsCommand::Load { key, preload } => {
            let options = LoadOptions {
                preload,
                ..LoadOptions::default()
            };
            match loader.load(&key, &options).await? {
                AssetPayload::Text(svg) => println!("SVG markup, {} bytes", svg.len()),
                AssetPayload::Image(image) => {
                    println!("Image {}x{}", image.width(), image.height())
                }
                AssetPayload::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                AssetPayload::Path(path) => println!("{}", path),
            }
        }
        AssetsCommand::Preload { category } => {
            let category = AssetCategory::from_dir_name(&category)
                .ok_or_else(|| anyhow!("Unknown asset category: {}", category))?;
            let report = loader.preload_category(category).await?;

            for record in &report.assets {
                let mark = if record.is_preloaded() { "ok" } else { "--" };
                println!("[{}] {}", mark, record.entry.id);
            }
            for failure in &report.failures {
                eprintln!("{}: {}", failure.id, failure.error);
            }
            if !report.is_complete() {
                bail!(
                    "{} of {} {} assets failed to preload",
                    report.failures.len(),
                    report.assets.len(),
                    category
                );
            }
        }
    }

    Ok(())
}

fn play_sound(app: &App, cue: &str) -> Result<()> {
    let manager = SoundManager::new(
        app.settings_store(),
        Arc::new(LogSink),
        app.config.sound.sample_rate,
    )?;
    if manager.play_named(cue)? {
        println!("Played {}", cue);
    } else {
        println!("{} muted by settings", cue);
    }
    Ok(())
}

fn leaderboard(file: &Utf8Path, sort: SortArg, online: Option<u64>) -> Result<()> {
    let contents =
        fs::read_to_string(file).with_context(|| format!("Failed to read leaderboard: {}", file))?;
    let entries: Vec<LeaderboardEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse leaderboard: {}", file))?;

    for (rank, entry) in sort_leaderboard(&entries, sort.into()).iter().enumerate() {
        println!(
            "{:>3}. {:<20} {:>12}  streak {}",
            rank + 1,
            entry.player,
            format_score(entry.score),
            entry.best_streak
        );
    }
    if let Some(count) = online {
        println!("{}", format_players_online(count));
    }
    Ok(())
}
