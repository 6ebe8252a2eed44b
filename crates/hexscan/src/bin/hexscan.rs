//! hexscan CLI: score a photographed board, inspect the layout and history.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use hexscan::color::CountSource;
use hexscan::{
    detect, HistoryStats, HistoryStore, JsonFileHistory, Player, PlayerScore, Roster, Scanner,
    ScannerConfig, TransformSource,
};
use serde::Serialize;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "hexscan")]
#[command(about = "Align a hexagonal pegboard photo and count the colored pieces per player")]
#[command(version)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON log lines (with the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a still image and print the result as JSON.
    Scan(ScanArgs),

    /// Print the board sample points as JSON.
    Layout {
        #[command(flatten)]
        config: ConfigArg,
    },

    /// Print stored match records and statistics.
    History {
        #[command(flatten)]
        config: ConfigArg,

        /// History file (overrides the config).
        #[arg(long)]
        history: Option<PathBuf>,

        /// Delete all records.
        #[arg(long)]
        clear: bool,
    },

    /// Print the default configuration.
    ConfigTemplate {
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct ConfigArg {
    /// Scanner config (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl ConfigArg {
    fn load(&self) -> CliResult<ScannerConfig> {
        match &self.config {
            Some(path) => {
                log::info!("loading config {}", path.display());
                Ok(ScannerConfig::load_json(path)?)
            }
            None => Ok(ScannerConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Args)]
struct ScanArgs {
    /// Board photo.
    image: PathBuf,

    #[command(flatten)]
    config: ConfigArg,

    /// Players as `name:color`, in turn order (2 to 4).
    #[arg(long = "player", value_name = "NAME:COLOR")]
    players: Vec<String>,

    /// History file (overrides the config).
    #[arg(long)]
    history: Option<PathBuf>,

    /// Do not append the result to the history.
    #[arg(long)]
    no_history: bool,

    /// Save the aligned board raster (PNG).
    #[arg(long)]
    aligned_out: Option<PathBuf>,
}

#[derive(Serialize)]
struct ScanReport<'a> {
    transform_source: TransformSource,
    count_source: CountSource,
    counts: Vec<(&'a str, u32)>,
    ranking: &'a [PlayerScore],
    winner: Option<&'a str>,
    corners: Vec<[f32; 2]>,
}

#[derive(Serialize)]
struct HistoryReport<'a> {
    records: &'a [hexscan::MatchRecord],
    stats: HistoryStats,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Scan(args) => run_scan(&args),
        Commands::Layout { config } => run_layout(&config),
        Commands::History {
            config,
            history,
            clear,
        } => run_history(&config, history.as_deref(), clear),
        Commands::ConfigTemplate { out } => run_config_template(out.as_deref()),
    }
}

#[cfg(feature = "tracing")]
fn init_logging(verbose: u8, json: bool) {
    hexscan::core::init_tracing(hexscan::core::level_for_verbosity(verbose), json);
    let _ = tracing_log::LogTracer::init();
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: u8, _json: bool) {
    let _ = hexscan::core::init_with_level(hexscan::core::level_for_verbosity(verbose));
}

fn parse_player(raw: &str) -> CliResult<Player> {
    let (name, color) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("player {raw:?} must look like NAME:COLOR"))?;
    if name.trim().is_empty() {
        return Err(format!("player {raw:?} has no name").into());
    }
    Ok(Player {
        name: name.trim().to_string(),
        color: color.trim().to_string(),
    })
}

fn history_store(cfg: &ScannerConfig, path: Option<&Path>) -> JsonFileHistory {
    match path {
        Some(p) => JsonFileHistory::new(p, cfg.history.cap),
        None => JsonFileHistory::from_config(&cfg.history),
    }
}

// ── scan ──────────────────────────────────────────────────────────────

fn run_scan(args: &ScanArgs) -> CliResult<()> {
    let cfg = args.config.load()?;
    let mut scanner = Scanner::new(cfg.clone())?;
    if !args.players.is_empty() {
        let players = args
            .players
            .iter()
            .map(String::as_str)
            .map(parse_player)
            .collect::<CliResult<Vec<_>>>()?;
        let palette = cfg.colors.ids().map(str::to_string).collect();
        *scanner.roster_mut() = Roster::from_players(palette, players)?;
    }

    log::info!("loading image {}", args.image.display());
    let img = detect::load_rgb(&args.image)?;
    let result = detect::scan_image(&mut scanner, &img)?;

    if let Some(out) = &args.aligned_out {
        let raster = result.transform.warp(&detect::rgb_view(&img)?);
        detect::raster_to_image(&raster)?.save(out)?;
        log::info!("aligned raster written to {}", out.display());
    }

    if !args.no_history {
        let mut store = history_store(&cfg, args.history.as_deref());
        if let Err(e) = store.append(result.record.clone()) {
            log::warn!("match not saved to history: {e}");
        }
    }

    let report = ScanReport {
        transform_source: result.transform_source,
        count_source: result.analysis.source,
        counts: result
            .analysis
            .color_ids
            .iter()
            .map(String::as_str)
            .zip(result.analysis.counts.iter().copied())
            .collect(),
        ranking: &result.outcome.ranking,
        winner: result.record.winner_name.as_deref(),
        corners: result.transform.corners.iter().map(|c| [c.x, c.y]).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ── layout ────────────────────────────────────────────────────────────

fn run_layout(config: &ConfigArg) -> CliResult<()> {
    let cfg = config.load()?;
    let layout = cfg.build_layout()?;
    println!("{}", serde_json::to_string_pretty(layout.sample_points())?);
    Ok(())
}

// ── history ───────────────────────────────────────────────────────────

fn run_history(config: &ConfigArg, path: Option<&Path>, clear: bool) -> CliResult<()> {
    let cfg = config.load()?;
    let mut store = history_store(&cfg, path);
    if clear {
        store.clear()?;
        log::info!("history {} cleared", store.path().display());
    }
    let records = store.read_all()?;
    let report = HistoryReport {
        stats: HistoryStats::from_records(&records),
        records: &records,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ── config-template ───────────────────────────────────────────────────

fn run_config_template(out: Option<&Path>) -> CliResult<()> {
    let cfg = ScannerConfig::default();
    match out {
        Some(path) => cfg.write_json(path)?,
        None => println!("{}", serde_json::to_string_pretty(&cfg)?),
    }
    Ok(())
}
