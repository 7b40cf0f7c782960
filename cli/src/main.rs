use anyhow::{bail, Result};
use clap::Parser;
use dpm::{features::derive_features, pipeline, Config, GameRowsDf, Preset};
use log::LevelFilter;
use polars::prelude::*;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Per-player game table (CSV or Parquet)
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: std::path::PathBuf,

    /// Where to write the ratings table (CSV or Parquet)
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    out: Option<std::path::PathBuf>,

    #[arg(long, default_value = "lite")]
    preset: String,

    /// JSON config file; replaces the preset
    #[arg(long, value_name = "FILE")]
    config: Option<std::path::PathBuf>,

    #[arg(long)]
    lambda: Option<f64>,

    /// Standardize against players with at least this many season minutes
    #[arg(long)]
    qualify_minutes: Option<f64>,

    #[arg(short = 's', long = "season")]
    season: Option<String>,

    #[arg(short = 'n', long = "top", default_value_t = 25)]
    top: usize,

    /// Derive per-100 and shooting columns from raw box-score counts
    #[arg(long)]
    derive_features: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let log_config = ConfigBuilder::new().add_filter_allow_str("dpm::").build();
    TermLogger::init(
        default_level,
        log_config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    log::trace!("Args {:#?}", args);

    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => match args.preset.parse::<Preset>() {
            Ok(preset) => Config::preset(preset),
            Err(_) => bail!("Unsupported preset. Use: lite or classic"),
        },
    };
    if let Some(lambda) = args.lambda {
        config.rapm.lambda = lambda;
    }
    if let Some(floor) = args.qualify_minutes {
        config = config.qualify_minutes(floor);
    }

    let mut df = dpm::load_table(&args.file)?;
    log::info!("Loaded {} player-game rows", df.height());
    if args.derive_features {
        df = derive_features(df)?;
    }
    let games = GameRowsDf::new(df, config.cutover_month)?;

    let mut ratings = pipeline::run(&games, &config)?;
    if let Some(season) = &args.season {
        ratings = ratings.season(season)?;
        if ratings.height() == 0 {
            bail!("No ratings for season {season}");
        }
    }

    if let Some(out) = &args.out {
        ratings.write(out)?;
        log::info!("Wrote {} ratings to {}", ratings.height(), out.display());
    }

    let simple = ratings
        .top(args.top)?
        .lazy()
        .select([cols(["season", "player_name", "season_minutes", "rapm", "dpm"])])
        .collect()?;
    println!("{}", simple);

    Ok(())
}
