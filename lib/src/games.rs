use crate::{
    error::Error, f64_values, features, require_columns, season::Season, str_values, Result,
    TrackedStat,
};
use derive_deref::Deref;
use itertools::{izip, Itertools};
use polars::prelude::*;
use std::path::Path;

pub const PLAYER_ID: &str = "player_id";
pub const PLAYER_NAME: &str = "player_name";
pub const TEAM_ID: &str = "team_id";
pub const GAME_ID: &str = "game_id";
pub const GAME_DATE: &str = "game_date";
pub const SEASON: &str = "season";
pub const MINUTES: &str = "minutes";
pub const TEAM_MINUTES: &str = "team_minutes";
pub const PLUS_MINUS_TEAM: &str = "plus_minus_team";

pub const REQUIRED_COLUMNS: [&str; 8] = [
    PLAYER_ID,
    PLAYER_NAME,
    TEAM_ID,
    GAME_ID,
    GAME_DATE,
    MINUTES,
    TEAM_MINUTES,
    PLUS_MINUS_TEAM,
];

/// Five players on the floor for a 48 minute game.
pub const DEFAULT_TEAM_MINUTES: f64 = 240.0;

/// One player's participation in one game, as consumed by the regression.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerGame {
    pub player_id: String,
    pub player_name: Option<String>,
    pub team_id: String,
    pub game_id: String,
    pub game_date: String,
    pub season: String,
    pub minutes: f64,
    pub team_minutes: f64,
    pub plus_minus_team: Option<f64>,
}

/// Per-player game rows with normalized column types and season labels.
#[derive(Clone, Deref)]
pub struct GameRowsDf(DataFrame);

impl GameRowsDf {
    /// Validates and cleans a raw per-game table.
    ///
    /// Ids and dates become strings, minutes and tracked stats become `f64`,
    /// missing minutes count as 0 and missing team minutes as a full game.
    /// Season labels are normalized to `"YYYY-YY"`, or derived from `game_date`
    /// with `cutover_month` when the table has no `season` column.
    pub fn new(df: DataFrame, cutover_month: u32) -> Result<Self> {
        log::trace!("games::new");
        require_columns(&df, REQUIRED_COLUMNS)?;
        let df = features::parse_minutes_columns(df)?;

        let present = df.get_column_names();
        let stat_exprs: Vec<Expr> = TrackedStat::ALL
            .iter()
            .map(ToString::to_string)
            .filter(|name| present.contains(&name.as_str()))
            .map(|name| col(&name).cast(DataType::Float64))
            .collect();

        let mut exprs = vec![
            col(PLAYER_ID).cast(DataType::String),
            col(PLAYER_NAME).cast(DataType::String),
            col(TEAM_ID).cast(DataType::String),
            col(GAME_ID).cast(DataType::String),
            col(GAME_DATE).cast(DataType::String),
            col(MINUTES).cast(DataType::Float64).fill_null(lit(0.0)),
            col(TEAM_MINUTES)
                .cast(DataType::Float64)
                .fill_null(lit(DEFAULT_TEAM_MINUTES)),
            col(PLUS_MINUS_TEAM).cast(DataType::Float64),
        ];
        exprs.extend(stat_exprs);

        let mut df = df.lazy().with_columns(exprs).collect()?;
        let seasons = season_labels(&df, cutover_month)?;
        df.with_column(Series::new(SEASON, seasons))?;

        log::debug!("{} player-game rows loaded", df.height());
        Ok(GameRowsDf(df))
    }

    pub fn load<P: AsRef<Path>>(path: P, cutover_month: u32) -> Result<Self> {
        let df = crate::load_table(path)?;
        Self::new(df, cutover_month)
    }

    pub fn filter(self, filter: Expr) -> Result<Self> {
        let df = self.0.lazy().filter(filter).collect()?;
        Ok(GameRowsDf(df))
    }

    /// Fails fast unless every listed statistic has a column.
    pub fn require(&self, stats: &[TrackedStat]) -> Result<()> {
        let names: Vec<String> = stats.iter().map(ToString::to_string).collect();
        require_columns(&self.0, names.iter().map(String::as_str))
    }

    /// Distinct season labels, ascending.
    pub fn seasons(&self) -> Result<Vec<String>> {
        let seasons = str_values(&self.0, SEASON)?
            .into_iter()
            .flatten()
            .unique()
            .sorted()
            .collect();
        Ok(seasons)
    }

    pub fn player_games(&self) -> Result<Vec<PlayerGame>> {
        let df = &self.0;
        let rows = izip!(
            str_values(df, PLAYER_ID)?,
            str_values(df, PLAYER_NAME)?,
            str_values(df, TEAM_ID)?,
            str_values(df, GAME_ID)?,
            str_values(df, GAME_DATE)?,
            str_values(df, SEASON)?,
            f64_values(df, MINUTES)?,
            f64_values(df, TEAM_MINUTES)?,
            f64_values(df, PLUS_MINUS_TEAM)?,
        )
        .map(
            |(
                player_id,
                player_name,
                team_id,
                game_id,
                game_date,
                season,
                minutes,
                team_minutes,
                plus_minus_team,
            )| PlayerGame {
                player_id: player_id.unwrap_or_default(),
                player_name,
                team_id: team_id.unwrap_or_default(),
                game_id: game_id.unwrap_or_default(),
                game_date: game_date.unwrap_or_default(),
                season: season.unwrap_or_default(),
                minutes: minutes.unwrap_or(0.0),
                team_minutes: team_minutes.unwrap_or(DEFAULT_TEAM_MINUTES),
                plus_minus_team,
            },
        )
        .collect();
        Ok(rows)
    }

    pub fn into_inner(self) -> DataFrame {
        self.0
    }
}

fn season_labels(df: &DataFrame, cutover_month: u32) -> Result<Vec<String>> {
    let dates = str_values(df, GAME_DATE)?;
    let labels = if df.get_column_names().contains(&SEASON) {
        str_values(df, SEASON)?
    } else {
        vec![None; df.height()]
    };

    labels
        .into_iter()
        .zip(dates)
        .map(|(label, date)| -> Result<String> {
            let season = match (label, date) {
                (Some(label), _) => label.parse::<Season>()?,
                (None, Some(date)) => Season::from_date_str(&date, cutover_month)?,
                (None, None) => {
                    return Err(Error::InvalidSeason(
                        "row has neither a season nor a game date".to_string(),
                    ))
                }
            };
            Ok(season.to_string())
        })
        .collect()
}
