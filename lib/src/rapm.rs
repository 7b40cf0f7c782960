use crate::{
    config::RapmConfig,
    design::DesignMatrix,
    filter::GameFilter,
    games::{GameRowsDf, PlayerGame, PLAYER_ID, PLAYER_NAME, SEASON},
    ridge::{self, PlayerRapm},
    team_game, Result,
};
use derive_deref::Deref;
use polars::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeMap;

pub const RAPM: &str = "rapm";
pub const TEAM_GAMES: &str = "team_games";

/// Display name for players whose rows carry no usable name.
pub const UNKNOWN_PLAYER: &str = "Unknown";

/// RAPM coefficients for one season.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonRapm {
    pub season: String,
    pub players: Vec<PlayerRapm>,
    pub team_games: usize,
}

/// Per player-season RAPM: `player_id`, `season`, `rapm`, `team_games`.
/// Display names come from [`name_table`].
#[derive(Clone, Deref)]
pub struct RapmDf(DataFrame);

impl RapmDf {
    pub fn from_seasons(seasons: &[SeasonRapm]) -> Result<Self> {
        let rows = seasons
            .iter()
            .flat_map(|s| s.players.iter().map(move |p| (s, p)));

        let mut player_ids = Vec::new();
        let mut labels = Vec::new();
        let mut values = Vec::new();
        let mut team_games = Vec::new();
        for (season, player) in rows {
            player_ids.push(player.player_id.clone());
            labels.push(season.season.clone());
            values.push(player.rapm);
            team_games.push(season.team_games as u32);
        }

        let df = df!(
            PLAYER_ID => player_ids,
            SEASON => labels,
            RAPM => values,
            TEAM_GAMES => team_games
        )?;
        Ok(RapmDf(df))
    }

    pub fn into_inner(self) -> DataFrame {
        self.0
    }
}

/// Most frequent non-blank name; ties go to the name seen first.
pub fn resolve_name<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for name in names.into_iter().flatten() {
        if name.trim().is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(seen, _)| *seen == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (name, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((name, count));
        }
    }
    best.map_or_else(|| UNKNOWN_PLAYER.to_string(), |(name, _)| name.to_string())
}

/// Resolves one display name per player id.
pub fn player_names(rows: &[PlayerGame]) -> BTreeMap<String, String> {
    let mut by_player: BTreeMap<&str, Vec<Option<&str>>> = BTreeMap::new();
    for row in rows {
        by_player
            .entry(row.player_id.as_str())
            .or_default()
            .push(row.player_name.as_deref());
    }
    by_player
        .into_iter()
        .map(|(player, names)| (player.to_string(), resolve_name(names)))
        .collect()
}

/// Resolves one display name per (player, season) as a `player_id`, `season`,
/// `player_name` table.
pub fn name_table(rows: &[PlayerGame]) -> Result<DataFrame> {
    let mut by_season: BTreeMap<&str, Vec<PlayerGame>> = BTreeMap::new();
    for row in rows {
        by_season
            .entry(row.season.as_str())
            .or_default()
            .push(row.clone());
    }

    let mut player_ids = Vec::new();
    let mut seasons = Vec::new();
    let mut names = Vec::new();
    for (season, season_rows) in by_season {
        for (player, name) in player_names(&season_rows) {
            player_ids.push(player);
            seasons.push(season.to_string());
            names.push(name);
        }
    }

    let df = df!(
        PLAYER_ID => player_ids,
        SEASON => seasons,
        PLAYER_NAME => names
    )?;
    Ok(df)
}

/// Runs the regression for one season's eligible rows.
///
/// Returns `None` when there is nothing to fit, so callers can skip the
/// season.
pub fn rapm_for_season(
    season: &str,
    rows: &[PlayerGame],
    config: &RapmConfig,
) -> Result<Option<SeasonRapm>> {
    if rows.is_empty() {
        log::warn!("{season}: no usable rows, skipping");
        return Ok(None);
    }

    let team_games = team_game::aggregate(rows, config.net_rating_winsor);
    let design = DesignMatrix::build(rows, &team_games);
    if design.is_empty() {
        log::warn!("{season}: empty design matrix, skipping");
        return Ok(None);
    }

    let (n_rows, n_players) = design.shape();
    log::info!("{season}: solving {n_rows} team-games x {n_players} players");
    let players = ridge::fit(&design, &team_games, config.lambda, config.rapm_winsor)?;

    Ok(Some(SeasonRapm {
        season: season.to_string(),
        players,
        team_games: team_games.len(),
    }))
}

/// Fits every season independently and stacks the results in season order.
/// Rows below the minutes floors are dropped first, and seasons left without
/// usable data are skipped.
pub fn rapm_by_season(games: &GameRowsDf, config: &RapmConfig) -> Result<RapmDf> {
    log::trace!("rapm::rapm_by_season");
    let seasons = games.seasons()?;
    log::debug!("RAPM seasons: {}", seasons.join(", "));

    let results = seasons
        .par_iter()
        .map(|season| {
            let filter = GameFilter::new()
                .season(season)
                .min_minutes(config.min_player_minutes)
                .min_team_minutes(config.min_team_minutes)
                .build();
            let rows = games.clone().filter(filter)?.player_games()?;
            rapm_for_season(season, &rows, config)
        })
        .collect::<Result<Vec<_>>>()?;

    let fitted: Vec<SeasonRapm> = results.into_iter().flatten().collect();
    log::info!("RAPM computed for {} of {} seasons", fitted.len(), seasons.len());
    RapmDf::from_seasons(&fitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn row(game: &str, team: &str, player: &str, name: Option<&str>, minutes: f64) -> PlayerGame {
        PlayerGame {
            player_id: player.to_string(),
            player_name: name.map(str::to_string),
            team_id: team.to_string(),
            game_id: game.to_string(),
            game_date: "2021-02-01".to_string(),
            season: "2020-21".to_string(),
            minutes,
            team_minutes: 240.0,
            plus_minus_team: Some(if team == "A" { 6.0 } else { -6.0 }),
        }
    }

    #[test]
    fn name_vote_prefers_majority_then_first_seen() {
        assert_eq!(
            resolve_name([Some("B. Smith"), Some("Bo Smith"), Some("Bo Smith")]),
            "Bo Smith"
        );
        assert_eq!(resolve_name([Some("Jr"), Some("Sr"), Some("Sr"), Some("Jr")]), "Jr");
        assert_eq!(resolve_name([None, Some("  "), None]), UNKNOWN_PLAYER);
        assert_eq!(resolve_name(std::iter::empty()), UNKNOWN_PLAYER);
    }

    #[test]
    fn empty_season_is_skipped() {
        let config = Config::lite().rapm;
        assert_eq!(rapm_for_season("2020-21", &[], &config).unwrap(), None);
    }

    #[test]
    fn season_fit_reports_players() {
        let config = Config::lite().rapm;
        let rows = vec![
            row("g1", "A", "p1", Some("Ann"), 30.0),
            row("g1", "A", "p2", None, 30.0),
            row("g1", "B", "p3", Some("Cy"), 30.0),
        ];
        let fit = rapm_for_season("2020-21", &rows, &config).unwrap().unwrap();
        assert_eq!(fit.team_games, 2);
        let ids: Vec<&str> = fit.players.iter().map(|p| p.player_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);

        let df = RapmDf::from_seasons(&[fit]).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.get_column_names(), vec![PLAYER_ID, SEASON, RAPM, TEAM_GAMES]);
    }

    #[test]
    fn minutes_floors_apply_before_fitting() {
        let df = df!(
            "player_id" => &["p1", "p3", "p4", "p1", "p3"],
            "player_name" => &["Ann", "Cy", "Di", "Ann", "Cy"],
            "team_id" => &["A", "B", "B", "A", "B"],
            "game_id" => &["g1", "g1", "g1", "g0", "g0"],
            "game_date" => &["2021-01-05", "2021-01-05", "2021-01-05", "2019-11-02", "2019-11-02"],
            "minutes" => &[30.0, 30.0, 1.0, 2.0, 3.0],
            "team_minutes" => &[240.0, 240.0, 240.0, 240.0, 240.0],
            "plus_minus_team" => &[6.0, -6.0, -6.0, 4.0, -4.0]
        )
        .unwrap();
        let games = GameRowsDf::new(df, crate::season::DEFAULT_CUTOVER_MONTH).unwrap();
        assert_eq!(games.seasons().unwrap(), vec!["2019-20", "2020-21"]);

        let rapm = rapm_by_season(&games, &Config::lite().rapm).unwrap();
        let ids: Vec<Option<&str>> = rapm.column(PLAYER_ID).unwrap().str().unwrap().into_iter().collect();
        let seasons: Vec<Option<&str>> = rapm.column(SEASON).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some("p1"), Some("p3")]);
        assert_eq!(seasons, vec![Some("2020-21"), Some("2020-21")]);
    }

    #[test]
    fn names_resolve_per_season() {
        let mut rows = vec![
            row("g1", "A", "p1", Some("Ann"), 30.0),
            row("g2", "A", "p1", Some("Anne"), 30.0),
            row("g3", "A", "p1", Some("Anne"), 30.0),
        ];
        rows[0].season = "2019-20".to_string();
        let names = name_table(&rows).unwrap();
        assert_eq!(names.height(), 2);
        let resolved: Vec<Option<&str>> = names.column(PLAYER_NAME).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(resolved, vec![Some("Ann"), Some("Anne")]);
    }
}
