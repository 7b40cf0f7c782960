use crate::{config::Winsor, games::PlayerGame, stats};
use std::collections::BTreeMap;

/// Regulation game length; net ratings are expressed per 48 minutes.
pub const GAME_MINUTES: f64 = 48.0;

/// One team's participation in one game.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamGame {
    pub key: String,
    pub game_id: String,
    pub team_id: String,
    pub team_minutes: f64,
    pub plus_minus: f64,
    pub net_rating: f64,
}

pub fn team_game_key(game_id: &str, team_id: &str) -> String {
    format!("{game_id}_{team_id}")
}

/// Point differential per 48 minutes of team playing time. Team minutes are
/// summed over all five floor slots, so a regulation game has 240.
pub fn net_rating(plus_minus: f64, team_minutes: f64) -> f64 {
    plus_minus / (team_minutes / GAME_MINUTES)
}

/// Collapses player rows into one row per (game, team), ordered by game then
/// team id.
///
/// The first row of each group supplies the team fields. Groups without
/// positive team minutes or without a point differential are dropped. When
/// `winsor` is set, net ratings are clipped to the season's percentile bounds.
pub fn aggregate(rows: &[PlayerGame], winsor: Option<Winsor>) -> Vec<TeamGame> {
    let mut groups: BTreeMap<(&str, &str), &PlayerGame> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.game_id.as_str(), row.team_id.as_str()))
            .or_insert(row);
    }

    let mut team_games: Vec<TeamGame> = groups
        .into_iter()
        .filter(|(_, first)| first.team_minutes > 0.0)
        .filter_map(|((game_id, team_id), first)| {
            let plus_minus = first.plus_minus_team.filter(|pm| pm.is_finite())?;
            Some(TeamGame {
                key: team_game_key(game_id, team_id),
                game_id: game_id.to_string(),
                team_id: team_id.to_string(),
                team_minutes: first.team_minutes,
                plus_minus,
                net_rating: net_rating(plus_minus, first.team_minutes),
            })
        })
        .collect();

    if let Some(winsor) = winsor {
        let bounds = stats::winsor_bounds(team_games.iter().map(|tg| &tg.net_rating), winsor);
        if let Some((lo, hi)) = bounds {
            for tg in &mut team_games {
                tg.net_rating = tg.net_rating.clamp(lo, hi);
            }
        }
    }

    log::debug!(
        "{} team-games from {} player rows",
        team_games.len(),
        rows.len()
    );
    team_games
}
