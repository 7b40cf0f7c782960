use crate::{
    games::PlayerGame,
    team_game::{team_game_key, TeamGame},
};
use nalgebra::DMatrix;
use std::collections::{BTreeSet, HashMap};

/// Guard on the sum of minute shares in one team-game; five players share the
/// floor, so anything well above 5 means corrupted minutes.
pub const MAX_ROW_SHARE: f64 = 5.5;

/// Fraction of the team's playing time a player was on the floor, in [0, 1].
pub fn minute_share(minutes: f64, team_minutes: f64) -> f64 {
    let share = minutes / team_minutes;
    if share.is_finite() {
        share.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Team-game by player matrix of minute shares for one season.
///
/// Rows follow the team-game table positionally; columns are player ids in
/// ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    row_keys: Vec<String>,
    players: Vec<String>,
    values: DMatrix<f64>,
}

impl DesignMatrix {
    /// Rows whose team-game is not in `team_games` are ignored; repeated
    /// (team-game, player) rows have their shares summed.
    pub fn build(rows: &[PlayerGame], team_games: &[TeamGame]) -> Self {
        let row_index: HashMap<&str, usize> = team_games
            .iter()
            .enumerate()
            .map(|(i, tg)| (tg.key.as_str(), i))
            .collect();

        let cells: Vec<(usize, &str, f64)> = rows
            .iter()
            .filter_map(|row| {
                let key = team_game_key(&row.game_id, &row.team_id);
                let r = *row_index.get(key.as_str())?;
                Some((
                    r,
                    row.player_id.as_str(),
                    minute_share(row.minutes, row.team_minutes),
                ))
            })
            .collect();

        let players: Vec<String> = cells
            .iter()
            .map(|(_, player, _)| *player)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let col_index: HashMap<&str, usize> = players
            .iter()
            .enumerate()
            .map(|(c, p)| (p.as_str(), c))
            .collect();

        let mut values = DMatrix::zeros(team_games.len(), players.len());
        for (r, player, share) in cells {
            values[(r, col_index[player])] += share;
        }

        DesignMatrix {
            row_keys: team_games.iter().map(|tg| tg.key.clone()).collect(),
            players,
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0 || self.values.ncols() == 0
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    pub fn row_keys(&self) -> &[String] {
        &self.row_keys
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Sum of minute shares per team-game row.
    pub fn row_share_sums(&self) -> Vec<f64> {
        self.values.row_iter().map(|row| row.sum()).collect()
    }
}
