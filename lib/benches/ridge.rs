use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dpm::{
    design::DesignMatrix,
    games::PlayerGame,
    ridge,
    team_game::{self, TeamGame},
};

/// A synthetic season: 30 teams of 12 players, 80 games each.
fn season() -> (Vec<PlayerGame>, Vec<TeamGame>) {
    let mut rows = Vec::new();
    for game in 0..1200 {
        let home = game % 30;
        let away = (game * 7 + 1) % 30;
        for (team, margin) in [(home, (game % 21) as f64 - 10.0), (away, 10.0 - (game % 21) as f64)] {
            for slot in 0..12 {
                let minutes = if slot < 8 { 30.0 - slot as f64 } else { 0.0 };
                rows.push(PlayerGame {
                    player_id: format!("p{team:02}{slot:02}"),
                    player_name: None,
                    team_id: format!("t{team:02}"),
                    game_id: format!("g{game:04}"),
                    game_date: "2021-01-01".to_string(),
                    season: "2020-21".to_string(),
                    minutes,
                    team_minutes: 240.0,
                    plus_minus_team: Some(margin),
                });
            }
        }
    }
    let team_games = team_game::aggregate(&rows, None);
    (rows, team_games)
}

fn bench_design(c: &mut Criterion) {
    let (rows, team_games) = season();
    c.bench_function("design_matrix_build", |b| {
        b.iter(|| black_box(DesignMatrix::build(&rows, &team_games)));
    });
}

fn bench_ridge_fit(c: &mut Criterion) {
    let (rows, team_games) = season();
    let design = DesignMatrix::build(&rows, &team_games);
    c.bench_function("ridge_fit_season", |b| {
        b.iter(|| black_box(ridge::fit(&design, &team_games, 1500.0, None)).unwrap());
    });
}

criterion_group!(benches, bench_design, bench_ridge_fit);
criterion_main!(benches);
