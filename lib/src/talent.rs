//! Dual-rate EWMA smoothing of per-game box statistics into talent
//! estimates, and their collapse into per player-season box components.
//!
//! Each player's sequence is cleaned (non-finite values dropped, priors
//! filled, career outliers clipped), gap-filled, and then folded in game-date
//! order through a fast and a slow exponential average. The published talent
//! is a fixed blend of the two.

use crate::{
    config::{BoxWeights, Smoothing, TalentConfig, Winsor},
    f64_values,
    games::{GameRowsDf, GAME_DATE, GAME_ID, MINUTES, PLAYER_ID, SEASON},
    stats, str_values, Result, TrackedStat,
};
use derive_deref::Deref;
use itertools::Itertools;
use polars::prelude::*;
use rayon::prelude::*;
use std::ops::Range;

pub const BOX_OFFENSE: &str = "box_offense";
pub const BOX_DEFENSE: &str = "box_defense";
pub const BOX_TOTAL: &str = "box_total";
pub const SEASON_MINUTES: &str = "season_minutes";
pub const GAMES: &str = "games";

/// Fast, slow and blended estimates of one statistic, one entry per game.
#[derive(Debug, Clone, PartialEq)]
pub struct TalentSeries {
    pub fast: Vec<f64>,
    pub slow: Vec<f64>,
    pub talent: Vec<f64>,
}

/// Exponential moving average seeded with the first value.
pub fn ewma(values: &[f64], alpha: f64) -> Vec<f64> {
    values
        .iter()
        .scan(None, |prev: &mut Option<f64>, &v| {
            let next = prev.map_or(v, |p| alpha * v + (1.0 - alpha) * p);
            *prev = Some(next);
            Some(next)
        })
        .collect()
}

pub fn smooth(values: &[f64], smoothing: Smoothing, slow_weight: f64, fast_weight: f64) -> TalentSeries {
    let fast = ewma(values, smoothing.alpha_fast);
    let slow = ewma(values, smoothing.alpha_slow);
    let talent = slow
        .iter()
        .zip(&fast)
        .map(|(s, f)| slow_weight * s + fast_weight * f)
        .collect();
    TalentSeries { fast, slow, talent }
}

/// Drops non-finite values, fills gaps with `prior` when there is one, and
/// clips the player's own outliers.
pub fn clean(raw: &[Option<f64>], prior: Option<f64>, winsor: Option<Winsor>) -> Vec<Option<f64>> {
    let mut values: Vec<Option<f64>> = raw
        .iter()
        .map(|v| v.filter(|x| x.is_finite()).or(prior))
        .collect();
    if let Some(winsor) = winsor {
        stats::winsorize_present(&mut values, winsor);
    }
    values
}

/// Forward-fills, then back-fills the leading gap. `None` if nothing is present.
pub fn fill_gaps(values: &[Option<f64>]) -> Option<Vec<f64>> {
    let mut last = values.iter().flatten().next().copied()?;
    Some(
        values
            .iter()
            .map(|v| {
                if let Some(x) = v {
                    last = *x;
                }
                last
            })
            .collect(),
    )
}

/// Talent series for one player's chronologically ordered values of `stat`.
pub fn player_talent(
    raw: &[Option<f64>],
    stat: TrackedStat,
    config: &TalentConfig,
) -> Option<TalentSeries> {
    let smoothing = config.smoothing.get(&stat)?;
    let cleaned = clean(raw, stat.prior(), config.winsor);
    let filled = fill_gaps(&cleaned)?;
    Some(smooth(
        &filled,
        *smoothing,
        config.slow_weight,
        config.fast_weight,
    ))
}

/// Contiguous row ranges sharing a player id.
fn player_spans(ids: &[Option<String>]) -> Vec<Range<usize>> {
    let mut start = 0;
    let chunks = ids.iter().chunk_by(|id| *id);
    let spans = chunks
        .into_iter()
        .map(|(_, group)| {
            let len = group.count();
            let span = start..start + len;
            start += len;
            span
        })
        .collect();
    spans
}

/// Game rows sorted by player and date, with `{stat}_fast`, `{stat}_slow`
/// and `{stat}_talent` columns for every smoothed statistic.
pub fn with_talent(games: &GameRowsDf, config: &TalentConfig) -> Result<DataFrame> {
    log::trace!("talent::with_talent");
    let mut df = games
        .clone()
        .into_inner()
        .lazy()
        .sort(
            [PLAYER_ID, GAME_DATE],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;
    let spans = player_spans(&str_values(&df, PLAYER_ID)?);
    log::debug!("Smoothing {} players over {} games", spans.len(), df.height());

    for stat in config.smoothing.keys() {
        let raw = f64_values(&df, &stat.to_string())?;
        let series: Vec<Option<TalentSeries>> = spans
            .par_iter()
            .map(|span| player_talent(&raw[span.clone()], *stat, config))
            .collect();

        let mut fast = Vec::with_capacity(raw.len());
        let mut slow = Vec::with_capacity(raw.len());
        let mut talent = Vec::with_capacity(raw.len());
        let mut empty = 0;
        for (span, s) in spans.iter().zip(series) {
            match s {
                Some(s) => {
                    fast.extend(s.fast.into_iter().map(Some));
                    slow.extend(s.slow.into_iter().map(Some));
                    talent.extend(s.talent.into_iter().map(Some));
                }
                None => {
                    empty += 1;
                    fast.extend(std::iter::repeat(None).take(span.len()));
                    slow.extend(std::iter::repeat(None).take(span.len()));
                    talent.extend(std::iter::repeat(None).take(span.len()));
                }
            }
        }
        if empty > 0 {
            log::debug!("{stat}: {empty} players have no values");
        }

        df.with_column(Series::new(&stat.fast_column(), fast))?;
        df.with_column(Series::new(&stat.slow_column(), slow))?;
        df.with_column(Series::new(&stat.talent_column(), talent))?;
    }
    Ok(df)
}

fn weighted_talent(terms: &[(TrackedStat, f64)]) -> Expr {
    terms
        .iter()
        .map(|(stat, weight)| col(&stat.talent_column()) * lit(*weight))
        .reduce(|acc, expr| acc + expr)
        .unwrap_or_else(|| lit(0.0))
}

/// Box talent per player-season: season means of the per-game offense,
/// defense and total components, plus minutes played and games.
#[derive(Clone, Deref)]
pub struct BoxSeasonDf(DataFrame);

impl BoxSeasonDf {
    pub fn from_talent(talent: DataFrame, weights: &BoxWeights) -> Result<Self> {
        log::trace!("talent::BoxSeasonDf::from_talent");
        let df = talent
            .lazy()
            .with_columns([
                weighted_talent(&weights.offense).alias(BOX_OFFENSE),
                weighted_talent(&weights.defense).alias(BOX_DEFENSE),
            ])
            .with_column((col(BOX_OFFENSE) + col(BOX_DEFENSE)).alias(BOX_TOTAL))
            .group_by_stable([col(PLAYER_ID), col(SEASON)])
            .agg([
                col(BOX_OFFENSE).mean(),
                col(BOX_DEFENSE).mean(),
                col(BOX_TOTAL).mean(),
                col(MINUTES).sum().alias(SEASON_MINUTES),
                col(GAME_ID).count().alias(GAMES),
            ])
            .collect()?;
        log::debug!("{} player-seasons with box talent", df.height());
        Ok(BoxSeasonDf(df))
    }

    pub fn into_inner(self) -> DataFrame {
        self.0
    }
}
