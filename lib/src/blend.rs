use crate::{
    config::{BlendConfig, Config},
    filter::GameFilter,
    games::{PLAYER_ID, PLAYER_NAME, SEASON},
    rapm::{RapmDf, RAPM},
    season::Season,
    standardize::standardize,
    talent::{BoxSeasonDf, BOX_DEFENSE, BOX_OFFENSE, BOX_TOTAL, GAMES, SEASON_MINUTES},
    Result,
};
use derive_deref::Deref;
use polars::prelude::*;
use std::path::Path;

pub const BOX_Z: &str = "box_z";
pub const RAPM_Z: &str = "rapm_z";
pub const BLEND_Z: &str = "blend_z";
pub const DPM: &str = "dpm";

pub const OUTPUT_COLUMNS: [&str; 12] = [
    PLAYER_ID,
    PLAYER_NAME,
    SEASON,
    SEASON_MINUTES,
    GAMES,
    BOX_OFFENSE,
    BOX_DEFENSE,
    BOX_TOTAL,
    RAPM,
    BOX_Z,
    RAPM_Z,
    DPM,
];

/// Scalar form of [`rating_expr`].
pub fn rating(box_z: f64, rapm_z: f64, blend: &BlendConfig) -> f64 {
    let blended = blend.box_weight * box_z + blend.rapm_weight * rapm_z;
    (blended * blend.scale).clamp(blend.min_rating, blend.max_rating)
}

fn blend_z_expr(blend: &BlendConfig) -> Expr {
    lit(blend.box_weight) * col(BOX_Z) + lit(blend.rapm_weight) * col(RAPM_Z)
}

/// Scaled blend of the two z-scores, clamped to the rating bounds.
pub fn rating_expr(blend: &BlendConfig) -> Expr {
    let scaled = col(BLEND_Z) * lit(blend.scale);
    when(scaled.clone().lt(lit(blend.min_rating)))
        .then(lit(blend.min_rating))
        .when(scaled.clone().gt(lit(blend.max_rating)))
        .then(lit(blend.max_rating))
        .otherwise(scaled)
}

/// Final per player-season ratings, sorted by season then rating.
#[derive(Clone, Deref)]
pub struct RatingsDf(DataFrame);

impl RatingsDf {
    /// Highest `n` ratings across all seasons in the table.
    pub fn top(&self, n: usize) -> Result<DataFrame> {
        let df = self
            .0
            .clone()
            .lazy()
            .sort(
                [DPM],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .limit(n as IdxSize)
            .collect()?;
        Ok(df)
    }

    /// Ratings for a single season. Accepts `"2020-21"` or a bare `"2020"`.
    pub fn season(&self, season: &str) -> Result<Self> {
        let label = season.parse::<Season>()?.to_string();
        let filter = GameFilter::new().season(&label).build();
        let df = self.0.clone().lazy().filter(filter).collect()?;
        Ok(RatingsDf(df))
    }

    /// Writes CSV or Parquet, chosen by extension.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut df = self.0.clone();
        crate::write_table(&mut df, path)
    }

    pub fn into_inner(self) -> DataFrame {
        self.0
    }
}

/// Joins box talent and RAPM per player-season, attaches display names,
/// standardizes both signals within season, and blends them into `dpm`.
///
/// A player-season missing either signal still gets a rating; the absent
/// component scores 0.
pub fn assemble(
    box_df: BoxSeasonDf,
    rapm_df: RapmDf,
    names: DataFrame,
    config: &Config,
) -> Result<RatingsDf> {
    log::trace!("blend::assemble");
    let keys = [PLAYER_ID, SEASON];
    let full = JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns);
    let left = JoinArgs::new(JoinType::Left).with_coalesce(JoinCoalesce::CoalesceColumns);

    let merged = box_df
        .into_inner()
        .join(&rapm_df, keys, keys, full)?
        .join(&names, keys, keys, left)?;
    log::debug!("{} player-seasons after merging box and RAPM", merged.height());

    let qualification = config.qualification.as_ref();
    let merged = standardize(merged, BOX_TOTAL, SEASON, BOX_Z, qualification)?;
    let merged = standardize(merged, RAPM, SEASON, RAPM_Z, qualification)?;

    let df = merged
        .lazy()
        .with_column(blend_z_expr(&config.blend).alias(BLEND_Z))
        .with_column(rating_expr(&config.blend).alias(DPM))
        .sort(
            [SEASON, DPM],
            SortMultipleOptions::default()
                .with_order_descending_multi([false, true])
                .with_maintain_order(true),
        )
        .select(OUTPUT_COLUMNS.map(col))
        .collect()?;

    log::info!("Rated {} player-seasons", df.height());
    Ok(RatingsDf(df))
}
