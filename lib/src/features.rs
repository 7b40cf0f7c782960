//! Derivation of per-100-possession and shooting-efficiency statistics from
//! raw box-score counts, for tables that don't already carry them.

use crate::{
    games::{MINUTES, TEAM_MINUTES},
    require_columns, str_values, Result, TrackedStat,
};
use polars::prelude::*;

pub const TEAM_POSSESSIONS: &str = "team_possessions";
pub const PLAYER_POSSESSIONS: &str = "player_possessions";

/// Counting columns needed by [`derive_features`], besides `minutes`.
pub const RAW_COLUMNS: [&str; 15] = [
    "pts",
    "reb",
    "ast",
    "stl",
    "blk",
    "to",
    "fgm",
    "fga",
    "fg3m",
    "fta",
    "plus_minus",
    "fga_team",
    "fta_team",
    "oreb_team",
    "tov_team",
];

const PER100_COUNTS: [(&str, TrackedStat); 7] = [
    ("pts", TrackedStat::PtsPer100),
    ("reb", TrackedStat::RebPer100),
    ("ast", TrackedStat::AstPer100),
    ("stl", TrackedStat::StlPer100),
    ("blk", TrackedStat::BlkPer100),
    ("to", TrackedStat::ToPer100),
    ("plus_minus", TrackedStat::PmPer100),
];

/// Parses box-score minutes: `"MM:SS"`, `"MM:SS:00"` or a plain number.
/// Blank, `DNP` and unparseable values are missing.
pub fn parse_minutes(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("dnp") {
        return None;
    }
    let mut parts = raw.split(':');
    let minutes = match (parts.next(), parts.next()) {
        (Some(m), Some(s)) => m.parse::<f64>().ok()? + s.parse::<f64>().ok()? / 60.0,
        (Some(m), None) => m.parse::<f64>().ok()?,
        _ => return None,
    };
    Some(minutes).filter(|m| m.is_finite())
}

/// Converts textual `minutes` / `team_minutes` columns to numbers in place.
pub fn parse_minutes_columns(mut df: DataFrame) -> Result<DataFrame> {
    for name in [MINUTES, TEAM_MINUTES] {
        let is_text = df
            .column(name)
            .map(|s| s.dtype() == &DataType::String)
            .unwrap_or(false);
        if is_text {
            let parsed: Vec<Option<f64>> = str_values(&df, name)?
                .iter()
                .map(|v| v.as_deref().and_then(parse_minutes))
                .collect();
            df.with_column(Series::new(name, parsed))?;
        }
    }
    Ok(df)
}

/// Adds the tracked per-100 and shooting columns to a raw box-score table.
///
/// Possessions are estimated from team totals and prorated by minutes.
/// Rows without playing time or possessions are dropped, and ratios with a
/// zero denominator are null rather than infinite.
pub fn derive_features(df: DataFrame) -> Result<DataFrame> {
    log::trace!("features::derive_features");
    require_columns(&df, RAW_COLUMNS.iter().copied().chain([MINUTES]))?;
    let df = parse_minutes_columns(df)?;

    let casts: Vec<Expr> = RAW_COLUMNS
        .iter()
        .chain(&[MINUTES])
        .map(|c| col(c).cast(DataType::Float64))
        .collect();

    let team_possessions =
        col("fga_team") + lit(0.4) * col("fta_team") - col("oreb_team") + col("tov_team");

    let mut derived: Vec<Expr> = PER100_COUNTS
        .iter()
        .map(|(raw, stat)| {
            ratio(col(raw) * lit(100.0), col(PLAYER_POSSESSIONS)).alias(&stat.to_string())
        })
        .collect();
    derived.push(
        ratio(col("fgm") + lit(0.5) * col("fg3m"), col("fga"))
            .alias(&TrackedStat::EfgPctCalc.to_string()),
    );
    derived.push(
        ratio(col("pts"), lit(2.0) * (col("fga") + lit(0.44) * col("fta")))
            .alias(&TrackedStat::TsPctCalc.to_string()),
    );

    let df = df
        .lazy()
        .with_columns(casts)
        .with_column(team_possessions.alias(TEAM_POSSESSIONS))
        .with_column((col(TEAM_POSSESSIONS) * col(MINUTES) / lit(48.0)).alias(PLAYER_POSSESSIONS))
        .filter(
            col(MINUTES)
                .gt(lit(0.0))
                .and(col(PLAYER_POSSESSIONS).gt(lit(0.0))),
        )
        .with_columns(derived)
        .collect()?;

    log::debug!("{} rows with derived features", df.height());
    Ok(df)
}

fn ratio(numerator: Expr, denominator: Expr) -> Expr {
    when(denominator.clone().eq(lit(0.0)))
        .then(lit(NULL))
        .otherwise(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_strings_parse() {
        assert_eq!(parse_minutes("36:30"), Some(36.5));
        assert_eq!(parse_minutes("12:00:00"), Some(12.0));
        assert_eq!(parse_minutes("24.25"), Some(24.25));
        assert_eq!(parse_minutes("DNP"), None);
        assert_eq!(parse_minutes(" "), None);
        assert_eq!(parse_minutes("n/a"), None);
    }

    #[test]
    fn text_minutes_columns_become_numeric() {
        let df = df!(
            "minutes" => &["30:00", "DNP"],
            "team_minutes" => &[240.0, 240.0]
        )
        .unwrap();
        let df = parse_minutes_columns(df).unwrap();
        let minutes: Vec<Option<f64>> = df.column("minutes").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(minutes, vec![Some(30.0), None]);
    }

    #[test]
    fn per100_and_shooting_columns_are_derived() {
        let df = df!(
            "minutes" => &[24.0, 10.0, 0.0],
            "pts" => &[20.0, 0.0, 0.0],
            "reb" => &[5.0, 1.0, 0.0],
            "ast" => &[4.0, 0.0, 0.0],
            "stl" => &[1.0, 0.0, 0.0],
            "blk" => &[0.0, 1.0, 0.0],
            "to" => &[2.0, 0.0, 0.0],
            "fgm" => &[8.0, 0.0, 0.0],
            "fga" => &[16.0, 0.0, 0.0],
            "fg3m" => &[2.0, 0.0, 0.0],
            "fta" => &[4.0, 0.0, 0.0],
            "plus_minus" => &[6.0, -2.0, 0.0],
            "fga_team" => &[85.0, 85.0, 85.0],
            "fta_team" => &[20.0, 20.0, 20.0],
            "oreb_team" => &[10.0, 10.0, 10.0],
            "tov_team" => &[13.0, 13.0, 13.0]
        )
        .unwrap();
        let out = derive_features(df).unwrap();
        assert_eq!(out.height(), 2);

        // 85 + 8 - 10 + 13 = 96 team possessions, half of them for 24 minutes.
        let pts: Vec<Option<f64>> = out.column("pts_per100").unwrap().f64().unwrap().into_iter().collect();
        assert!((pts[0].unwrap() - 20.0 / 48.0 * 100.0).abs() < 1e-9);

        let efg: Vec<Option<f64>> = out.column("efg_pct_calc").unwrap().f64().unwrap().into_iter().collect();
        assert!((efg[0].unwrap() - 9.0 / 16.0).abs() < 1e-12);
        assert_eq!(efg[1], None);

        let ts: Vec<Option<f64>> = out.column("ts_pct_calc").unwrap().f64().unwrap().into_iter().collect();
        assert!((ts[0].unwrap() - 20.0 / (2.0 * 17.76)).abs() < 1e-12);
        assert_eq!(ts[1], None);
    }

    #[test]
    fn raw_columns_are_required() {
        let df = df!("minutes" => &[30.0]).unwrap();
        assert!(matches!(
            derive_features(df),
            Err(crate::Error::MissingColumns(_))
        ));
    }
}
