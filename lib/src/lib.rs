use parse_display::{Display, FromStr};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod blend;
pub mod config;
pub mod design;
mod error;
pub mod features;
pub mod filter;
pub mod games;
pub mod pipeline;
pub mod rapm;
pub mod ridge;
pub mod season;
pub mod standardize;
pub mod stats;
pub mod talent;
pub mod team_game;

pub use blend::RatingsDf;
pub use config::{Config, Preset};
pub use error::Error;
pub use games::GameRowsDf;
pub use season::Season;

type Result<T> = std::result::Result<T, error::Error>;

/// Per-100-possession box statistics smoothed into talent estimates.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    FromStr,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TrackedStat {
    #[display("pts_per100")]
    PtsPer100,
    #[display("reb_per100")]
    RebPer100,
    #[display("ast_per100")]
    AstPer100,
    #[display("stl_per100")]
    StlPer100,
    #[display("blk_per100")]
    BlkPer100,
    #[display("to_per100")]
    ToPer100,
    #[display("ts_pct_calc")]
    TsPctCalc,
    #[display("efg_pct_calc")]
    EfgPctCalc,
    #[display("pm_per100")]
    PmPer100,
}

impl TrackedStat {
    pub const ALL: [TrackedStat; 9] = [
        TrackedStat::PtsPer100,
        TrackedStat::RebPer100,
        TrackedStat::AstPer100,
        TrackedStat::StlPer100,
        TrackedStat::BlkPer100,
        TrackedStat::ToPer100,
        TrackedStat::TsPctCalc,
        TrackedStat::EfgPctCalc,
        TrackedStat::PmPer100,
    ];

    /// League-typical value used to fill games where the stat is undefined
    /// (e.g. no shot attempts).
    pub fn prior(self) -> Option<f64> {
        match self {
            TrackedStat::TsPctCalc => Some(0.54),
            TrackedStat::EfgPctCalc => Some(0.52),
            TrackedStat::PmPer100 => Some(0.0),
            _ => None,
        }
    }

    pub fn fast_column(self) -> String {
        format!("{self}_fast")
    }

    pub fn slow_column(self) -> String {
        format!("{self}_slow")
    }

    pub fn talent_column(self) -> String {
        format!("{self}_talent")
    }
}

pub fn load_parquet<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let mut file = std::fs::File::open(path)?;
    let df = ParquetReader::new(&mut file).finish()?;
    Ok(df)
}

pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Loads a CSV or Parquet table, picked by file extension.
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("csv") => load_csv(path),
        Some("parquet") | Some("pq") => load_parquet(path),
        _ => Err(Error::UnsupportedFormat(path.display().to_string())),
    }
}

pub fn write_table<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("csv") => {
            let mut file = std::fs::File::create(path)?;
            CsvWriter::new(&mut file).include_header(true).finish(df)?;
        }
        Some("parquet") | Some("pq") => {
            let mut file = std::fs::File::create(path)?;
            ParquetWriter::new(&mut file).finish(df)?;
        }
        _ => return Err(Error::UnsupportedFormat(path.display().to_string())),
    }
    log::debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub(crate) fn require_columns<'a, I>(df: &DataFrame, required: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let present = df.get_column_names();
    let missing: Vec<String> = required
        .into_iter()
        .filter(|name| !present.contains(name))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingColumns(missing))
    }
}

pub(crate) fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

pub(crate) fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_stat_names_match_columns() {
        assert_eq!(TrackedStat::PtsPer100.to_string(), "pts_per100");
        assert_eq!(TrackedStat::TsPctCalc.talent_column(), "ts_pct_calc_talent");
        assert_eq!("to_per100".parse::<TrackedStat>().unwrap(), TrackedStat::ToPer100);
        let json = serde_json::to_string(&TrackedStat::EfgPctCalc).unwrap();
        assert_eq!(json, "\"efg_pct_calc\"");
    }

    #[test]
    fn require_columns_lists_every_missing_name() {
        let df = df!("a" => &[1.0], "b" => &[2.0]).unwrap();
        assert!(require_columns(&df, ["a", "b"]).is_ok());
        match require_columns(&df, ["a", "c", "d"]) {
            Err(Error::MissingColumns(missing)) => assert_eq!(missing, vec!["c", "d"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            load_table("games.xlsx"),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
