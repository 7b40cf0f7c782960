use crate::{config::Qualification, f64_values, stats::PoolStats, str_values, Result};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Z-scores for one group.
///
/// Mean and population std come from the present values of `qualified` rows,
/// or from the whole group when no row qualifies. Missing values score 0, as
/// does every row when the pool has no spread.
pub fn zscores(values: &[Option<f64>], qualified: &[bool]) -> Vec<f64> {
    let pooled = |only_qualified: bool| {
        PoolStats::from_values(
            values
                .iter()
                .zip(qualified)
                .filter(|(_, q)| !only_qualified || **q)
                .filter_map(|(v, _)| *v),
        )
    };
    let pool = pooled(true).or_else(|| pooled(false));

    values
        .iter()
        .map(|value| match (value, &pool) {
            (Some(v), Some(pool)) if v.is_finite() => pool.zscore(*v),
            _ => 0.0,
        })
        .collect()
}

/// Adds `out_col` holding `value_col` standardized within each `group_col`
/// group. Row order is preserved.
pub fn standardize(
    df: DataFrame,
    value_col: &str,
    group_col: &str,
    out_col: &str,
    qualification: Option<&Qualification>,
) -> Result<DataFrame> {
    log::trace!("standardize::standardize {value_col} -> {out_col}");
    let values = f64_values(&df, value_col)?;
    let groups = str_values(&df, group_col)?;
    let qualified: Vec<bool> = match qualification {
        Some(q) => f64_values(&df, &q.column)?
            .into_iter()
            .map(|v| v.is_some_and(|v| v >= q.min))
            .collect(),
        None => vec![true; df.height()],
    };

    let mut members: BTreeMap<Option<&str>, Vec<usize>> = BTreeMap::new();
    for (i, group) in groups.iter().enumerate() {
        members.entry(group.as_deref()).or_default().push(i);
    }

    let mut out = vec![0.0; df.height()];
    for (group, rows) in members {
        let group_values: Vec<Option<f64>> = rows.iter().map(|&i| values[i]).collect();
        let group_qualified: Vec<bool> = rows.iter().map(|&i| qualified[i]).collect();
        if !group_qualified.iter().any(|q| *q) {
            log::debug!(
                "{}: no qualifying rows for {value_col}, using the full group",
                group.unwrap_or("<none>")
            );
        }
        for (i, z) in rows.iter().zip(zscores(&group_values, &group_qualified)) {
            out[*i] = z;
        }
    }

    let mut df = df;
    df.with_column(Series::new(out_col, out))?;
    Ok(df)
}
