//! Minutes-weighted ridge regression of team net rating on player minute
//! shares.
//!
//! Rows are scaled by `sqrt(w_i)` and the penalized normal equations
//!
//! ```text
//! (XᵀX + λI) β = Xᵀy
//! ```
//!
//! are solved directly with a Cholesky factorization. With λ > 0 the system
//! matrix is positive definite even when X is column-rank-deficient, e.g. two
//! players who always share the floor. When λ is too small for that to hold
//! in floating point, the solve falls back to an SVD pseudo-inverse.

use crate::{
    config::Winsor,
    design::DesignMatrix,
    error::Error,
    stats,
    team_game::{TeamGame, GAME_MINUTES},
    Result,
};
use nalgebra::{DMatrix, DVector};

/// Singular value cutoffs tried in order by the SVD fallback.
const SVD_TOLERANCES: [f64; 3] = [1e-10, 1e-8, 1e-6];

/// Regression coefficient for one player in one season.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRapm {
    pub player_id: String,
    pub rapm: f64,
}

/// Observation weights `sqrt(team_minutes / 48)`, favoring team-games with
/// more court time.
pub fn weights(team_games: &[TeamGame]) -> DVector<f64> {
    DVector::from_iterator(
        team_games.len(),
        team_games
            .iter()
            .map(|tg| (tg.team_minutes / GAME_MINUTES).sqrt()),
    )
}

/// Solves the weighted ridge system for β.
pub fn solve(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    weights: &DVector<f64>,
    lambda: f64,
) -> Result<DVector<f64>> {
    if !(lambda.is_finite() && lambda > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "ridge penalty must be positive, got {lambda}"
        )));
    }
    if x.nrows() != y.len() || y.len() != weights.len() {
        return Err(Error::Shape(format!(
            "design has {} rows, response {} and weights {}",
            x.nrows(),
            y.len(),
            weights.len()
        )));
    }

    let mut xw = x.clone();
    for (i, w) in weights.iter().enumerate() {
        xw.row_mut(i).scale_mut(*w);
    }
    let yw = y.component_mul(weights);

    let mut gram = xw.tr_mul(&xw);
    for j in 0..gram.ncols() {
        gram[(j, j)] += lambda;
    }
    let rhs = xw.tr_mul(&yw);

    if let Some(cholesky) = gram.clone().cholesky() {
        return Ok(cholesky.solve(&rhs));
    }

    log::debug!("Cholesky failed with lambda {lambda}, falling back to SVD");
    let svd = gram.svd(true, true);
    for tol in SVD_TOLERANCES {
        if let Ok(beta) = svd.solve(&rhs, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Ok(beta);
            }
        }
    }
    Err(Error::Solver(
        "normal equations have no finite solution".to_string(),
    ))
}

/// Fits one season: regresses the team-games' net ratings on the design
/// matrix, optionally clipping the coefficients to their percentile bounds.
pub fn fit(
    design: &DesignMatrix,
    team_games: &[TeamGame],
    lambda: f64,
    winsor: Option<Winsor>,
) -> Result<Vec<PlayerRapm>> {
    let y = DVector::from_iterator(team_games.len(), team_games.iter().map(|tg| tg.net_rating));
    let beta = solve(design.values(), &y, &weights(team_games), lambda)?;

    let mut coefficients: Vec<f64> = beta.iter().copied().collect();
    if let Some(winsor) = winsor {
        stats::winsorize(&mut coefficients, winsor);
    }

    Ok(design
        .players()
        .iter()
        .zip(coefficients)
        .map(|(player_id, rapm)| PlayerRapm {
            player_id: player_id.clone(),
            rapm,
        })
        .collect())
}
