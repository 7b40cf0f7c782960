use crate::games::{MINUTES, SEASON, TEAM_MINUTES};
use polars::prelude::*;

/// Builds a row predicate over game tables by AND-ing conditions together.
#[derive(Clone, Default)]
pub struct GameFilter {
    filter_expr: Option<Expr>,
}

impl GameFilter {
    pub fn new() -> Self {
        Self { filter_expr: None }
    }

    pub fn season(self, season: &str) -> Self {
        let expr = col(SEASON).eq(lit(season));
        self.extend_filter(expr)
    }

    pub fn min_minutes(self, floor: f64) -> Self {
        let expr = col(MINUTES).gt_eq(lit(floor));
        self.extend_filter(expr)
    }

    pub fn min_team_minutes(self, floor: f64) -> Self {
        let expr = col(TEAM_MINUTES).gt_eq(lit(floor));
        self.extend_filter(expr)
    }

    // AND with any existing condition
    fn extend_filter(mut self, new_expr: Expr) -> Self {
        self.filter_expr = match self.filter_expr.take() {
            Some(existing_expr) => Some(existing_expr.and(new_expr)),
            None => Some(new_expr),
        };
        self
    }

    // Matches every row when empty
    pub fn build(self) -> Expr {
        self.filter_expr.unwrap_or_else(|| lit(true))
    }
}
