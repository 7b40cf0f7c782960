use crate::{error::Error, season::DEFAULT_CUTOVER_MONTH, Result, TrackedStat};
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Percentile bounds for clipping outliers, as fractions in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Winsor {
    pub lower: f64,
    pub upper: f64,
}

impl Default for Winsor {
    fn default() -> Self {
        Winsor {
            lower: 0.01,
            upper: 0.99,
        }
    }
}

/// Decay constants for the fast and slow EWMA of one statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Smoothing {
    pub alpha_fast: f64,
    pub alpha_slow: f64,
}

impl Smoothing {
    pub const fn new(alpha_fast: f64, alpha_slow: f64) -> Self {
        Smoothing {
            alpha_fast,
            alpha_slow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RapmConfig {
    /// Ridge penalty added to the diagonal of the normal equations.
    pub lambda: f64,
    pub min_player_minutes: f64,
    pub min_team_minutes: f64,
    pub net_rating_winsor: Option<Winsor>,
    pub rapm_winsor: Option<Winsor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TalentConfig {
    pub smoothing: BTreeMap<TrackedStat, Smoothing>,
    pub slow_weight: f64,
    pub fast_weight: f64,
    /// Per-player career clip applied before smoothing.
    pub winsor: Option<Winsor>,
}

impl TalentConfig {
    pub fn stats(&self) -> Vec<TrackedStat> {
        self.smoothing.keys().copied().collect()
    }
}

/// Linear weights turning per-game talents into box offense and defense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxWeights {
    pub offense: Vec<(TrackedStat, f64)>,
    pub defense: Vec<(TrackedStat, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendConfig {
    pub box_weight: f64,
    pub rapm_weight: f64,
    pub scale: f64,
    pub min_rating: f64,
    pub max_rating: f64,
}

/// Restricts standardization statistics to rows with `column >= min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qualification {
    pub column: String,
    pub min: f64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, FromStr)]
#[display(style = "lowercase")]
pub enum Preset {
    #[default]
    Lite,
    Classic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub rapm: RapmConfig,
    pub talent: TalentConfig,
    pub box_weights: BoxWeights,
    pub blend: BlendConfig,
    pub qualification: Option<Qualification>,
    pub cutover_month: u32,
}

impl Config {
    pub fn lite() -> Self {
        let smoothing = BTreeMap::from([
            (TrackedStat::PtsPer100, Smoothing::new(0.35, 0.10)),
            (TrackedStat::RebPer100, Smoothing::new(0.25, 0.07)),
            (TrackedStat::AstPer100, Smoothing::new(0.30, 0.08)),
            (TrackedStat::StlPer100, Smoothing::new(0.45, 0.15)),
            (TrackedStat::BlkPer100, Smoothing::new(0.40, 0.12)),
            (TrackedStat::ToPer100, Smoothing::new(0.35, 0.10)),
            (TrackedStat::TsPctCalc, Smoothing::new(0.25, 0.07)),
            (TrackedStat::EfgPctCalc, Smoothing::new(0.25, 0.07)),
            (TrackedStat::PmPer100, Smoothing::new(0.50, 0.20)),
        ]);

        Self {
            rapm: RapmConfig {
                lambda: 1500.0,
                min_player_minutes: 4.0,
                min_team_minutes: 120.0,
                net_rating_winsor: Some(Winsor::default()),
                rapm_winsor: Some(Winsor::default()),
            },
            talent: TalentConfig {
                smoothing,
                slow_weight: 0.70,
                fast_weight: 0.30,
                winsor: Some(Winsor::default()),
            },
            box_weights: BoxWeights {
                offense: vec![
                    (TrackedStat::PtsPer100, 0.40),
                    (TrackedStat::AstPer100, 0.25),
                    (TrackedStat::TsPctCalc, 12.0),
                    (TrackedStat::EfgPctCalc, 8.0),
                    (TrackedStat::ToPer100, -0.25),
                ],
                defense: vec![
                    (TrackedStat::RebPer100, 0.12),
                    (TrackedStat::BlkPer100, 0.30),
                    (TrackedStat::StlPer100, 0.25),
                    (TrackedStat::ToPer100, -0.05),
                ],
            },
            blend: BlendConfig {
                box_weight: 0.55,
                rapm_weight: 0.45,
                scale: 3.5,
                min_rating: -10.0,
                max_rating: 10.0,
            },
            qualification: None,
            cutover_month: DEFAULT_CUTOVER_MONTH,
        }
    }

    /// Lighter ridge penalty with RAPM carrying most of the blend, and box
    /// weights leaning harder on shooting efficiency.
    pub fn classic() -> Self {
        let mut config = Self::lite();
        config.rapm.lambda = 300.0;
        config.blend.box_weight = 0.36;
        config.blend.rapm_weight = 0.64;
        config.blend.scale = 4.0;
        config.box_weights = BoxWeights {
            offense: vec![
                (TrackedStat::PtsPer100, 0.35),
                (TrackedStat::AstPer100, 0.25),
                (TrackedStat::TsPctCalc, 15.0),
                (TrackedStat::EfgPctCalc, 10.0),
                (TrackedStat::ToPer100, -0.20),
            ],
            defense: vec![
                (TrackedStat::RebPer100, 0.10),
                (TrackedStat::BlkPer100, 0.25),
                (TrackedStat::StlPer100, 0.20),
                (TrackedStat::ToPer100, -0.05),
            ],
        };
        config
    }

    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Lite => Self::lite(),
            Preset::Classic => Self::classic(),
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Standardize against players with at least `floor` minutes in the season.
    pub fn qualify_minutes(mut self, floor: f64) -> Self {
        self.qualification = Some(Qualification {
            column: crate::talent::SEASON_MINUTES.to_string(),
            min: floor,
        });
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidConfig(msg));

        if !(self.rapm.lambda.is_finite() && self.rapm.lambda > 0.0) {
            return invalid(format!(
                "ridge penalty must be positive, got {}",
                self.rapm.lambda
            ));
        }
        for winsor in [
            self.rapm.net_rating_winsor,
            self.rapm.rapm_winsor,
            self.talent.winsor,
        ]
        .into_iter()
        .flatten()
        {
            if !(0.0..=1.0).contains(&winsor.lower)
                || !(0.0..=1.0).contains(&winsor.upper)
                || winsor.lower > winsor.upper
            {
                return invalid(format!("bad winsor bounds {winsor:?}"));
            }
        }
        for (stat, s) in &self.talent.smoothing {
            for alpha in [s.alpha_fast, s.alpha_slow] {
                if !(alpha > 0.0 && alpha <= 1.0) {
                    return invalid(format!("{stat} decay {alpha} is outside (0, 1]"));
                }
            }
        }
        for (stat, _) in self
            .box_weights
            .offense
            .iter()
            .chain(self.box_weights.defense.iter())
        {
            if !self.talent.smoothing.contains_key(stat) {
                return invalid(format!("box weight on {stat} has no smoothing entry"));
            }
        }
        if !(1..=12).contains(&self.cutover_month) {
            return invalid(format!("cutover month {}", self.cutover_month));
        }

        let b = &self.blend;
        if b.box_weight < 0.0 || b.rapm_weight < 0.0 {
            return invalid("blend weights must be non-negative".to_string());
        }
        if (b.box_weight + b.rapm_weight - 1.0).abs() > 1e-9 {
            return invalid(format!(
                "blend weights sum to {}, expected 1",
                b.box_weight + b.rapm_weight
            ));
        }
        if !(b.min_rating < b.max_rating) {
            return invalid(format!(
                "rating bounds [{}, {}] are empty",
                b.min_rating, b.max_rating
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        Config::lite().validate().unwrap();
        Config::classic().validate().unwrap();
        assert_eq!(Config::preset(Preset::default()), Config::lite());
    }

    #[test]
    fn classic_reweights_box_and_blend() {
        let classic = Config::classic();
        let lite = Config::lite();
        assert_eq!(classic.rapm.lambda, 300.0);
        assert_eq!(classic.blend.scale, 4.0);
        assert_eq!(classic.talent, lite.talent);
        assert!(classic
            .box_weights
            .offense
            .contains(&(TrackedStat::TsPctCalc, 15.0)));
        assert!(classic
            .box_weights
            .defense
            .contains(&(TrackedStat::StlPer100, 0.20)));
        assert_ne!(classic.box_weights, lite.box_weights);
    }

    #[test]
    fn preset_parses_from_lowercase() {
        assert_eq!("classic".parse::<Preset>().unwrap(), Preset::Classic);
        assert_eq!(Preset::Lite.to_string(), "lite");
        assert!("heavy".parse::<Preset>().is_err());
    }

    #[test]
    fn non_positive_lambda_is_rejected() {
        let mut config = Config::lite();
        config.rapm.lambda = 0.0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn blend_weights_must_sum_to_one() {
        let mut config = Config::classic();
        config.blend.rapm_weight = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn box_weights_need_smoothing() {
        let mut config = Config::lite();
        config.talent.smoothing.remove(&TrackedStat::PtsPer100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn qualify_minutes_targets_season_minutes() {
        let config = Config::lite().qualify_minutes(500.0);
        let q = config.qualification.unwrap();
        assert_eq!(q.column, "season_minutes");
        assert_eq!(q.min, 500.0);
    }

    #[test]
    fn config_survives_json() {
        let raw = serde_json::to_string(&Config::classic()).unwrap();
        let config: Config = serde_json::from_str(&raw).unwrap();
        assert_eq!(config, Config::classic());
    }
}
