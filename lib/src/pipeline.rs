use crate::{
    blend::{self, RatingsDf},
    config::Config,
    games::GameRowsDf,
    rapm::{self, RapmDf},
    talent::{self, BoxSeasonDf},
    Result,
};

/// Rates every player-season in `games`.
///
/// The RAPM path and the talent path both read the same cleaned rows; their
/// season tables are then merged, standardized and blended.
pub fn run(games: &GameRowsDf, config: &Config) -> Result<RatingsDf> {
    log::trace!("pipeline::run");
    config.validate()?;
    games.require(&config.talent.stats())?;

    let rapm_df: RapmDf = rapm::rapm_by_season(games, &config.rapm)?;
    log::debug!("{} player-season RAPM values", rapm_df.height());

    let talent_df = talent::with_talent(games, &config.talent)?;
    let box_df = BoxSeasonDf::from_talent(talent_df, &config.box_weights)?;

    let names = rapm::name_table(&games.player_games()?)?;
    blend::assemble(box_df, rapm_df, names, config)
}
