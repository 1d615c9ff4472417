use tracing::debug;

use crate::catalog::{Catalog, Song, SongId};
use crate::config::MatchConfig;
use crate::elo::update_ratings;
use crate::error::{BattleError, Result};
use crate::protocol::OutcomeResponse;
use crate::store::{OutcomeTx, RatingStore};

/// Check that both ids are present, known, and different.
pub fn validate_outcome(
    catalog: &Catalog,
    winner_id: Option<SongId>,
    loser_id: Option<SongId>,
) -> Result<(&Song, &Song)> {
    let winner_id = winner_id.ok_or_else(|| BattleError::invalid("missing winner id"))?;
    let loser_id = loser_id.ok_or_else(|| BattleError::invalid("missing loser id"))?;
    if winner_id == loser_id {
        return Err(BattleError::invalid("winner and loser are the same song"));
    }
    let winner = catalog
        .get(winner_id)
        .ok_or_else(|| BattleError::invalid(format!("unknown song {}", winner_id)))?;
    let loser = catalog
        .get(loser_id)
        .ok_or_else(|| BattleError::invalid(format!("unknown song {}", loser_id)))?;
    Ok((winner, loser))
}

/// Apply a vote: global and personal rating updates, genre tallies, and recency.
///
/// All writes share one store transaction, so a failure part way leaves nothing applied.
/// Replaying the same vote counts it twice.
pub async fn record_outcome<S: RatingStore>(
    store: &S,
    catalog: &Catalog,
    config: &MatchConfig,
    session: &str,
    winner_id: Option<SongId>,
    loser_id: Option<SongId>,
) -> Result<OutcomeResponse> {
    if session.trim().is_empty() {
        return Err(BattleError::invalid("missing session"));
    }
    let (winner, loser) = validate_outcome(catalog, winner_id, loser_id)?;

    let mut tx = store.begin().await?;

    let winner_old = tx.global_rating(winner.id).await?;
    let loser_old = tx.global_rating(loser.id).await?;
    let (winner_new, loser_new) = update_ratings(winner_old, loser_old, config.k_factor);
    tx.apply_global_update(winner.id, winner_new, true).await?;
    tx.apply_global_update(loser.id, loser_new, false).await?;

    // Personal ratings move independently of the global ones.
    let winner_personal = tx.personal_rating_or_init(session, winner.id).await?;
    let loser_personal = tx.personal_rating_or_init(session, loser.id).await?;
    let (winner_personal_new, loser_personal_new) =
        update_ratings(winner_personal, loser_personal, config.k_factor);
    tx.apply_personal_update(session, winner.id, winner_personal_new, true)
        .await?;
    tx.apply_personal_update(session, loser.id, loser_personal_new, false)
        .await?;

    if let Some(genre) = winner.genre_tag() {
        tx.record_affinity(session, genre, true).await?;
    }
    if let Some(genre) = loser.genre_tag() {
        tx.record_affinity(session, genre, false).await?;
    }

    tx.push_recent(session, (winner.id, loser.id), config.recency_cap)
        .await?;
    tx.commit().await?;

    debug!(
        session,
        winner = winner.id,
        loser = loser.id,
        winner_rating = winner_new,
        loser_rating = loser_new,
        "recorded outcome"
    );

    Ok(OutcomeResponse {
        new_rating: winner_new,
        rating_delta: winner_new - winner_old,
    })
}
