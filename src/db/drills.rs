use chrono::{NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::assessment::{MAX_SCORE, MIN_SCORE};
use crate::curriculum;
use crate::error::AppError;
use crate::models::{DbDrillScore, DrillScore};

#[instrument]
pub async fn record_drill_score(
    pool: &Pool<Sqlite>,
    player_id: i64,
    coach_id: i64,
    session_id: Option<i64>,
    drill_code: &str,
    score: u8,
) -> Result<i64, AppError> {
    record_drill_score_at(
        pool,
        player_id,
        coach_id,
        session_id,
        drill_code,
        score,
        Utc::now().naive_utc(),
    )
    .await
}

#[instrument]
pub async fn record_drill_score_at(
    pool: &Pool<Sqlite>,
    player_id: i64,
    coach_id: i64,
    session_id: Option<i64>,
    drill_code: &str,
    score: u8,
    recorded_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Recording drill score");

    let (module, drill) = curriculum::find_drill(drill_code)
        .ok_or_else(|| AppError::Validation(format!("Unknown drill: {}", drill_code)))?;

    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(AppError::Validation(format!(
            "Drill score must be between {} and {}",
            MIN_SCORE, MAX_SCORE
        )));
    }

    let res = sqlx::query(
        "INSERT INTO drill_scores (player_id, coach_id, session_id, module_code, drill_code, score, recorded_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(player_id)
    .bind(coach_id)
    .bind(session_id)
    .bind(module.code)
    .bind(drill.code)
    .bind(i64::from(score))
    .bind(recorded_at)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn get_drill_scores_for_player(
    pool: &Pool<Sqlite>,
    player_id: i64,
) -> Result<Vec<DrillScore>, AppError> {
    info!("Getting drill scores for player");
    let rows = sqlx::query_as::<_, DbDrillScore>(
        "SELECT id, player_id, coach_id, session_id, module_code, drill_code, score, recorded_at
         FROM drill_scores
         WHERE player_id = ?
         ORDER BY recorded_at, id",
    )
    .bind(player_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(DrillScore::try_from).collect()
}
