use chrono::{NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::assessment::{SkillScores, derive};
use crate::error::AppError;
use crate::models::{Assessment, DbAssessment};

const ASSESSMENT_COLUMNS: &str = "id, player_id, coach_id, session_id, technique, tactics, power, defense,
        consistency, grade, archetype, notes, assessed_at";

#[instrument(skip(notes))]
pub async fn create_assessment(
    pool: &Pool<Sqlite>,
    player_id: i64,
    coach_id: i64,
    session_id: Option<i64>,
    scores: &SkillScores,
    notes: &str,
) -> Result<i64, AppError> {
    create_assessment_at(
        pool,
        player_id,
        coach_id,
        session_id,
        scores,
        notes,
        Utc::now().naive_utc(),
    )
    .await
}

/// Grade and archetype are always derived here from the scores being stored.
#[instrument(skip(notes))]
pub async fn create_assessment_at(
    pool: &Pool<Sqlite>,
    player_id: i64,
    coach_id: i64,
    session_id: Option<i64>,
    scores: &SkillScores,
    notes: &str,
    assessed_at: NaiveDateTime,
) -> Result<i64, AppError> {
    info!("Recording assessment");
    scores.check_range()?;
    let derivation = derive(scores);

    let res = sqlx::query(
        "INSERT INTO assessments
            (player_id, coach_id, session_id, technique, tactics, power, defense, consistency,
             grade, archetype, notes, assessed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(player_id)
    .bind(coach_id)
    .bind(session_id)
    .bind(i64::from(scores.technique))
    .bind(i64::from(scores.tactics))
    .bind(i64::from(scores.power))
    .bind(i64::from(scores.defense))
    .bind(i64::from(scores.consistency))
    .bind(derivation.grade.as_str())
    .bind(derivation.archetype.as_str())
    .bind(notes)
    .bind(assessed_at)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn get_assessment(pool: &Pool<Sqlite>, id: i64) -> Result<Assessment, AppError> {
    info!("Getting assessment");
    let row = sqlx::query_as::<_, DbAssessment>(&format!(
        "SELECT {} FROM assessments WHERE id = ?",
        ASSESSMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(assessment) => Assessment::try_from(assessment),
        None => Err(AppError::NotFound(format!("Assessment {} not found", id))),
    }
}

/// Newest first.
#[instrument]
pub async fn get_assessments_for_player(
    pool: &Pool<Sqlite>,
    player_id: i64,
) -> Result<Vec<Assessment>, AppError> {
    info!("Getting assessments for player");
    let rows = sqlx::query_as::<_, DbAssessment>(&format!(
        "SELECT {} FROM assessments WHERE player_id = ? ORDER BY assessed_at DESC, id DESC",
        ASSESSMENT_COLUMNS
    ))
    .bind(player_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Assessment::try_from).collect()
}

#[instrument]
pub async fn get_latest_assessment(
    pool: &Pool<Sqlite>,
    player_id: i64,
) -> Result<Option<Assessment>, AppError> {
    let row = sqlx::query_as::<_, DbAssessment>(&format!(
        "SELECT {} FROM assessments WHERE player_id = ? ORDER BY assessed_at DESC, id DESC LIMIT 1",
        ASSESSMENT_COLUMNS
    ))
    .bind(player_id)
    .fetch_optional(pool)
    .await?;

    row.map(Assessment::try_from).transpose()
}

#[instrument]
pub async fn delete_assessment(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting assessment");
    let res = sqlx::query("DELETE FROM assessments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Assessment {} not found", id)));
    }
    Ok(())
}
