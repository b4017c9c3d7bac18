use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{DbNote, Note, NoteVisibility};

const NOTE_SELECT: &str = "SELECT n.id, n.author_id, COALESCE(u.display_name, u.username) AS author_name,
        n.player_id, n.session_id, n.body, n.visibility, n.created_at, n.updated_at
     FROM notes n
     JOIN users u ON u.id = n.author_id";

#[instrument(skip(body))]
pub async fn create_note(
    pool: &Pool<Sqlite>,
    author_id: i64,
    player_id: i64,
    session_id: Option<i64>,
    body: &str,
    visibility: NoteVisibility,
) -> Result<i64, AppError> {
    info!("Creating note");

    if body.trim().is_empty() {
        return Err(AppError::Validation("Note body cannot be blank".to_string()));
    }

    if let Some(session_id) = session_id {
        let attends: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM session_participants WHERE session_id = ? AND player_id = ?",
        )
        .bind(session_id)
        .bind(player_id)
        .fetch_optional(pool)
        .await?;

        if attends.is_none() {
            return Err(AppError::Validation(format!(
                "Player {} is not part of session {}",
                player_id, session_id
            )));
        }
    }

    let now = Utc::now().naive_utc();
    let res = sqlx::query(
        "INSERT INTO notes (author_id, player_id, session_id, body, visibility, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(author_id)
    .bind(player_id)
    .bind(session_id)
    .bind(body)
    .bind(visibility.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn get_note(pool: &Pool<Sqlite>, id: i64) -> Result<Note, AppError> {
    info!("Getting note");
    let row = sqlx::query_as::<_, DbNote>(&format!("{} WHERE n.id = ?", NOTE_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(note) => Note::try_from(note),
        None => Err(AppError::NotFound(format!("Note {} not found", id))),
    }
}

#[instrument]
pub async fn get_notes_for_player(
    pool: &Pool<Sqlite>,
    player_id: i64,
    shared_only: bool,
) -> Result<Vec<Note>, AppError> {
    info!("Getting notes for player");

    let filter = if shared_only {
        " AND n.visibility = 'shared'"
    } else {
        ""
    };

    let rows = sqlx::query_as::<_, DbNote>(&format!(
        "{} WHERE n.player_id = ?{} ORDER BY n.created_at DESC, n.id DESC",
        NOTE_SELECT, filter
    ))
    .bind(player_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Note::try_from).collect()
}

#[instrument(skip(body))]
pub async fn update_note(
    pool: &Pool<Sqlite>,
    id: i64,
    body: &str,
    visibility: NoteVisibility,
) -> Result<(), AppError> {
    info!("Updating note");

    if body.trim().is_empty() {
        return Err(AppError::Validation("Note body cannot be blank".to_string()));
    }

    let res = sqlx::query("UPDATE notes SET body = ?, visibility = ?, updated_at = ? WHERE id = ?")
        .bind(body)
        .bind(visibility.as_str())
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Note {} not found", id)));
    }
    Ok(())
}

#[instrument]
pub async fn delete_note(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting note");
    let res = sqlx::query("DELETE FROM notes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Note {} not found", id)));
    }
    Ok(())
}
