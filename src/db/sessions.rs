use chrono::{NaiveDateTime, Utc};
use sqlx::{Executor, Pool, QueryBuilder, Sqlite};
use tracing::{info, instrument, warn};

use crate::auth::Role;
use crate::error::AppError;
use crate::models::{
    CoachingSession, DbCoachingSession, DbParticipant, Participant, ParticipantStatus,
    SessionStatus,
};
use crate::schedule::{
    Actor, SessionPlan, check_participant_transition, check_session_transition, find_clash,
    needs_free_place,
};

const SESSION_SELECT: &str = "SELECT s.id, s.coach_id, COALESCE(u.display_name, u.username) AS coach_name,
        s.title, s.kind, s.court, s.starts_at, s.duration_minutes, s.capacity, s.status,
        s.focus_module, s.created_at, s.updated_at
     FROM coaching_sessions s
     JOIN users u ON u.id = s.coach_id";

const PARTICIPANT_SELECT: &str = "SELECT p.session_id, p.player_id,
        COALESCE(u.display_name, u.username) AS player_name, p.status, p.updated_at
     FROM session_participants p
     JOIN users u ON u.id = p.player_id";

const ACTIVE_STATUSES: &str = "('invited', 'confirmed', 'attended')";

#[derive(Debug, Default, Clone)]
pub struct SessionFilter {
    pub coach_id: Option<i64>,
    pub player_id: Option<i64>,
    pub status: Option<SessionStatus>,
    pub from: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
}

fn to_sessions(rows: Vec<DbCoachingSession>) -> Result<Vec<CoachingSession>, AppError> {
    rows.into_iter().map(CoachingSession::try_from).collect()
}

async fn fetch_session<'e, E>(executor: E, id: i64) -> Result<CoachingSession, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, DbCoachingSession>(&format!("{} WHERE s.id = ?", SESSION_SELECT))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    match row {
        Some(session) => CoachingSession::try_from(session),
        None => Err(AppError::NotFound(format!("Session {} not found", id))),
    }
}

async fn fetch_coach_schedule<'e, E>(
    executor: E,
    coach_id: i64,
) -> Result<Vec<CoachingSession>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, DbCoachingSession>(&format!(
        "{} WHERE s.coach_id = ? AND s.status = 'scheduled'",
        SESSION_SELECT
    ))
    .bind(coach_id)
    .fetch_all(executor)
    .await?;

    to_sessions(rows)
}

async fn count_active<'e, E>(executor: E, session_id: i64) -> Result<i64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM session_participants WHERE session_id = ? AND status IN {}",
        ACTIVE_STATUSES
    ))
    .bind(session_id)
    .fetch_one(executor)
    .await?;

    Ok(count)
}

fn clash_error(clash: &CoachingSession) -> AppError {
    AppError::Conflict(format!(
        "Coach already has '{}' scheduled at {}",
        clash.title,
        clash.starts_at.format("%Y-%m-%d %H:%M")
    ))
}

#[instrument]
pub async fn create_session(
    pool: &Pool<Sqlite>,
    coach_id: i64,
    plan: &SessionPlan,
) -> Result<i64, AppError> {
    info!("Creating coaching session");
    plan.check()?;

    let mut tx = pool.begin().await?;

    let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
        .bind(coach_id)
        .fetch_optional(&mut *tx)
        .await?;
    match role.as_deref() {
        Some(r) if r == Role::Coach.as_str() || r == Role::Admin.as_str() => {}
        Some(_) => {
            return Err(AppError::Validation(format!(
                "User {} cannot coach a session",
                coach_id
            )));
        }
        None => return Err(AppError::NotFound(format!("Coach {} not found", coach_id))),
    }

    let schedule = fetch_coach_schedule(&mut *tx, coach_id).await?;
    if let Some(clash) = find_clash(plan, &schedule, None) {
        return Err(clash_error(clash));
    }

    let now = Utc::now().naive_utc();
    let res = sqlx::query(
        "INSERT INTO coaching_sessions
            (coach_id, title, kind, court, starts_at, duration_minutes, capacity, status, focus_module, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, 'scheduled', ?, ?, ?)",
    )
    .bind(coach_id)
    .bind(plan.title.trim())
    .bind(plan.kind.as_str())
    .bind(plan.court.as_deref())
    .bind(plan.starts_at.naive_utc())
    .bind(plan.duration_minutes)
    .bind(plan.capacity)
    .bind(plan.focus_module.as_deref())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn get_session(pool: &Pool<Sqlite>, id: i64) -> Result<CoachingSession, AppError> {
    info!("Getting coaching session");
    fetch_session(pool, id).await
}

#[instrument]
pub async fn list_sessions(
    pool: &Pool<Sqlite>,
    filter: &SessionFilter,
) -> Result<Vec<CoachingSession>, AppError> {
    info!("Listing coaching sessions");

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SESSION_SELECT);
    query.push(" WHERE 1 = 1");

    if let Some(coach_id) = filter.coach_id {
        query.push(" AND s.coach_id = ").push_bind(coach_id);
    }
    if let Some(player_id) = filter.player_id {
        query
            .push(" AND EXISTS (SELECT 1 FROM session_participants p WHERE p.session_id = s.id AND p.player_id = ")
            .push_bind(player_id)
            .push(")");
    }
    if let Some(status) = filter.status {
        query.push(" AND s.status = ").push_bind(status.as_str());
    }
    if let Some(from) = filter.from {
        query.push(" AND s.starts_at >= ").push_bind(from);
    }
    if let Some(until) = filter.until {
        query.push(" AND s.starts_at < ").push_bind(until);
    }
    query.push(" ORDER BY s.starts_at, s.id");

    let rows = query
        .build_query_as::<DbCoachingSession>()
        .fetch_all(pool)
        .await?;

    to_sessions(rows)
}

#[instrument]
pub async fn update_session(
    pool: &Pool<Sqlite>,
    id: i64,
    plan: &SessionPlan,
) -> Result<(), AppError> {
    info!("Updating coaching session");
    plan.check()?;

    let mut tx = pool.begin().await?;

    let session = fetch_session(&mut *tx, id).await?;
    if session.status != SessionStatus::Scheduled {
        return Err(AppError::Validation(format!(
            "A {} session can no longer be edited",
            session.status
        )));
    }

    let schedule = fetch_coach_schedule(&mut *tx, session.coach_id).await?;
    if let Some(clash) = find_clash(plan, &schedule, Some(id)) {
        return Err(clash_error(clash));
    }

    let active = count_active(&mut *tx, id).await?;
    if plan.capacity < active {
        return Err(AppError::Conflict(format!(
            "Capacity {} is below the {} players already in the session",
            plan.capacity, active
        )));
    }

    sqlx::query(
        "UPDATE coaching_sessions
         SET title = ?, kind = ?, court = ?, starts_at = ?, duration_minutes = ?, capacity = ?,
             focus_module = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(plan.title.trim())
    .bind(plan.kind.as_str())
    .bind(plan.court.as_deref())
    .bind(plan.starts_at.naive_utc())
    .bind(plan.duration_minutes)
    .bind(plan.capacity)
    .bind(plan.focus_module.as_deref())
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(())
}

#[instrument]
pub async fn set_session_status(
    pool: &Pool<Sqlite>,
    id: i64,
    status: SessionStatus,
) -> Result<(), AppError> {
    info!("Changing coaching session status");

    let mut tx = pool.begin().await?;
    let session = fetch_session(&mut *tx, id).await?;
    check_session_transition(session.status, status)?;

    sqlx::query("UPDATE coaching_sessions SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

#[instrument]
pub async fn delete_session(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting coaching session");

    let res = sqlx::query("DELETE FROM coaching_sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Session {} not found", id)));
    }
    Ok(())
}

#[instrument]
pub async fn get_participants(
    pool: &Pool<Sqlite>,
    session_id: i64,
) -> Result<Vec<Participant>, AppError> {
    info!("Getting session participants");

    let rows = sqlx::query_as::<_, DbParticipant>(&format!(
        "{} WHERE p.session_id = ? ORDER BY player_name",
        PARTICIPANT_SELECT
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Participant::try_from).collect()
}

async fn fetch_participant<'e, E>(
    executor: E,
    session_id: i64,
    player_id: i64,
) -> Result<Option<Participant>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, DbParticipant>(&format!(
        "{} WHERE p.session_id = ? AND p.player_id = ?",
        PARTICIPANT_SELECT
    ))
    .bind(session_id)
    .bind(player_id)
    .fetch_optional(executor)
    .await?;

    row.map(Participant::try_from).transpose()
}

#[instrument]
pub async fn get_participant(
    pool: &Pool<Sqlite>,
    session_id: i64,
    player_id: i64,
) -> Result<Option<Participant>, AppError> {
    fetch_participant(pool, session_id, player_id).await
}

/// Invites players to a scheduled session. Players already on the list are
/// skipped; the whole batch is rejected if it would overfill the session.
#[instrument]
pub async fn add_participants(
    pool: &Pool<Sqlite>,
    session_id: i64,
    player_ids: &[i64],
) -> Result<usize, AppError> {
    info!("Adding participants to session");

    let mut tx = pool.begin().await?;

    let session = fetch_session(&mut *tx, session_id).await?;
    if session.status != SessionStatus::Scheduled {
        return Err(AppError::Validation(format!(
            "Players cannot be added to a {} session",
            session.status
        )));
    }

    let mut to_add = Vec::new();
    for player_id in player_ids {
        if to_add.contains(player_id) {
            continue;
        }

        let player: Option<(String, bool)> =
            sqlx::query_as("SELECT role, archived FROM users WHERE id = ?")
                .bind(player_id)
                .fetch_optional(&mut *tx)
                .await?;
        match player {
            Some((role, false)) if role == Role::Player.as_str() => {}
            Some(_) => {
                return Err(AppError::Validation(format!(
                    "User {} is not an active player",
                    player_id
                )));
            }
            None => return Err(AppError::NotFound(format!("Player {} not found", player_id))),
        }

        if fetch_participant(&mut *tx, session_id, *player_id)
            .await?
            .is_none()
        {
            to_add.push(*player_id);
        }
    }

    let active = count_active(&mut *tx, session_id).await?;
    if active + to_add.len() as i64 > session.capacity {
        warn!(
            active,
            requested = to_add.len(),
            capacity = session.capacity,
            "Session capacity exceeded"
        );
        return Err(AppError::Conflict(format!(
            "Session is full: {} of {} places taken",
            active, session.capacity
        )));
    }

    let now = Utc::now().naive_utc();
    for player_id in &to_add {
        sqlx::query(
            "INSERT INTO session_participants (session_id, player_id, status, updated_at)
             VALUES (?, ?, 'invited', ?)",
        )
        .bind(session_id)
        .bind(player_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(to_add.len())
}

#[instrument]
pub async fn remove_participant(
    pool: &Pool<Sqlite>,
    session_id: i64,
    player_id: i64,
) -> Result<(), AppError> {
    info!("Removing participant from session");

    let res = sqlx::query("DELETE FROM session_participants WHERE session_id = ? AND player_id = ?")
        .bind(session_id)
        .bind(player_id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Player {} is not part of session {}",
            player_id, session_id
        )));
    }
    Ok(())
}

#[instrument]
pub async fn update_participant_status(
    pool: &Pool<Sqlite>,
    session_id: i64,
    player_id: i64,
    status: ParticipantStatus,
    actor: Actor,
) -> Result<(), AppError> {
    info!("Updating participant status");

    let mut tx = pool.begin().await?;

    let session = fetch_session(&mut *tx, session_id).await?;
    let participant = fetch_participant(&mut *tx, session_id, player_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Player {} is not part of session {}",
                player_id, session_id
            ))
        })?;

    check_participant_transition(participant.status, status, actor, session.status)?;

    if needs_free_place(participant.status, status)
        && count_active(&mut *tx, session_id).await? >= session.capacity
    {
        return Err(AppError::Conflict("Session is full".to_string()));
    }

    sqlx::query(
        "UPDATE session_participants SET status = ?, updated_at = ?
         WHERE session_id = ? AND player_id = ?",
    )
    .bind(status.as_str())
    .bind(Utc::now().naive_utc())
    .bind(session_id)
    .bind(player_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

#[instrument]
pub async fn count_attended_sessions(pool: &Pool<Sqlite>, player_id: i64) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM session_participants WHERE player_id = ? AND status = 'attended'",
    )
    .bind(player_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
