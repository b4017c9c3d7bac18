use chrono::{DateTime, Utc};
use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::db::{
    SessionFilter, add_participants, create_session, delete_session, get_participant,
    get_participants, get_session, list_sessions, remove_participant, set_session_status,
    update_participant_status, update_session,
};
use crate::error::AppError;
use crate::models::{CoachingSession, Participant, ParticipantStatus, SessionKind, SessionStatus};
use crate::schedule::{Actor, SessionPlan};
use crate::validation::{
    ApiError, AppErrorExt, JsonValidateExt, PermissionCheckExt, ToValidationResponse,
};

use super::{end_of_day, start_of_day};

#[derive(Deserialize, Validate, Debug)]
pub struct SessionRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    title: String,
    kind: SessionKind,
    #[validate(length(max = 50, message = "Court name is too long"))]
    court: Option<String>,
    starts_at: DateTime<Utc>,
    #[validate(range(min = 15, max = 240, message = "Duration must be between 15 and 240 minutes"))]
    duration_minutes: i64,
    #[validate(range(min = 1, max = 16, message = "Capacity must be between 1 and 16"))]
    capacity: i64,
    focus_module: Option<String>,
    coach_id: Option<i64>,
}

impl SessionRequest {
    fn plan(&self) -> SessionPlan {
        SessionPlan {
            title: self.title.trim().to_string(),
            kind: self.kind,
            court: self
                .court
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            starts_at: self.starts_at,
            duration_minutes: self.duration_minutes,
            capacity: self.capacity,
            focus_module: self.focus_module.clone().filter(|m| !m.is_empty()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: SessionView,
    pub participants: Vec<ParticipantView>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SessionView {
    pub id: i64,
    pub coach_id: i64,
    pub coach_name: String,
    pub title: String,
    pub kind: SessionKind,
    pub court: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub capacity: i64,
    pub status: SessionStatus,
    pub focus_module: Option<String>,
}

impl From<CoachingSession> for SessionView {
    fn from(session: CoachingSession) -> Self {
        Self {
            ends_at: session.ends_at(),
            id: session.id,
            coach_id: session.coach_id,
            coach_name: session.coach_name,
            title: session.title,
            kind: session.kind,
            court: session.court,
            starts_at: session.starts_at,
            duration_minutes: session.duration_minutes,
            capacity: session.capacity,
            status: session.status,
            focus_module: session.focus_module,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ParticipantView {
    pub player_id: i64,
    pub player_name: String,
    pub status: ParticipantStatus,
    pub updated_at: DateTime<Utc>,
}

impl From<Participant> for ParticipantView {
    fn from(participant: Participant) -> Self {
        Self {
            player_id: participant.player_id,
            player_name: participant.player_name,
            status: participant.status,
            updated_at: participant.updated_at,
        }
    }
}

/// Admins manage every session; coaches only their own.
fn can_manage(user: &User, session: &CoachingSession) -> bool {
    user.has_permission(Permission::ManageAllSessions)
        || (user.has_permission(Permission::ManageSessions) && session.coach_id == user.id)
}

async fn managed_session(
    db: &Pool<Sqlite>,
    user: &User,
    id: i64,
) -> Result<CoachingSession, ApiError> {
    let session = get_session(db, id).await.validate_custom()?;
    if !can_manage(user, &session) {
        return Err(Status::Forbidden.to_validation_response());
    }
    Ok(session)
}

#[post("/sessions", data = "<request>")]
pub async fn api_create_session(
    request: Json<SessionRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<SessionResponse>>, ApiError> {
    user.require_permission(Permission::ManageSessions)
        .validate_custom()?;
    let validated = request.validate_custom()?;

    let coach_id = match validated.coach_id {
        Some(coach_id) if coach_id != user.id => {
            user.require_permission(Permission::ManageAllSessions)
                .validate_custom()?;
            coach_id
        }
        _ => user.id,
    };

    let id = create_session(db, coach_id, &validated.plan())
        .await
        .validate_custom()?;

    let session = get_session(db, id).await.validate_custom()?;
    Ok(Custom(
        Status::Created,
        Json(SessionResponse {
            session: SessionView::from(session),
            participants: Vec::new(),
        }),
    ))
}

#[derive(FromForm, Debug)]
pub struct SessionsQueryParams {
    status: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

#[get("/sessions?<params..>")]
pub async fn api_list_sessions(
    params: SessionsQueryParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    user.require_permission(Permission::ViewOwnSessions)
        .validate_custom()?;

    let mut filter = SessionFilter {
        status: params
            .status
            .as_deref()
            .map(str::parse::<SessionStatus>)
            .transpose()
            .validate_custom()?,
        from: params
            .from
            .as_deref()
            .map(start_of_day)
            .transpose()
            .validate_custom()?,
        until: params
            .to
            .as_deref()
            .map(end_of_day)
            .transpose()
            .validate_custom()?,
        ..SessionFilter::default()
    };

    if !user.has_permission(Permission::ManageAllSessions) {
        if user.has_permission(Permission::ManageSessions) {
            filter.coach_id = Some(user.id);
        } else {
            filter.player_id = Some(user.id);
        }
    }

    let sessions = list_sessions(db, &filter).await.validate_custom()?;

    Ok(Json(sessions.into_iter().map(SessionView::from).collect()))
}

#[get("/sessions/<id>")]
pub async fn api_get_session(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SessionResponse>, Status> {
    let session = get_session(db, id).await?;

    if !can_manage(&user, &session) {
        user.require_permission(Permission::ViewOwnSessions)?;
        if get_participant(db, id, user.id).await?.is_none() {
            return Err(Status::Forbidden);
        }
    }

    let participants = get_participants(db, id).await?;

    Ok(Json(SessionResponse {
        session: SessionView::from(session),
        participants: participants.into_iter().map(ParticipantView::from).collect(),
    }))
}

#[put("/sessions/<id>", data = "<request>")]
pub async fn api_update_session(
    id: i64,
    request: Json<SessionRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SessionView>, ApiError> {
    managed_session(db, &user, id).await?;
    let validated = request.validate_custom()?;

    update_session(db, id, &validated.plan())
        .await
        .validate_custom()?;

    let session = get_session(db, id).await.validate_custom()?;
    Ok(Json(SessionView::from(session)))
}

#[derive(Deserialize, Debug)]
pub struct SessionStatusRequest {
    status: SessionStatus,
}

#[post("/sessions/<id>/status", data = "<request>")]
pub async fn api_set_session_status(
    id: i64,
    request: Json<SessionStatusRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SessionView>, ApiError> {
    managed_session(db, &user, id).await?;

    set_session_status(db, id, request.status)
        .await
        .validate_custom()?;

    let session = get_session(db, id).await.validate_custom()?;
    Ok(Json(SessionView::from(session)))
}

#[delete("/sessions/<id>")]
pub async fn api_delete_session(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    managed_session(db, &user, id).await?;

    delete_session(db, id).await.validate_custom()?;

    Ok(Status::NoContent)
}

#[derive(Deserialize, Validate, Debug)]
pub struct AddParticipantsRequest {
    #[validate(length(min = 1, message = "At least one player is required"))]
    player_ids: Vec<i64>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AddParticipantsResponse {
    pub added: usize,
    pub participants: Vec<ParticipantView>,
}

#[post("/sessions/<id>/participants", data = "<request>")]
pub async fn api_add_participants(
    id: i64,
    request: Json<AddParticipantsRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<AddParticipantsResponse>, ApiError> {
    user.require_permission(Permission::ManageParticipants)
        .validate_custom()?;
    managed_session(db, &user, id).await?;
    let validated = request.validate_custom()?;

    let added = add_participants(db, id, &validated.player_ids)
        .await
        .validate_custom()?;

    let participants = get_participants(db, id).await.validate_custom()?;
    Ok(Json(AddParticipantsResponse {
        added,
        participants: participants.into_iter().map(ParticipantView::from).collect(),
    }))
}

#[delete("/sessions/<id>/participants/<player_id>")]
pub async fn api_remove_participant(
    id: i64,
    player_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    user.require_permission(Permission::ManageParticipants)
        .validate_custom()?;
    managed_session(db, &user, id).await?;

    remove_participant(db, id, player_id)
        .await
        .validate_custom()?;

    Ok(Status::NoContent)
}

#[derive(Deserialize, Debug)]
pub struct ParticipantStatusRequest {
    status: ParticipantStatus,
}

#[put("/sessions/<id>/participants/<player_id>", data = "<request>")]
pub async fn api_update_participant(
    id: i64,
    player_id: i64,
    request: Json<ParticipantStatusRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ParticipantView>, ApiError> {
    let session = get_session(db, id).await.validate_custom()?;

    let actor = if can_manage(&user, &session)
        && user.has_permission(Permission::ManageParticipants)
    {
        Actor::Coach
    } else if user.id == player_id && user.has_permission(Permission::RespondToInvitations) {
        Actor::Player
    } else {
        return Err(Status::Forbidden.to_validation_response());
    };

    update_participant_status(db, id, player_id, request.status, actor)
        .await
        .validate_custom()?;

    let participant = get_participant(db, id, player_id)
        .await
        .and_then(|participant| {
            participant.ok_or_else(|| {
                AppError::NotFound(format!(
                    "Player {} is not part of session {}",
                    player_id, id
                ))
            })
        })
        .validate_custom()?;

    Ok(Json(ParticipantView::from(participant)))
}
