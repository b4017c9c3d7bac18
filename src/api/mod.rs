use chrono::{Duration, NaiveDate, NaiveDateTime};
use rocket::Route;
use rocket::serde::{Deserialize, Serialize};

use crate::auth::{Permission, Role, User};
use crate::error::AppError;

pub mod assessments;
pub mod auth;
pub mod curriculum;
pub mod notes;
pub mod progress;
pub mod sessions;
pub mod users;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserData {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub phone: Option<String>,
    pub dominant_hand: Option<String>,
    pub preferred_side: Option<String>,
    pub archived: bool,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            role: user.role.to_string(),
            phone: user.phone,
            dominant_hand: user.dominant_hand,
            preferred_side: user.preferred_side,
            archived: user.archived,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreatedResponse {
    pub id: i64,
}

/// Assessments, drill scores and notes only attach to player accounts.
pub(crate) fn ensure_player(user: &User) -> Result<(), AppError> {
    if user.role == Role::Player {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "User {} is not a player",
            user.username
        )))
    }
}

/// Admins may act on any record; otherwise only the record's owner may.
pub(crate) fn owns_or_admin(user: &User, owner_id: i64) -> bool {
    user.id == owner_id || user.has_permission(Permission::ManageUsers)
}

/// Parses a `YYYY-MM-DD` date into the start of that day.
pub(crate) fn start_of_day(value: &str) -> Result<NaiveDateTime, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(chrono::NaiveTime::MIN))
        .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", value)))
}

/// The exclusive upper bound for a range ending on `value`.
pub(crate) fn end_of_day(value: &str) -> Result<NaiveDateTime, AppError> {
    Ok(start_of_day(value)? + Duration::days(1))
}

pub fn routes() -> Vec<Route> {
    routes![
        auth::api_login,
        auth::api_logout,
        auth::api_me,
        auth::api_me_unauthorized,
        auth::health,
        users::api_get_profile,
        users::api_update_profile,
        users::api_change_password,
        users::api_register_user,
        users::api_get_players,
        users::api_get_player,
        users::api_get_all_users,
        users::api_update_user,
        sessions::api_create_session,
        sessions::api_list_sessions,
        sessions::api_get_session,
        sessions::api_update_session,
        sessions::api_set_session_status,
        sessions::api_delete_session,
        sessions::api_add_participants,
        sessions::api_remove_participant,
        sessions::api_update_participant,
        notes::api_create_note,
        notes::api_get_notes,
        notes::api_update_note,
        notes::api_delete_note,
        assessments::api_preview_assessment,
        assessments::api_create_assessment,
        assessments::api_get_assessments,
        assessments::api_delete_assessment,
        curriculum::api_get_curriculum,
        curriculum::api_get_module,
        curriculum::api_record_drill_score,
        curriculum::api_get_module_progress,
        progress::api_get_progress,
    ]
}
