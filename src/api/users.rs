use chrono::{DateTime, Utc};
use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::assessment::{Archetype, Grade};
use crate::auth::{Permission, Role, User};
use crate::db::{
    AccountChanges, ProfileChanges, authenticate_user, create_user, find_user_by_username,
    get_all_users, get_latest_assessment, get_players, get_user, update_account, update_profile,
    update_user_password,
};
use crate::validation::{
    ApiError, AppErrorExt, JsonValidateExt, PermissionCheckExt, ValidationResponse,
    validate_hand, validate_not_blank, validate_side, validate_username,
};

use super::UserData;

fn field_error(status: Status, field: &str, message: &str) -> ApiError {
    Custom(status, Json(ValidationResponse::with_error(field, message)))
}

/// Blank optional fields clear the stored value.
fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[get("/profile")]
pub async fn api_get_profile(user: User) -> Result<Json<UserData>, Status> {
    user.require_permission(Permission::ViewOwnProfile)?;
    Ok(Json(UserData::from(user)))
}

#[derive(Deserialize, Validate)]
pub struct ProfileUpdateRequest {
    #[validate(
        length(min = 1, max = 100, message = "Display name must be 1-100 characters"),
        custom(function = "validate_not_blank")
    )]
    display_name: String,
    #[validate(length(max = 32, message = "Phone number is too long"))]
    phone: Option<String>,
    #[validate(custom(function = "validate_hand"))]
    dominant_hand: Option<String>,
    #[validate(custom(function = "validate_side"))]
    preferred_side: Option<String>,
}

#[put("/profile", data = "<profile>")]
pub async fn api_update_profile(
    profile: Json<ProfileUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UserData>, ApiError> {
    user.require_permission(Permission::EditOwnProfile)
        .validate_custom()?;
    let validated = profile.validate_custom()?;

    let changes = ProfileChanges {
        display_name: validated.display_name.trim(),
        phone: optional(&validated.phone),
        dominant_hand: optional(&validated.dominant_hand),
        preferred_side: optional(&validated.preferred_side),
    };

    update_profile(db, user.id, &changes).await.validate_custom()?;

    let updated = get_user(db, user.id).await.validate_custom()?;
    Ok(Json(UserData::from(updated)))
}

#[derive(Deserialize, Validate)]
pub struct PasswordChangeRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    current_password: String,
    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    new_password: String,
}

#[post("/change-password", data = "<password>")]
pub async fn api_change_password(
    password: Json<PasswordChangeRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, ApiError> {
    let validated = password.validate_custom()?;

    let verified = authenticate_user(db, &user.username, &validated.current_password)
        .await
        .validate_custom()?;

    if verified.is_none() {
        return Err(field_error(
            Status::Unauthorized,
            "current_password",
            "Current password is incorrect",
        ));
    }

    update_user_password(db, user.id, &validated.new_password)
        .await
        .validate_custom()?;

    Ok(Status::Ok)
}

#[derive(Deserialize, Validate)]
pub struct UserRegistrationRequest {
    #[validate(custom(function = "validate_username"))]
    username: String,
    #[validate(
        length(min = 1, max = 100, message = "Display name must be 1-100 characters"),
        custom(function = "validate_not_blank")
    )]
    display_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
    role: String,
}

#[post("/register", data = "<registration>")]
pub async fn api_register_user(
    registration: Json<UserRegistrationRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<UserData>>, ApiError> {
    let validated = registration.validate_custom()?;

    let role: Role = validated
        .role
        .parse()
        .map_err(|_| field_error(Status::UnprocessableEntity, "role", "Unknown role"))?;

    let needed = match role {
        Role::Player => Permission::RegisterPlayers,
        Role::Coach | Role::Admin => Permission::RegisterStaff,
    };
    user.require_permission(needed).validate_custom()?;

    if find_user_by_username(db, &validated.username)
        .await
        .validate_custom()?
        .is_some()
    {
        return Err(field_error(
            Status::Conflict,
            "username",
            "Username already exists",
        ));
    }

    let id = create_user(
        db,
        &validated.username,
        &validated.password,
        role,
        Some(validated.display_name.trim()),
    )
    .await
    .validate_custom()?;

    let created = get_user(db, id).await.validate_custom()?;
    Ok(Custom(Status::Created, Json(UserData::from(created))))
}

#[derive(FromForm)]
pub struct PlayersQueryParams {
    include_archived: Option<bool>,
}

#[get("/players?<params..>")]
pub async fn api_get_players(
    params: PlayersQueryParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<UserData>>, Status> {
    user.require_permission(Permission::ViewAllPlayers)?;

    let players = get_players(db, params.include_archived.unwrap_or(false)).await?;

    Ok(Json(players.into_iter().map(UserData::from).collect()))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AssessmentSummary {
    pub id: i64,
    pub grade: Grade,
    pub archetype: Archetype,
    pub total: u32,
    pub assessed_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PlayerResponse {
    #[serde(flatten)]
    pub player: UserData,
    pub latest_assessment: Option<AssessmentSummary>,
}

#[get("/players/<id>")]
pub async fn api_get_player(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<PlayerResponse>, Status> {
    user.require_player_access(id)?;

    let player = get_user(db, id).await?;
    if player.role != Role::Player {
        return Err(Status::NotFound);
    }

    let latest_assessment = get_latest_assessment(db, id)
        .await?
        .map(|assessment| AssessmentSummary {
            id: assessment.id,
            grade: assessment.grade,
            archetype: assessment.archetype,
            total: assessment.scores.total(),
            assessed_at: assessment.assessed_at,
        });

    Ok(Json(PlayerResponse {
        player: UserData::from(player),
        latest_assessment,
    }))
}

#[get("/admin/users")]
pub async fn api_get_all_users(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<UserData>>, Status> {
    user.require_permission(Permission::ManageUsers)?;

    let users = get_all_users(db).await?;

    Ok(Json(users.into_iter().map(UserData::from).collect()))
}

#[derive(Deserialize, Validate)]
pub struct UserUpdateRequest {
    #[validate(custom(function = "validate_username"))]
    username: Option<String>,
    #[validate(
        length(min = 1, max = 100, message = "Display name must be 1-100 characters"),
        custom(function = "validate_not_blank")
    )]
    display_name: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: Option<String>,
    archived: Option<bool>,
    role: Option<String>,
}

#[put("/admin/users/<id>", data = "<update>")]
pub async fn api_update_user(
    id: i64,
    update: Json<UserUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UserData>, ApiError> {
    user.require_permission(Permission::ManageUsers)
        .validate_custom()?;
    let validated = update.validate_custom()?;

    let role = match validated.role.as_deref() {
        Some(role) => Some(
            role.parse::<Role>()
                .map_err(|_| field_error(Status::UnprocessableEntity, "role", "Unknown role"))?,
        ),
        None => None,
    };

    if id == user.id {
        if validated.archived == Some(true) {
            return Err(field_error(
                Status::BadRequest,
                "archived",
                "You cannot archive your own account",
            ));
        }
        if role.is_some_and(|role| role != user.role) {
            return Err(field_error(
                Status::BadRequest,
                "role",
                "You cannot change your own role",
            ));
        }
    }

    get_user(db, id).await.validate_custom()?;

    let changes = AccountChanges {
        display_name: validated.display_name.as_deref().map(str::trim),
        username: validated.username.as_deref(),
        password: validated.password.as_deref(),
        archived: validated.archived,
        role,
    };
    update_account(db, id, &changes).await.validate_custom()?;

    let updated = get_user(db, id).await.validate_custom()?;
    Ok(Json(UserData::from(updated)))
}
