use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::config::AppConfig;
use crate::curriculum::{self, Module};
use crate::db::{get_drill_scores_for_player, get_session, get_user, record_drill_score};
use crate::progress::{ModuleProgress, module_progress};
use crate::validation::{ApiError, AppErrorExt, JsonValidateExt, PermissionCheckExt};

use super::{CreatedResponse, ensure_player};

#[get("/curriculum")]
pub async fn api_get_curriculum(user: User) -> Result<Json<&'static [Module]>, Status> {
    user.require_permission(Permission::ViewCurriculum)?;
    Ok(Json(curriculum::all_modules()))
}

#[get("/curriculum/<code>")]
pub async fn api_get_module(code: &str, user: User) -> Result<Json<&'static Module>, Status> {
    user.require_permission(Permission::ViewCurriculum)?;
    curriculum::find_module(code)
        .map(Json)
        .ok_or(Status::NotFound)
}

#[derive(Deserialize, Validate, Debug)]
pub struct DrillScoreRequest {
    #[validate(length(min = 1, message = "Drill code is required"))]
    drill_code: String,
    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10"))]
    score: u8,
    session_id: Option<i64>,
}

#[post("/players/<player_id>/drill_scores", data = "<request>")]
pub async fn api_record_drill_score(
    player_id: i64,
    request: Json<DrillScoreRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<CreatedResponse>>, ApiError> {
    user.require_permission(Permission::RecordDrillScores)
        .validate_custom()?;
    let validated = request.validate_custom()?;

    let player = get_user(db, player_id).await.validate_custom()?;
    ensure_player(&player).validate_custom()?;

    if let Some(session_id) = validated.session_id {
        get_session(db, session_id).await.validate_custom()?;
    }

    let id = record_drill_score(
        db,
        player_id,
        user.id,
        validated.session_id,
        validated.drill_code.trim(),
        validated.score,
    )
    .await
    .validate_custom()?;

    Ok(Custom(Status::Created, Json(CreatedResponse { id })))
}

#[get("/players/<player_id>/modules")]
pub async fn api_get_module_progress(
    player_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<Vec<ModuleProgress>>, Status> {
    user.require_player_access(player_id)?;
    user.require_permission(Permission::ViewOwnProgress)?;

    let scores = get_drill_scores_for_player(db, player_id).await?;

    Ok(Json(module_progress(&scores, config.mastery_threshold)))
}
