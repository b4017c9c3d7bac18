use rocket::State;
use rocket::http::Status;
use rocket::serde::json::Json;
use sqlx::{Pool, Sqlite};

use crate::auth::{Permission, User};
use crate::db::{count_attended_sessions, get_assessments_for_player, get_user};
use crate::progress::ProgressReport;

#[get("/players/<player_id>/progress")]
pub async fn api_get_progress(
    player_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ProgressReport>, Status> {
    user.require_player_access(player_id)?;
    user.require_permission(Permission::ViewOwnProgress)?;

    get_user(db, player_id).await?;

    let assessments = get_assessments_for_player(db, player_id).await?;
    let attended = count_attended_sessions(db, player_id).await?;

    Ok(Json(ProgressReport::build(player_id, &assessments, attended)))
}
