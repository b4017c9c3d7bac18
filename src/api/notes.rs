use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::db::{create_note, delete_note, get_note, get_notes_for_player, get_user, update_note};
use crate::models::{Note, NoteVisibility};
use crate::validation::{
    ApiError, AppErrorExt, JsonValidateExt, PermissionCheckExt, ToValidationResponse,
    validate_not_blank,
};

use super::{ensure_player, owns_or_admin};

#[derive(Deserialize, Validate, Debug)]
pub struct NoteRequest {
    #[validate(
        length(min = 1, max = 4000, message = "Note must be 1-4000 characters"),
        custom(function = "validate_not_blank")
    )]
    body: String,
    visibility: Option<NoteVisibility>,
    session_id: Option<i64>,
}

/// A note keeps its player and session once written.
#[derive(Deserialize, Validate, Debug)]
#[serde(deny_unknown_fields)]
pub struct NoteUpdateRequest {
    #[validate(
        length(min = 1, max = 4000, message = "Note must be 1-4000 characters"),
        custom(function = "validate_not_blank")
    )]
    body: String,
    visibility: Option<NoteVisibility>,
}

#[post("/players/<player_id>/notes", data = "<request>")]
pub async fn api_create_note(
    player_id: i64,
    request: Json<NoteRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<Note>>, ApiError> {
    user.require_permission(Permission::WriteNotes)
        .validate_custom()?;
    let validated = request.validate_custom()?;

    let player = get_user(db, player_id).await.validate_custom()?;
    ensure_player(&player).validate_custom()?;

    let id = create_note(
        db,
        user.id,
        player_id,
        validated.session_id,
        validated.body.trim(),
        validated.visibility.unwrap_or(NoteVisibility::Private),
    )
    .await
    .validate_custom()?;

    let note = get_note(db, id).await.validate_custom()?;
    Ok(Custom(Status::Created, Json(note)))
}

#[get("/players/<player_id>/notes")]
pub async fn api_get_notes(
    player_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Note>>, Status> {
    user.require_player_access(player_id)?;

    let shared_only = !user.has_permission(Permission::WriteNotes);
    let notes = get_notes_for_player(db, player_id, shared_only).await?;

    Ok(Json(notes))
}

#[put("/notes/<id>", data = "<request>")]
pub async fn api_update_note(
    id: i64,
    request: Json<NoteUpdateRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Note>, ApiError> {
    let note = get_note(db, id).await.validate_custom()?;
    if !owns_or_admin(&user, note.author_id) {
        return Err(Status::Forbidden.to_validation_response());
    }
    let validated = request.validate_custom()?;

    update_note(
        db,
        id,
        validated.body.trim(),
        validated.visibility.unwrap_or(note.visibility),
    )
    .await
    .validate_custom()?;

    let updated = get_note(db, id).await.validate_custom()?;
    Ok(Json(updated))
}

#[delete("/notes/<id>")]
pub async fn api_delete_note(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    let note = get_note(db, id).await?;
    if !owns_or_admin(&user, note.author_id) {
        return Err(Status::Forbidden);
    }

    delete_note(db, id).await?;

    Ok(Status::NoContent)
}
