use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::assessment::{Derivation, SkillScores, derive};
use crate::auth::{Permission, User};
use crate::db::{
    create_assessment, delete_assessment, get_assessment, get_assessments_for_player,
    get_session, get_user,
};
use crate::models::Assessment;
use crate::validation::{ApiError, AppErrorExt, JsonValidateExt, PermissionCheckExt};

use super::{ensure_player, owns_or_admin};

#[derive(Deserialize, Validate, Debug)]
pub struct PreviewRequest {
    #[validate(nested)]
    scores: SkillScores,
}

#[derive(Deserialize, Validate, Debug)]
pub struct AssessmentRequest {
    #[validate(nested)]
    scores: SkillScores,
    #[validate(length(max = 4000, message = "Notes must be at most 4000 characters"))]
    notes: Option<String>,
    session_id: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct AssessmentResponse {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub derivation: Derivation,
}

impl From<Assessment> for AssessmentResponse {
    fn from(assessment: Assessment) -> Self {
        let derivation = derive(&assessment.scores);
        Self {
            assessment,
            derivation,
        }
    }
}

/// Scores a form without saving it.
#[post("/assessments/preview", data = "<request>")]
pub async fn api_preview_assessment(
    request: Json<PreviewRequest>,
    user: User,
) -> Result<Json<Derivation>, ApiError> {
    user.require_permission(Permission::RecordAssessments)
        .validate_custom()?;
    let validated = request.validate_custom()?;

    Ok(Json(derive(&validated.scores)))
}

#[post("/players/<player_id>/assessments", data = "<request>")]
pub async fn api_create_assessment(
    player_id: i64,
    request: Json<AssessmentRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<AssessmentResponse>>, ApiError> {
    user.require_permission(Permission::RecordAssessments)
        .validate_custom()?;
    let validated = request.validate_custom()?;

    let player = get_user(db, player_id).await.validate_custom()?;
    ensure_player(&player).validate_custom()?;

    if let Some(session_id) = validated.session_id {
        get_session(db, session_id).await.validate_custom()?;
    }

    let id = create_assessment(
        db,
        player_id,
        user.id,
        validated.session_id,
        &validated.scores,
        validated.notes.as_deref().unwrap_or_default().trim(),
    )
    .await
    .validate_custom()?;

    let assessment = get_assessment(db, id).await.validate_custom()?;
    Ok(Custom(
        Status::Created,
        Json(AssessmentResponse::from(assessment)),
    ))
}

#[get("/players/<player_id>/assessments")]
pub async fn api_get_assessments(
    player_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<AssessmentResponse>>, Status> {
    user.require_player_access(player_id)?;
    user.require_permission(Permission::ViewOwnAssessments)?;

    let assessments = get_assessments_for_player(db, player_id).await?;

    Ok(Json(
        assessments
            .into_iter()
            .map(AssessmentResponse::from)
            .collect(),
    ))
}

#[delete("/assessments/<id>")]
pub async fn api_delete_assessment(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, Status> {
    let assessment = get_assessment(db, id).await?;
    if !owns_or_admin(&user, assessment.coach_id) {
        return Err(Status::Forbidden);
    }

    delete_assessment(db, id).await?;

    Ok(Status::NoContent)
}
