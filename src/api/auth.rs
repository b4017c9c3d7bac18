use chrono::Utc;
use rocket::State;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{SESSION_COOKIE, User, UserSession};
use crate::config::AppConfig;
use crate::db::{authenticate_user, create_user_session, invalidate_session};
use crate::validation::{AppErrorExt, ApiError, JsonValidateExt};

use super::UserData;

const USER_ID_COOKIE: &str = "user_id";
const USER_ROLE_COOKIE: &str = "user_role";

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserData>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct MeResponse {
    pub user: UserData,
    pub permissions: Vec<String>,
}

fn login_cookie(name: &'static str, value: String, ttl_hours: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .same_site(SameSite::Lax)
        .http_only(true)
        .max_age(rocket::time::Duration::hours(ttl_hours))
        .build()
}

#[post("/login", data = "<login>")]
pub async fn api_login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<LoginResponse>, ApiError> {
    let validated = login.validate_custom()?;

    let Some(user) = authenticate_user(db, &validated.username, &validated.password)
        .await
        .validate_custom()?
    else {
        return Ok(Json(LoginResponse {
            success: false,
            user: None,
            error: Some("Invalid username or password".to_string()),
        }));
    };

    let token = UserSession::generate_token();
    let expires_at = Utc::now() + chrono::Duration::hours(config.login_ttl_hours);

    create_user_session(db, user.id, &token, expires_at.naive_utc())
        .await
        .validate_custom()?;

    let ttl = config.login_ttl_hours;
    cookies.add_private(login_cookie(SESSION_COOKIE, token, ttl));
    cookies.add_private(login_cookie(USER_ID_COOKIE, user.id.to_string(), ttl));
    cookies.add_private(login_cookie(USER_ROLE_COOKIE, user.role.to_string(), ttl));

    Ok(Json(LoginResponse {
        success: true,
        user: Some(UserData::from(user)),
        error: None,
    }))
}

#[post("/logout")]
pub async fn api_logout(cookies: &CookieJar<'_>, db: &State<Pool<Sqlite>>) -> Status {
    if let Some(token) = cookies
        .get_private(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
    {
        if let Err(err) = invalidate_session(db, &token).await {
            err.log_and_record("Logout");
        }
    }

    for name in [SESSION_COOKIE, USER_ID_COOKIE, USER_ROLE_COOKIE] {
        cookies.remove_private(Cookie::build(name));
    }

    Status::Ok
}

#[get("/me")]
pub async fn api_me(user: User) -> Json<MeResponse> {
    let mut permissions: Vec<String> = user
        .role
        .permissions()
        .iter()
        .map(|permission| format!("{:?}", permission))
        .collect();
    permissions.sort();

    Json(MeResponse {
        user: UserData::from(user),
        permissions,
    })
}

#[get("/me", rank = 2)]
pub async fn api_me_unauthorized() -> Status {
    Status::Unauthorized
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
