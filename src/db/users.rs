use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use crate::auth::{DbUser, Role, User};
use crate::error::AppError;

const USER_COLUMNS: &str =
    "id, username, role, display_name, phone, dominant_hand, preferred_side, archived";

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges<'a> {
    pub display_name: &'a str,
    pub phone: Option<&'a str>,
    pub dominant_hand: Option<&'a str>,
    pub preferred_side: Option<&'a str>,
}

fn to_users(rows: Vec<DbUser>) -> Result<Vec<User>, AppError> {
    rows.into_iter().map(User::try_from).collect()
}

#[instrument]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => User::try_from(user),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument]
pub async fn find_user_by_username(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<Option<User>, AppError> {
    info!("Finding user by username");
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    row.map(User::try_from).transpose()
}

/// Returns the user only when the password matches and the account is not archived.
#[instrument(skip_all, fields(username))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");
    let hash: Option<String> = sqlx::query_scalar("SELECT password FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    let Some(hash) = hash else {
        return Ok(None);
    };

    if !bcrypt::verify(password, &hash).unwrap_or(false) {
        return Ok(None);
    }

    match find_user_by_username(pool, username).await? {
        Some(user) if !user.archived => Ok(Some(user)),
        _ => Ok(None),
    }
}

#[instrument(skip_all, fields(username, role = %role))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
    role: Role,
    display_name: Option<&str>,
) -> Result<i64, AppError> {
    info!("Creating new user");

    if find_user_by_username(pool, username).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Username '{}' already exists",
            username
        )));
    }

    let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

    let res = sqlx::query(
        "INSERT INTO users (username, password, role, display_name) VALUES (?, ?, ?, ?)",
    )
    .bind(username)
    .bind(hashed_password)
    .bind(role.as_str())
    .bind(display_name)
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument]
pub async fn update_profile(
    pool: &Pool<Sqlite>,
    user_id: i64,
    changes: &ProfileChanges<'_>,
) -> Result<(), AppError> {
    info!("Updating user profile");
    let res = sqlx::query(
        "UPDATE users
         SET display_name = ?, phone = ?, dominant_hand = ?, preferred_side = ?
         WHERE id = ?",
    )
    .bind(changes.display_name)
    .bind(changes.phone)
    .bind(changes.dominant_hand)
    .bind(changes.preferred_side)
    .bind(user_id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct AccountChanges<'a> {
    pub display_name: Option<&'a str>,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub archived: Option<bool>,
    pub role: Option<Role>,
}

/// Applies an admin's account edit as a single transaction.
#[instrument(skip_all, fields(user_id))]
pub async fn update_account(
    pool: &Pool<Sqlite>,
    user_id: i64,
    changes: &AccountChanges<'_>,
) -> Result<(), AppError> {
    info!("Updating user account");
    let hashed_password = changes
        .password
        .map(|password| bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .transpose()?;

    let mut tx = pool.begin().await?;

    if let Some(display_name) = changes.display_name {
        sqlx::query("UPDATE users SET display_name = ? WHERE id = ?")
            .bind(display_name)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(username) = changes.username {
        write_username(&mut tx, user_id, username).await?;
    }

    if let Some(hashed_password) = hashed_password {
        sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(hashed_password)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(archived) = changes.archived {
        write_archived(&mut tx, user_id, archived).await?;
    }

    if let Some(role) = changes.role {
        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

#[instrument(skip_all, fields(user_id))]
pub async fn update_user_password(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new_password: &str,
) -> Result<(), AppError> {
    info!("Updating user password");
    let hashed_password = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)?;

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(hashed_password)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

async fn write_username(
    conn: &mut SqliteConnection,
    user_id: i64,
    new_username: &str,
) -> Result<(), AppError> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM users WHERE username = ? AND id != ?")
            .bind(new_username)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    sqlx::query("UPDATE users SET username = ? WHERE id = ?")
        .bind(new_username)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

#[instrument]
pub async fn update_username(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new_username: &str,
) -> Result<(), AppError> {
    info!("Updating user username");
    let mut conn = pool.acquire().await?;
    write_username(&mut conn, user_id, new_username).await
}

async fn write_archived(
    conn: &mut SqliteConnection,
    user_id: i64,
    archive: bool,
) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET archived = ? WHERE id = ?")
        .bind(archive)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if archive {
        // Archived accounts lose their open logins.
        sqlx::query("DELETE FROM user_sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

#[instrument]
pub async fn set_user_archived(
    pool: &Pool<Sqlite>,
    user_id: i64,
    archive: bool,
) -> Result<bool, AppError> {
    info!("Toggling user archived status");

    let mut tx = pool.begin().await?;
    write_archived(&mut tx, user_id, archive).await?;
    tx.commit().await?;

    Ok(archive)
}

#[instrument]
pub async fn get_players(
    pool: &Pool<Sqlite>,
    include_archived: bool,
) -> Result<Vec<User>, AppError> {
    info!(include_archived = %include_archived, "Getting players");

    let filter = if include_archived {
        ""
    } else {
        " AND archived IS 0"
    };

    let rows = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users WHERE role = 'player'{} ORDER BY COALESCE(display_name, username)",
        USER_COLUMNS, filter
    ))
    .fetch_all(pool)
    .await?;

    to_users(rows)
}

#[instrument]
pub async fn get_all_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, AppError> {
    info!("Getting all users");
    let rows = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users ORDER BY role, username",
        USER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    to_users(rows)
}
