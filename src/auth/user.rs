use rocket::http::Status;
use serde::Serialize;

use crate::error::AppError;

use super::{Permission, Role};

#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub display_name: String,
    pub phone: Option<String>,
    pub dominant_hand: Option<String>,
    pub preferred_side: Option<String>,
    pub archived: bool,
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct DbUser {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub role: Option<String>,
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub dominant_hand: Option<String>,
    pub preferred_side: Option<String>,
    pub archived: Option<bool>,
}

impl TryFrom<DbUser> for User {
    type Error = AppError;

    fn try_from(user: DbUser) -> Result<Self, Self::Error> {
        let role = user
            .role
            .unwrap_or_default()
            .parse::<Role>()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let username = user.username.unwrap_or_default();
        let display_name = user
            .display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| username.clone());

        Ok(Self {
            id: user.id.unwrap_or_default(),
            username,
            role,
            display_name,
            phone: user.phone,
            dominant_hand: user.dominant_hand,
            preferred_side: user.preferred_side,
            archived: user.archived.unwrap_or_default(),
        })
    }
}

impl User {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.has_permission(permission)
    }

    pub fn require_permission(&self, permission: Permission) -> Result<(), Status> {
        if self.role.has_permission(permission) {
            Ok(())
        } else {
            tracing::warn!(
                username = %self.username,
                role = %self.role.as_str(),
                permission = ?permission,
                "Permission denied"
            );
            Err(Status::Forbidden)
        }
    }

    /// Players may read their own records; everyone else needs `ViewAllPlayers`.
    pub fn require_player_access(&self, player_id: i64) -> Result<(), Status> {
        if self.id == player_id {
            return Ok(());
        }
        self.require_permission(Permission::ViewAllPlayers)
    }
}
