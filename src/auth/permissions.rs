use anyhow::Error;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewOwnProfile,
    EditOwnProfile,
    ViewOwnSessions,
    RespondToInvitations,
    ViewOwnAssessments,
    ViewOwnProgress,
    ViewCurriculum,

    ViewAllPlayers,
    ManageSessions,
    ManageParticipants,
    WriteNotes,
    RecordAssessments,
    RecordDrillScores,
    RegisterPlayers,

    ManageAllSessions,
    ManageUsers,
    RegisterStaff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player,
    Coach,
    Admin,
}

static PLAYER_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewOwnProfile);
    permissions.insert(Permission::EditOwnProfile);
    permissions.insert(Permission::ViewOwnSessions);
    permissions.insert(Permission::RespondToInvitations);
    permissions.insert(Permission::ViewOwnAssessments);
    permissions.insert(Permission::ViewOwnProgress);
    permissions.insert(Permission::ViewCurriculum);

    permissions
});

static COACH_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(PLAYER_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ViewAllPlayers);
    permissions.insert(Permission::ManageSessions);
    permissions.insert(Permission::ManageParticipants);
    permissions.insert(Permission::WriteNotes);
    permissions.insert(Permission::RecordAssessments);
    permissions.insert(Permission::RecordDrillScores);
    permissions.insert(Permission::RegisterPlayers);

    permissions
});

static ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(COACH_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ManageAllSessions);
    permissions.insert(Permission::ManageUsers);
    permissions.insert(Permission::RegisterStaff);

    permissions
});

impl Role {
    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Player => &PLAYER_PERMISSIONS,
            Role::Coach => &COACH_PERMISSIONS,
            Role::Admin => &ADMIN_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Coach => "coach",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(Role::Player),
            "coach" => Ok(Role::Coach),
            "admin" => Ok(Role::Admin),
            _ => Err(Error::msg(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions_are_cumulative() {
        for permission in Role::Player.permissions() {
            assert!(Role::Coach.has_permission(*permission));
        }
        for permission in Role::Coach.permissions() {
            assert!(Role::Admin.has_permission(*permission));
        }
    }

    #[test]
    fn test_role_boundaries() {
        assert!(!Role::Player.has_permission(Permission::ManageSessions));
        assert!(Role::Coach.has_permission(Permission::RecordAssessments));
        assert!(!Role::Coach.has_permission(Permission::RegisterStaff));
        assert!(Role::Admin.has_permission(Permission::ManageUsers));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("coach".parse::<Role>().unwrap(), Role::Coach);
        assert_eq!(Role::Player.to_string(), "player");
        assert!("student".parse::<Role>().is_err());
    }
}
