use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::assessment::{Archetype, Grade, SkillScores};
use crate::error::AppError;

fn to_utc(dt: Option<NaiveDateTime>) -> DateTime<Utc> {
    dt.map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .unwrap_or_else(Utc::now)
}

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(AppError::Validation(format!(
                        "Unknown {}: {}",
                        stringify!($name),
                        s
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(SessionKind {
    Private => "private",
    Group => "group",
    Clinic => "clinic",
});

string_enum!(SessionStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});

string_enum!(ParticipantStatus {
    Invited => "invited",
    Confirmed => "confirmed",
    Declined => "declined",
    Attended => "attended",
    NoShow => "no_show",
});

string_enum!(NoteVisibility {
    Private => "private",
    Shared => "shared",
});

impl ParticipantStatus {
    /// Active participants hold a place against the session capacity.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ParticipantStatus::Invited | ParticipantStatus::Confirmed | ParticipantStatus::Attended
        )
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct CoachingSession {
    pub id: i64,
    pub coach_id: i64,
    pub coach_name: String,
    pub title: String,
    pub kind: SessionKind,
    pub court: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub capacity: i64,
    pub status: SessionStatus,
    pub focus_module: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CoachingSession {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes(self.duration_minutes)
    }
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct DbCoachingSession {
    pub id: Option<i64>,
    pub coach_id: Option<i64>,
    pub coach_name: Option<String>,
    pub title: Option<String>,
    pub kind: Option<String>,
    pub court: Option<String>,
    pub starts_at: Option<NaiveDateTime>,
    pub duration_minutes: Option<i64>,
    pub capacity: Option<i64>,
    pub status: Option<String>,
    pub focus_module: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TryFrom<DbCoachingSession> for CoachingSession {
    type Error = AppError;

    fn try_from(db: DbCoachingSession) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db.id.unwrap_or_default(),
            coach_id: db.coach_id.unwrap_or_default(),
            coach_name: db.coach_name.unwrap_or_default(),
            title: db.title.unwrap_or_default(),
            kind: db.kind.unwrap_or_default().parse()?,
            court: db.court,
            starts_at: to_utc(db.starts_at),
            duration_minutes: db.duration_minutes.unwrap_or_default(),
            capacity: db.capacity.unwrap_or_default(),
            status: db.status.unwrap_or_default().parse()?,
            focus_module: db.focus_module,
            created_at: to_utc(db.created_at),
            updated_at: to_utc(db.updated_at),
        })
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Participant {
    pub session_id: i64,
    pub player_id: i64,
    pub player_name: String,
    pub status: ParticipantStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct DbParticipant {
    pub session_id: Option<i64>,
    pub player_id: Option<i64>,
    pub player_name: Option<String>,
    pub status: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TryFrom<DbParticipant> for Participant {
    type Error = AppError;

    fn try_from(db: DbParticipant) -> Result<Self, Self::Error> {
        Ok(Self {
            session_id: db.session_id.unwrap_or_default(),
            player_id: db.player_id.unwrap_or_default(),
            player_name: db.player_name.unwrap_or_default(),
            status: db.status.unwrap_or_default().parse()?,
            updated_at: to_utc(db.updated_at),
        })
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Note {
    pub id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub player_id: i64,
    pub session_id: Option<i64>,
    pub body: String,
    pub visibility: NoteVisibility,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct DbNote {
    pub id: Option<i64>,
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub player_id: Option<i64>,
    pub session_id: Option<i64>,
    pub body: Option<String>,
    pub visibility: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TryFrom<DbNote> for Note {
    type Error = AppError;

    fn try_from(db: DbNote) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db.id.unwrap_or_default(),
            author_id: db.author_id.unwrap_or_default(),
            author_name: db.author_name.unwrap_or_default(),
            player_id: db.player_id.unwrap_or_default(),
            session_id: db.session_id,
            body: db.body.unwrap_or_default(),
            visibility: db.visibility.unwrap_or_default().parse()?,
            created_at: to_utc(db.created_at),
            updated_at: to_utc(db.updated_at),
        })
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Assessment {
    pub id: i64,
    pub player_id: i64,
    pub coach_id: i64,
    pub session_id: Option<i64>,
    pub scores: SkillScores,
    pub grade: Grade,
    pub archetype: Archetype,
    pub notes: String,
    pub assessed_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct DbAssessment {
    pub id: Option<i64>,
    pub player_id: Option<i64>,
    pub coach_id: Option<i64>,
    pub session_id: Option<i64>,
    pub technique: Option<i64>,
    pub tactics: Option<i64>,
    pub power: Option<i64>,
    pub defense: Option<i64>,
    pub consistency: Option<i64>,
    pub grade: Option<String>,
    pub archetype: Option<String>,
    pub notes: Option<String>,
    pub assessed_at: Option<NaiveDateTime>,
}

fn score_column(value: Option<i64>, column: &str) -> Result<u8, AppError> {
    value
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| AppError::Internal(format!("Assessment column {} is out of range", column)))
}

impl TryFrom<DbAssessment> for Assessment {
    type Error = AppError;

    fn try_from(db: DbAssessment) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db.id.unwrap_or_default(),
            player_id: db.player_id.unwrap_or_default(),
            coach_id: db.coach_id.unwrap_or_default(),
            session_id: db.session_id,
            scores: SkillScores {
                technique: score_column(db.technique, "technique")?,
                tactics: score_column(db.tactics, "tactics")?,
                power: score_column(db.power, "power")?,
                defense: score_column(db.defense, "defense")?,
                consistency: score_column(db.consistency, "consistency")?,
            },
            grade: db.grade.unwrap_or_default().parse()?,
            archetype: db.archetype.unwrap_or_default().parse()?,
            notes: db.notes.unwrap_or_default(),
            assessed_at: to_utc(db.assessed_at),
        })
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct DrillScore {
    pub id: i64,
    pub player_id: i64,
    pub coach_id: i64,
    pub session_id: Option<i64>,
    pub module_code: String,
    pub drill_code: String,
    pub score: u8,
    pub recorded_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Debug)]
pub struct DbDrillScore {
    pub id: Option<i64>,
    pub player_id: Option<i64>,
    pub coach_id: Option<i64>,
    pub session_id: Option<i64>,
    pub module_code: Option<String>,
    pub drill_code: Option<String>,
    pub score: Option<i64>,
    pub recorded_at: Option<NaiveDateTime>,
}

impl TryFrom<DbDrillScore> for DrillScore {
    type Error = AppError;

    fn try_from(db: DbDrillScore) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db.id.unwrap_or_default(),
            player_id: db.player_id.unwrap_or_default(),
            coach_id: db.coach_id.unwrap_or_default(),
            session_id: db.session_id,
            module_code: db.module_code.unwrap_or_default(),
            drill_code: db.drill_code.unwrap_or_default(),
            score: score_column(db.score, "score")?,
            recorded_at: to_utc(db.recorded_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_enums_round_trip_through_text() {
        assert_eq!("no_show".parse::<ParticipantStatus>().unwrap(), ParticipantStatus::NoShow);
        assert_eq!(SessionStatus::Cancelled.to_string(), "cancelled");
        assert!("postponed".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_active_participants() {
        assert!(ParticipantStatus::Invited.is_active());
        assert!(ParticipantStatus::Attended.is_active());
        assert!(!ParticipantStatus::Declined.is_active());
        assert!(!ParticipantStatus::NoShow.is_active());
    }

    #[test]
    fn test_out_of_range_score_column() {
        assert!(score_column(Some(300), "power").is_err());
        assert!(score_column(None, "power").is_err());
        assert_eq!(score_column(Some(7), "power").unwrap(), 7);
    }
}
