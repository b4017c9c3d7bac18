use chrono::{DateTime, Duration, Utc};

use crate::curriculum;
use crate::error::AppError;
use crate::models::{CoachingSession, ParticipantStatus, SessionKind, SessionStatus};

pub const MIN_DURATION_MINUTES: i64 = 15;
pub const MAX_DURATION_MINUTES: i64 = 240;
pub const MAX_CAPACITY: i64 = 16;
pub const PRIVATE_CAPACITY: i64 = 2;

/// Who is asking for a participant status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Player,
    Coach,
}

#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub title: String,
    pub kind: SessionKind,
    pub court: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub capacity: i64,
    pub focus_module: Option<String>,
}

impl SessionPlan {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes(self.duration_minutes)
    }

    pub fn check(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(AppError::Validation(format!(
                "Duration must be between {} and {} minutes",
                MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
            )));
        }
        if !(1..=MAX_CAPACITY).contains(&self.capacity) {
            return Err(AppError::Validation(format!(
                "Capacity must be between 1 and {}",
                MAX_CAPACITY
            )));
        }
        if self.kind == SessionKind::Private && self.capacity > PRIVATE_CAPACITY {
            return Err(AppError::Validation(format!(
                "Private sessions take at most {} players",
                PRIVATE_CAPACITY
            )));
        }
        if let Some(code) = &self.focus_module {
            if curriculum::find_module(code).is_none() {
                return Err(AppError::Validation(format!(
                    "Unknown curriculum module: {}",
                    code
                )));
            }
        }
        Ok(())
    }
}

/// Half-open intervals: a session ending at 10:00 does not clash with one starting at 10:00.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn find_clash<'a>(
    plan: &SessionPlan,
    existing: &'a [CoachingSession],
    ignore_id: Option<i64>,
) -> Option<&'a CoachingSession> {
    existing.iter().find(|session| {
        Some(session.id) != ignore_id
            && session.status == SessionStatus::Scheduled
            && overlaps(
                plan.starts_at,
                plan.ends_at(),
                session.starts_at,
                session.ends_at(),
            )
    })
}

pub fn check_session_transition(from: SessionStatus, to: SessionStatus) -> Result<(), AppError> {
    match (from, to) {
        (SessionStatus::Scheduled, SessionStatus::Completed)
        | (SessionStatus::Scheduled, SessionStatus::Cancelled) => Ok(()),
        _ => Err(AppError::Validation(format!(
            "Cannot move a session from {} to {}",
            from, to
        ))),
    }
}

/// Participant status changes allowed for `actor` while the session is in `session_status`.
pub fn check_participant_transition(
    from: ParticipantStatus,
    to: ParticipantStatus,
    actor: Actor,
    session_status: SessionStatus,
) -> Result<(), AppError> {
    use crate::models::ParticipantStatus::*;

    let attendance = matches!(to, Attended | NoShow);

    let allowed = match (from, to) {
        (Invited, Confirmed)
        | (Invited, Declined)
        | (Confirmed, Declined)
        | (Declined, Confirmed) => true,
        (Invited, Attended) | (Invited, NoShow) | (Confirmed, Attended) | (Confirmed, NoShow) => {
            actor == Actor::Coach
        }
        (Attended, NoShow) | (NoShow, Attended) => actor == Actor::Coach,
        _ => false,
    };

    if !allowed {
        return Err(AppError::Validation(format!(
            "Cannot change participant status from {} to {}",
            from, to
        )));
    }

    if attendance {
        if session_status == SessionStatus::Cancelled {
            return Err(AppError::Validation(
                "Attendance cannot be recorded for a cancelled session".to_string(),
            ));
        }
    } else if session_status != SessionStatus::Scheduled {
        return Err(AppError::Validation(format!(
            "Responses are closed for a {} session",
            session_status
        )));
    }

    Ok(())
}

/// Only a declined player coming back takes a new place. Attendance corrections never do.
pub fn needs_free_place(from: ParticipantStatus, to: ParticipantStatus) -> bool {
    from == ParticipantStatus::Declined && to.is_active()
}
