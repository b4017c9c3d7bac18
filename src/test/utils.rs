#[cfg(test)]
pub mod test_db {
    use crate::assessment::SkillScores;
    use crate::auth::Role;
    use crate::db::{
        add_participants, create_assessment_at, create_session, create_user, set_user_archived,
    };
    use crate::error::AppError;
    use crate::models::{ParticipantStatus, SessionKind};
    use crate::schedule::SessionPlan;
    use chrono::{DateTime, Duration, NaiveDateTime, Utc};
    use sqlx::{Pool, Sqlite, SqlitePool};
    use std::collections::HashMap;
    use std::sync::Once;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        users: Vec<TestUser>,
        sessions: Vec<TestSession>,
        participants: Vec<TestParticipant>,
        assessments: Vec<TestAssessment>,
    }

    pub struct TestUser {
        pub username: String,
        pub display_name: Option<String>,
        pub role: Role,
        pub password: String,
        pub archived: bool,
    }

    pub struct TestSession {
        pub title: String,
        pub coach_username: String,
        pub kind: SessionKind,
        pub starts_at: DateTime<Utc>,
        pub duration_minutes: i64,
        pub capacity: i64,
    }

    pub struct TestParticipant {
        pub session_title: String,
        pub player_username: String,
        pub status: ParticipantStatus,
    }

    pub struct TestAssessment {
        pub player_username: String,
        pub coach_username: String,
        pub scores: SkillScores,
        pub assessed_at: NaiveDateTime,
    }

    pub fn scores(
        technique: u8,
        tactics: u8,
        power: u8,
        defense: u8,
        consistency: u8,
    ) -> SkillScores {
        SkillScores {
            technique,
            tactics,
            power,
            defense,
            consistency,
        }
    }

    /// The top of the current hour plus `hours`, stable across calls within a test.
    pub fn hours_from_now(hours: i64) -> DateTime<Utc> {
        let now = Utc::now().timestamp();
        let hour = DateTime::<Utc>::from_timestamp(now - now % 3600, 0).expect("valid timestamp");
        hour + Duration::hours(hours)
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        fn user(mut self, username: &str, display_name: Option<&str>, role: Role) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                display_name: display_name.map(String::from),
                role,
                password: STANDARD_PASSWORD.to_string(),
                archived: false,
            });
            self
        }

        pub fn player(self, username: &str, display_name: Option<&str>) -> Self {
            self.user(username, display_name, Role::Player)
        }

        pub fn coach(self, username: &str, display_name: Option<&str>) -> Self {
            self.user(username, display_name, Role::Coach)
        }

        pub fn admin(self, username: &str, display_name: Option<&str>) -> Self {
            self.user(username, display_name, Role::Admin)
        }

        pub fn archived_player(mut self, username: &str) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                display_name: None,
                role: Role::Player,
                password: STANDARD_PASSWORD.to_string(),
                archived: true,
            });
            self
        }

        pub fn user_with_password(
            mut self,
            username: &str,
            display_name: Option<&str>,
            role: Role,
            password: &str,
        ) -> Self {
            self.users.push(TestUser {
                username: username.to_string(),
                display_name: display_name.map(String::from),
                role,
                password: password.to_string(),
                archived: false,
            });
            self
        }

        pub fn session(
            mut self,
            title: &str,
            coach_username: &str,
            starts_at: DateTime<Utc>,
            capacity: i64,
        ) -> Self {
            self.sessions.push(TestSession {
                title: title.to_string(),
                coach_username: coach_username.to_string(),
                kind: SessionKind::Group,
                starts_at,
                duration_minutes: 60,
                capacity,
            });
            self
        }

        pub fn participant(
            mut self,
            session_title: &str,
            player_username: &str,
            status: ParticipantStatus,
        ) -> Self {
            self.participants.push(TestParticipant {
                session_title: session_title.to_string(),
                player_username: player_username.to_string(),
                status,
            });
            self
        }

        pub fn assessment(
            mut self,
            player_username: &str,
            coach_username: &str,
            scores: SkillScores,
            assessed_at: NaiveDateTime,
        ) -> Self {
            self.assessments.push(TestAssessment {
                player_username: player_username.to_string(),
                coach_username: coach_username.to_string(),
                scores,
                assessed_at,
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .parse_filters("debug")
                    .is_test(true)
                    .try_init();
            });

            let pool = crate::connect("sqlite::memory:")
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;

            let mut user_id_map: HashMap<String, i64> = HashMap::new();
            let mut session_id_map: HashMap<String, i64> = HashMap::new();

            for user in &self.users {
                let user_id = create_user(
                    &pool,
                    &user.username,
                    &user.password,
                    user.role,
                    user.display_name.as_deref(),
                )
                .await?;

                if user.archived {
                    set_user_archived(&pool, user_id, true).await?;
                }

                user_id_map.insert(user.username.clone(), user_id);
            }

            let lookup = |map: &HashMap<String, i64>, key: &str| {
                map.get(key)
                    .copied()
                    .ok_or_else(|| AppError::NotFound(format!("Fixture {} is not defined", key)))
            };

            for session in &self.sessions {
                let coach_id = lookup(&user_id_map, &session.coach_username)?;
                let plan = SessionPlan {
                    title: session.title.clone(),
                    kind: session.kind,
                    court: Some("Court 1".to_string()),
                    starts_at: session.starts_at,
                    duration_minutes: session.duration_minutes,
                    capacity: session.capacity,
                    focus_module: None,
                };

                let session_id = create_session(&pool, coach_id, &plan).await?;
                session_id_map.insert(session.title.clone(), session_id);
            }

            for participant in &self.participants {
                let session_id = lookup(&session_id_map, &participant.session_title)?;
                let player_id = lookup(&user_id_map, &participant.player_username)?;

                add_participants(&pool, session_id, &[player_id]).await?;

                if participant.status != ParticipantStatus::Invited {
                    sqlx::query(
                        "UPDATE session_participants SET status = ? WHERE session_id = ? AND player_id = ?",
                    )
                    .bind(participant.status.as_str())
                    .bind(session_id)
                    .bind(player_id)
                    .execute(&pool)
                    .await?;
                }
            }

            for assessment in &self.assessments {
                let player_id = lookup(&user_id_map, &assessment.player_username)?;
                let coach_id = lookup(&user_id_map, &assessment.coach_username)?;

                create_assessment_at(
                    &pool,
                    player_id,
                    coach_id,
                    None,
                    &assessment.scores,
                    "",
                    assessment.assessed_at,
                )
                .await?;
            }

            Ok(TestDb {
                pool,
                user_id_map,
                session_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub user_id_map: HashMap<String, i64>,
        pub session_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn user_id(&self, username: &str) -> Option<i64> {
            self.user_id_map.get(username).copied()
        }

        pub fn session_id(&self, title: &str) -> Option<i64> {
            self.session_id_map.get(title).copied()
        }

        pub async fn participant_status(
            &self,
            session_title: &str,
            player_username: &str,
        ) -> Result<String, sqlx::Error> {
            let session_id = self
                .session_id(session_title)
                .ok_or(sqlx::Error::RowNotFound)?;
            let player_id = self
                .user_id(player_username)
                .ok_or(sqlx::Error::RowNotFound)?;

            sqlx::query_scalar(
                "SELECT status FROM session_participants WHERE session_id = ? AND player_id = ?",
            )
            .bind(session_id)
            .bind(player_id)
            .fetch_one(&self.pool)
            .await
        }
    }

    /// A fresh pool with the schema applied and nothing else.
    pub async fn empty_pool() -> SqlitePool {
        TestDbBuilder::new()
            .build()
            .await
            .expect("Failed to build empty test database")
            .pool
    }
}

#[cfg(test)]
pub mod test_utils {
    use rocket::http::{ContentType, Cookie, Status};
    use rocket::local::asynchronous::{Client, LocalResponse};
    use serde_json::{Value, json};

    use super::test_db::{TestDb, TestDbBuilder, hours_from_now};
    use crate::models::ParticipantStatus;

    pub use super::test_db::STANDARD_PASSWORD;

    pub const MORNING_GROUP: &str = "Morning group";
    pub const EVENING_CLINIC: &str = "Evening clinic";

    /// Admin, two coaches, two active players and an archived one. `coach_user`
    /// runs a morning group tomorrow with `player_user` invited, and
    /// `other_coach` runs an evening clinic the same day.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .admin("admin_user", Some("Admin"))
            .coach("coach_user", Some("Coach Maria"))
            .coach("other_coach", Some("Coach Pablo"))
            .player("player_user", Some("Lucia"))
            .player("second_player", Some("Diego"))
            .archived_player("archived_player")
            .session(MORNING_GROUP, "coach_user", hours_from_now(24), 4)
            .session(EVENING_CLINIC, "other_coach", hours_from_now(34), 8)
            .participant(MORNING_GROUP, "player_user", ParticipantStatus::Invited)
            .build()
            .await
            .expect("Failed to build standard test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let rocket = crate::init_rocket(test_db.pool.clone()).await;
        let client = Client::untracked(rocket)
            .await
            .expect("Failed to build rocket client");
        (client, test_db)
    }

    pub async fn login_test_user(
        client: &Client,
        username: &str,
        password: &str,
    ) -> Vec<Cookie<'static>> {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(json!({ "username": username, "password": password }).to_string())
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let cookies: Vec<Cookie<'static>> = response
            .cookies()
            .iter()
            .map(|cookie| cookie.clone().into_owned())
            .collect();
        assert!(
            cookies.iter().any(|c| c.name() == "session_token"),
            "Login for {} did not set a session cookie",
            username
        );
        cookies
    }

    pub async fn json_body(response: LocalResponse<'_>) -> Value {
        let body = response.into_string().await.unwrap_or_default();
        serde_json::from_str(&body).unwrap_or(Value::Null)
    }
}
