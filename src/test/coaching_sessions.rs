#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::tokio;

    use crate::db::{
        SessionFilter, create_note, create_session, delete_session, get_note, get_session,
        list_sessions, set_session_status, update_session,
    };
    use crate::error::AppError;
    use crate::models::{NoteVisibility, ParticipantStatus, SessionKind, SessionStatus};
    use crate::schedule::SessionPlan;
    use crate::test::test_db::{TestDb, TestDbBuilder, hours_from_now};
    use crate::test::test_utils::{
        EVENING_CLINIC, MORNING_GROUP, STANDARD_PASSWORD, create_standard_test_db, json_body,
        login_test_user, setup_test_client,
    };
    use rocket::http::{ContentType, Cookie, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::{Value, json};

    fn plan(title: &str, hours: i64, minutes: i64) -> SessionPlan {
        SessionPlan {
            title: title.to_string(),
            kind: SessionKind::Group,
            court: None,
            starts_at: hours_from_now(hours),
            duration_minutes: minutes,
            capacity: 4,
            focus_module: Some("DEF-F".to_string()),
        }
    }

    async fn coach_db() -> TestDb {
        TestDbBuilder::new()
            .coach("coach", Some("Coach Maria"))
            .coach("other", Some("Coach Pablo"))
            .player("lucia", Some("Lucia"))
            .session("Existing", "coach", hours_from_now(48), 4)
            .participant("Existing", "lucia", ParticipantStatus::Confirmed)
            .build()
            .await
            .expect("Failed to build test database")
    }

    #[tokio::test]
    async fn test_create_and_read_session() {
        let test_db = coach_db().await;
        let coach = test_db.user_id("coach").unwrap();

        let id = create_session(&test_db.pool, coach, &plan("Lobs", 24, 90))
            .await
            .unwrap();
        let session = get_session(&test_db.pool, id).await.unwrap();

        assert_eq!(session.title, "Lobs");
        assert_eq!(session.coach_name, "Coach Maria");
        assert_eq!(session.status, SessionStatus::Scheduled);
        assert_eq!(session.focus_module.as_deref(), Some("DEF-F"));
        assert_eq!(session.ends_at() - session.starts_at, Duration::minutes(90));
    }

    #[tokio::test]
    async fn test_overlapping_sessions_conflict() {
        let test_db = coach_db().await;
        let coach = test_db.user_id("coach").unwrap();
        let other = test_db.user_id("other").unwrap();

        // Existing runs 48h..49h from now.
        let clash = create_session(&test_db.pool, coach, &plan("Clash", 48, 30)).await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        let back_to_back = create_session(&test_db.pool, coach, &plan("After", 49, 60)).await;
        assert!(back_to_back.is_ok());

        let other_coach = create_session(&test_db.pool, other, &plan("Other", 48, 60)).await;
        assert!(other_coach.is_ok(), "Overlap only applies per coach");
    }

    #[tokio::test]
    async fn test_cancelled_sessions_free_the_slot() {
        let test_db = coach_db().await;
        let coach = test_db.user_id("coach").unwrap();
        let existing = test_db.session_id("Existing").unwrap();

        set_session_status(&test_db.pool, existing, SessionStatus::Cancelled)
            .await
            .unwrap();

        assert!(
            create_session(&test_db.pool, coach, &plan("Replacement", 48, 60))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_players_cannot_coach() {
        let test_db = coach_db().await;
        let lucia = test_db.user_id("lucia").unwrap();

        let result = create_session(&test_db.pool, lucia, &plan("Mine", 24, 60)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_invalid_plans_are_rejected() {
        let test_db = coach_db().await;
        let coach = test_db.user_id("coach").unwrap();

        let mut private = plan("Private", 24, 60);
        private.kind = SessionKind::Private;
        private.capacity = 3;
        assert!(matches!(
            create_session(&test_db.pool, coach, &private).await,
            Err(AppError::Validation(_))
        ));

        let mut unknown_module = plan("Unknown", 24, 60);
        unknown_module.focus_module = Some("XYZ-F".to_string());
        assert!(matches!(
            create_session(&test_db.pool, coach, &unknown_module).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_session_rules() {
        let test_db = coach_db().await;
        let existing = test_db.session_id("Existing").unwrap();

        let mut moved = plan("Existing moved", 50, 60);
        update_session(&test_db.pool, existing, &moved).await.unwrap();
        let session = get_session(&test_db.pool, existing).await.unwrap();
        assert_eq!(session.title, "Existing moved");
        assert_eq!(session.starts_at, hours_from_now(50));

        moved.capacity = 0;
        assert!(matches!(
            update_session(&test_db.pool, existing, &moved).await,
            Err(AppError::Validation(_))
        ));

        set_session_status(&test_db.pool, existing, SessionStatus::Completed)
            .await
            .unwrap();
        moved.capacity = 4;
        assert!(matches!(
            update_session(&test_db.pool, existing, &moved).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let test_db = coach_db().await;
        let existing = test_db.session_id("Existing").unwrap();

        set_session_status(&test_db.pool, existing, SessionStatus::Completed)
            .await
            .unwrap();

        for status in [SessionStatus::Scheduled, SessionStatus::Cancelled] {
            assert!(matches!(
                set_session_status(&test_db.pool, existing, status).await,
                Err(AppError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_list_sessions_filters() {
        let test_db = coach_db().await;
        let coach = test_db.user_id("coach").unwrap();
        let other = test_db.user_id("other").unwrap();
        let lucia = test_db.user_id("lucia").unwrap();

        create_session(&test_db.pool, coach, &plan("Early", 24, 60))
            .await
            .unwrap();
        create_session(&test_db.pool, other, &plan("Other's", 30, 60))
            .await
            .unwrap();

        let own = list_sessions(
            &test_db.pool,
            &SessionFilter {
                coach_id: Some(coach),
                ..SessionFilter::default()
            },
        )
        .await
        .unwrap();
        let titles: Vec<&str> = own.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Early", "Existing"]);

        let attending = list_sessions(
            &test_db.pool,
            &SessionFilter {
                player_id: Some(lucia),
                ..SessionFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(attending.len(), 1);
        assert_eq!(attending[0].title, "Existing");

        let window = list_sessions(
            &test_db.pool,
            &SessionFilter {
                from: Some(hours_from_now(29).naive_utc()),
                until: Some(hours_from_now(31).naive_utc()),
                ..SessionFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].title, "Other's");

        let cancelled = list_sessions(
            &test_db.pool,
            &SessionFilter {
                status: Some(SessionStatus::Cancelled),
                ..SessionFilter::default()
            },
        )
        .await
        .unwrap();
        assert!(cancelled.is_empty());
    }

    #[tokio::test]
    async fn test_delete_keeps_notes() {
        let test_db = coach_db().await;
        let coach = test_db.user_id("coach").unwrap();
        let lucia = test_db.user_id("lucia").unwrap();
        let existing = test_db.session_id("Existing").unwrap();

        let note = create_note(
            &test_db.pool,
            coach,
            lucia,
            Some(existing),
            "Great bandeja today",
            NoteVisibility::Shared,
        )
        .await
        .unwrap();

        delete_session(&test_db.pool, existing).await.unwrap();

        assert!(matches!(
            get_session(&test_db.pool, existing).await,
            Err(AppError::NotFound(_))
        ));
        let kept = get_note(&test_db.pool, note).await.unwrap();
        assert_eq!(kept.session_id, None);

        let participants: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM session_participants WHERE session_id = ?")
                .bind(existing)
                .fetch_one(&test_db.pool)
                .await
                .unwrap();
        assert_eq!(participants, 0);
    }

    async fn post_session(
        client: &Client,
        cookies: &[Cookie<'static>],
        body: Value,
    ) -> (Status, Value) {
        let response = client
            .post("/api/sessions")
            .header(ContentType::JSON)
            .cookies(cookies.to_vec())
            .body(body.to_string())
            .dispatch()
            .await;
        let status = response.status();
        (status, json_body(response).await)
    }

    fn session_form(title: &str, hours: i64) -> Value {
        json!({
            "title": title,
            "kind": "group",
            "court": "Court 3",
            "starts_at": hours_from_now(hours).to_rfc3339(),
            "duration_minutes": 90,
            "capacity": 4,
            "focus_module": "TAC-D"
        })
    }

    #[rocket::async_test]
    async fn test_create_session_api() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;

        let coach = login_test_user(&client, "coach_user", STANDARD_PASSWORD).await;
        let admin = login_test_user(&client, "admin_user", STANDARD_PASSWORD).await;
        let player = login_test_user(&client, "player_user", STANDARD_PASSWORD).await;

        let (status, body) = post_session(&client, &coach, session_form("Volleys", 72)).await;
        assert_eq!(status, Status::Created);
        assert_eq!(body["coach_name"], "Coach Maria");
        assert_eq!(body["status"], "scheduled");
        assert_eq!(body["ends_at"], json!(hours_from_now(72) + Duration::minutes(90)));
        assert!(body["participants"].as_array().unwrap().is_empty());

        // The morning group starts 24h from now and runs an hour.
        let (status, body) = post_session(&client, &coach, session_form("Clash", 24)).await;
        assert_eq!(status, Status::Conflict);
        assert!(body["errors"]["resource"].is_array());

        let (status, _) = post_session(&client, &player, session_form("Mine", 80)).await;
        assert_eq!(status, Status::Forbidden);

        let mut for_colleague = session_form("Cover", 90);
        for_colleague["coach_id"] = json!(test_db.user_id("other_coach").unwrap());
        let (status, _) = post_session(&client, &coach, for_colleague.clone()).await;
        assert_eq!(status, Status::Forbidden);

        let (status, body) = post_session(&client, &admin, for_colleague).await;
        assert_eq!(status, Status::Created);
        assert_eq!(body["coach_name"], "Coach Pablo");

        let mut invalid = session_form("", 100);
        invalid["capacity"] = json!(0);
        let (status, body) = post_session(&client, &coach, invalid).await;
        assert_eq!(status, Status::UnprocessableEntity);
        assert!(body["errors"]["title"].is_array());
        assert!(body["errors"]["capacity"].is_array());
    }

    #[rocket::async_test]
    async fn test_session_listing_is_scoped_by_role() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let titles = |body: Value| -> Vec<String> {
            body.as_array()
                .unwrap()
                .iter()
                .map(|s| s["title"].as_str().unwrap().to_string())
                .collect()
        };

        for (username, expected) in [
            ("admin_user", vec![MORNING_GROUP, EVENING_CLINIC]),
            ("coach_user", vec![MORNING_GROUP]),
            ("other_coach", vec![EVENING_CLINIC]),
            ("player_user", vec![MORNING_GROUP]),
            ("second_player", vec![]),
        ] {
            let cookies = login_test_user(&client, username, STANDARD_PASSWORD).await;
            let response = client.get("/api/sessions").cookies(cookies).dispatch().await;
            assert_eq!(response.status(), Status::Ok);
            assert_eq!(
                titles(json_body(response).await),
                expected,
                "Unexpected sessions for {}",
                username
            );
        }

        let admin = login_test_user(&client, "admin_user", STANDARD_PASSWORD).await;
        let response = client
            .get("/api/sessions?status=cancelled")
            .cookies(admin.clone())
            .dispatch()
            .await;
        assert!(titles(json_body(response).await).is_empty());

        let response = client
            .get("/api/sessions?from=tomorrow")
            .cookies(admin)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn test_session_detail_access() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;
        let morning = test_db.session_id(MORNING_GROUP).unwrap();

        let player = login_test_user(&client, "player_user", STANDARD_PASSWORD).await;
        let second = login_test_user(&client, "second_player", STANDARD_PASSWORD).await;
        let other_coach = login_test_user(&client, "other_coach", STANDARD_PASSWORD).await;

        let response = client
            .get(format!("/api/sessions/{}", morning))
            .cookies(player)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body = json_body(response).await;
        assert_eq!(body["title"], MORNING_GROUP);
        assert_eq!(body["participants"][0]["player_name"], "Lucia");
        assert_eq!(body["participants"][0]["status"], "invited");

        let response = client
            .get(format!("/api/sessions/{}", morning))
            .cookies(second)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client
            .post(format!("/api/sessions/{}/status", morning))
            .header(ContentType::JSON)
            .cookies(other_coach.clone())
            .body(json!({ "status": "cancelled" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client
            .get("/api/sessions/9999")
            .cookies(other_coach)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_session_lifecycle_api() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;
        let morning = test_db.session_id(MORNING_GROUP).unwrap();

        let coach = login_test_user(&client, "coach_user", STANDARD_PASSWORD).await;

        let mut moved = session_form("Morning group (moved)", 26);
        moved["capacity"] = json!(6);
        let response = client
            .put(format!("/api/sessions/{}", morning))
            .header(ContentType::JSON)
            .cookies(coach.clone())
            .body(moved.to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body = json_body(response).await;
        assert_eq!(body["title"], "Morning group (moved)");
        assert_eq!(body["capacity"], 6);
        assert_eq!(body["focus_module"], "TAC-D");

        let response = client
            .post(format!("/api/sessions/{}/status", morning))
            .header(ContentType::JSON)
            .cookies(coach.clone())
            .body(json!({ "status": "completed" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(json_body(response).await["status"], "completed");

        let response = client
            .post(format!("/api/sessions/{}/status", morning))
            .header(ContentType::JSON)
            .cookies(coach.clone())
            .body(json!({ "status": "scheduled" }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .delete(format!("/api/sessions/{}", morning))
            .cookies(coach.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NoContent);

        let response = client
            .get(format!("/api/sessions/{}", morning))
            .cookies(coach)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
