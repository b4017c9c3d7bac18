#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDateTime, Utc};
    use rocket::http::{ContentType, Status};
    use rocket::tokio;
    use serde_json::json;

    use crate::db::{get_drill_scores_for_player, record_drill_score, record_drill_score_at};
    use crate::error::AppError;
    use crate::test::test_utils::{
        STANDARD_PASSWORD, create_standard_test_db, json_body, login_test_user, setup_test_client,
    };

    fn hours_ago(hours: i64) -> NaiveDateTime {
        (Utc::now() - Duration::hours(hours)).naive_utc()
    }

    #[rocket::async_test]
    async fn test_curriculum_api() {
        let test_db = create_standard_test_db().await;
        let (client, _) = setup_test_client(test_db).await;

        let player = login_test_user(&client, "player_user", STANDARD_PASSWORD).await;

        let response = client
            .get("/api/curriculum")
            .cookies(player.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let modules = json_body(response).await;
        let modules = modules.as_array().unwrap();
        assert_eq!(modules.len(), 15);
        assert_eq!(modules[0]["code"], "TEC-F");
        assert_eq!(modules[0]["level"], "foundation");
        assert_eq!(modules[0]["drills"].as_array().unwrap().len(), 3);

        let response = client
            .get("/api/curriculum/DEF-F")
            .cookies(player.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let module = json_body(response).await;
        assert_eq!(module["parameter"], "defense");

        let response = client
            .get("/api/curriculum/DEF-X")
            .cookies(player)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_record_drill_scores() {
        let test_db = create_standard_test_db().await;
        let (client, test_db) = setup_test_client(test_db).await;
        let lucia = test_db.user_id("player_user").unwrap();

        let coach = login_test_user(&client, "coach_user", STANDARD_PASSWORD).await;
        let player = login_test_user(&client, "player_user", STANDARD_PASSWORD).await;

        let url = format!("/api/players/{}/drill_scores", lucia);

        let response = client
            .post(url.as_str())
            .header(ContentType::JSON)
            .cookies(coach.clone())
            .body(json!({ "drill_code": "DEF-F-1", "score": 8 }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
        assert!(json_body(response).await["id"].as_i64().is_some());

        let response = client
            .post(url.as_str())
            .header(ContentType::JSON)
            .cookies(coach.clone())
            .body(json!({ "drill_code": "DEF-F-9", "score": 8 }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .post(url.as_str())
            .header(ContentType::JSON)
            .cookies(coach.clone())
            .body(json!({ "drill_code": "DEF-F-2", "score": 11 }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
        assert!(json_body(response).await["errors"]["score"].is_array());

        let response = client
            .post(url.as_str())
            .header(ContentType::JSON)
            .cookies(player)
            .body(json!({ "drill_code": "DEF-F-2", "score": 9 }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);

        let response = client
            .post(url.as_str())
            .header(ContentType::JSON)
            .cookies(coach)
            .body(json!({ "drill_code": "DEF-F-2", "score": 6, "session_id": 9999 }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);

        let stored = get_drill_scores_for_player(&test_db.pool, lucia).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].module_code, "DEF-F");
    }

    #[rocket::async_test]
    async fn test_module_progress_api() {
        let test_db = create_standard_test_db().await;
        let lucia = test_db.user_id("player_user").unwrap();
        let coach_id = test_db.user_id("coach_user").unwrap();

        for (drill, score, hours) in [
            ("CON-F-1", 6, 50),
            ("CON-F-1", 8, 10),
            ("CON-F-2", 7, 20),
            ("CON-F-3", 9, 5),
            ("POW-D-1", 4, 5),
        ] {
            record_drill_score_at(
                &test_db.pool,
                lucia,
                coach_id,
                None,
                drill,
                score,
                hours_ago(hours),
            )
            .await
            .unwrap();
        }

        let (client, test_db) = setup_test_client(test_db).await;
        let player = login_test_user(&client, "player_user", STANDARD_PASSWORD).await;
        let second = login_test_user(&client, "second_player", STANDARD_PASSWORD).await;

        let response = client
            .get(format!("/api/players/{}/modules", lucia))
            .cookies(player)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let progress = json_body(response).await;
        let progress = progress.as_array().unwrap();
        let codes: Vec<&str> = progress
            .iter()
            .map(|m| m["module_code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["POW-D", "CON-F"]);

        let consistency = &progress[1];
        assert_eq!(consistency["mastered"], true);
        assert_eq!(consistency["drills_mastered"], 3);
        assert_eq!(consistency["drills"][0]["attempts"], 2);
        assert_eq!(consistency["drills"][0]["latest_score"], 8);
        assert_eq!(consistency["drills"][0]["best_score"], 8);

        let power = &progress[0];
        assert_eq!(power["mastered"], false);
        assert_eq!(power["drills_mastered"], 0);

        let response = client
            .get(format!("/api/players/{}/modules", lucia))
            .cookies(second)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[tokio::test]
    async fn test_drill_score_validation() {
        let test_db = create_standard_test_db().await;
        let lucia = test_db.user_id("player_user").unwrap();
        let coach = test_db.user_id("coach_user").unwrap();

        let unknown = record_drill_score(&test_db.pool, lucia, coach, None, "XYZ-F-1", 5).await;
        assert!(matches!(unknown, Err(AppError::Validation(_))));

        let zero = record_drill_score(&test_db.pool, lucia, coach, None, "TEC-F-1", 0).await;
        assert!(matches!(zero, Err(AppError::Validation(_))));

        let ok = record_drill_score(&test_db.pool, lucia, coach, None, "TEC-F-1", 10).await;
        assert!(ok.is_ok());
    }
}
