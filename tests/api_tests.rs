// tests/api_tests.rs

use proctorquiz::models::question::{self, SetId};
use proctorquiz::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::time::Duration;

const ADMIN_PASSWORD: &str = "test-admin-password";
const RESET_CODE: &str = "CSEADMIN2025";

/// Helper function to spawn the app on a random port for testing.
/// Each test gets its own in-memory database; the returned pool shares it.
async fn spawn_app() -> (String, SqlitePool) {
    // 1. Create a pool (single connection keeps the in-memory DB alive)
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        admin_password: ADMIN_PASSWORD.to_string(),
        rust_log: "error".to_string(),
        port: 0,
    };

    let state = AppState::new(pool.clone(), config);

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

async fn open_exam(client: &reqwest::Client, address: &str) {
    let response = client
        .post(format!("{}/api/admin/config", address))
        .header("x-admin-password", ADMIN_PASSWORD)
        .json(&serde_json::json!({ "examOpen": true }))
        .send()
        .await
        .expect("Failed to open exam");
    assert_eq!(response.status().as_u16(), 200);
}

/// Starts an attempt and returns the 201 body (`attempt` + `questions`).
async fn start_attempt(
    client: &reqwest::Client,
    address: &str,
    student_id: &str,
) -> serde_json::Value {
    let response = client
        .post(format!("{}/api/attempts", address))
        .json(&serde_json::json!({
            "name": "Test Student",
            "email": "student@institute.edu",
            "studentId": student_id,
        }))
        .send()
        .await
        .expect("Failed to start attempt");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.expect("Failed to parse start body")
}

fn set_id_from_str(s: &str) -> SetId {
    match s {
        "A" => SetId::A,
        "B" => SetId::B,
        "C" => SetId::C,
        "D" => SetId::D,
        other => panic!("unexpected question set {other}"),
    }
}

fn answer_key(set: &str) -> Vec<i64> {
    question::question_set(set_id_from_str(set))
        .questions
        .iter()
        .map(|q| q.correct_index)
        .collect()
}

#[tokio::test]
async fn health_check_404() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn public_config_hides_reset_code() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .get(format!("{}/api/config", address))
        .send()
        .await
        .expect("Failed to fetch config")
        .json()
        .await
        .unwrap();

    // Exam starts closed; the reset code never ships to students.
    assert_eq!(body["examOpen"], false);
    assert_eq!(body["proctoredMode"], false);
    assert!(body.get("adminResetCode").is_none());
}

#[tokio::test]
async fn start_rejected_while_exam_closed() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/attempts", address))
        .json(&serde_json::json!({
            "name": "Test Student",
            "email": "student@institute.edu",
            "studentId": "s-closed",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("closed"));
}

#[tokio::test]
async fn start_validation_rejects_bad_email() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    open_exam(&client, &address).await;

    let response = client
        .post(format!("{}/api/attempts", address))
        .json(&serde_json::json!({
            "name": "Test Student",
            "email": "not-an-email",
            "studentId": "s-bademail",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn full_marks_happy_path() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    open_exam(&client, &address).await;

    let body = start_attempt(&client, &address, "s-100").await;
    let attempt_id = body["attempt"]["id"].as_str().unwrap().to_string();
    let set = body["attempt"]["questionSet"].as_str().unwrap().to_string();

    // Ten questions, answer keys stripped.
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 10);
    assert!(questions[0].get("correctIndex").is_none());

    for (i, correct) in answer_key(&set).iter().enumerate() {
        let response = client
            .post(format!("{}/api/attempts/{}/answer", address, attempt_id))
            .json(&serde_json::json!({ "questionIndex": i, "optionIndex": correct }))
            .send()
            .await
            .expect("Failed to record answer");
        assert_eq!(response.status().as_u16(), 200);
    }

    let submitted: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .send()
        .await
        .expect("Failed to submit")
        .json()
        .await
        .unwrap();

    assert_eq!(submitted["status"], "submitted");
    assert_eq!(submitted["score"], 10);
    assert_eq!(submitted["totalQuestions"], 10);
    assert!(!submitted["endedAt"].is_null());
    assert_eq!(submitted["responses"].as_array().unwrap().len(), 10);

    // Resubmission is a silent no-op returning the same final record.
    let resubmitted: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .send()
        .await
        .expect("Failed to resubmit")
        .json()
        .await
        .unwrap();
    assert_eq!(resubmitted["score"], 10);
    assert_eq!(resubmitted["endedAt"], submitted["endedAt"]);
}

#[tokio::test]
async fn unanswered_question_scores_incorrect() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    open_exam(&client, &address).await;

    let body = start_attempt(&client, &address, "s-skip").await;
    let attempt_id = body["attempt"]["id"].as_str().unwrap().to_string();
    let set = body["attempt"]["questionSet"].as_str().unwrap().to_string();

    // Answer everything except question 3.
    for (i, correct) in answer_key(&set).iter().enumerate() {
        if i == 3 {
            continue;
        }
        client
            .post(format!("{}/api/attempts/{}/answer", address, attempt_id))
            .json(&serde_json::json!({ "questionIndex": i, "optionIndex": correct }))
            .send()
            .await
            .expect("Failed to record answer");
    }

    let submitted: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .send()
        .await
        .expect("Failed to submit")
        .json()
        .await
        .unwrap();

    assert_eq!(submitted["score"], 9);
    let skipped = &submitted["responses"][3];
    assert_eq!(skipped["isCorrect"], false);
    assert_eq!(skipped["chosenIndex"], -1);
}

#[tokio::test]
async fn lock_and_unlock_flow_preserves_cheat_count() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    open_exam(&client, &address).await;

    let body = start_attempt(&client, &address, "s-lock").await;
    let attempt_id = body["attempt"]["id"].as_str().unwrap().to_string();

    // A raw signal becomes a violation and locks the attempt.
    let locked: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/signals", address, attempt_id))
        .json(&serde_json::json!({ "kind": "window-blur" }))
        .send()
        .await
        .expect("Failed to report signal")
        .json()
        .await
        .unwrap();
    assert_eq!(locked["locked"], true);
    assert_eq!(locked["cheatCount"], 1);

    // While locked: answers and submits are refused, further signals ignored.
    let answer = client
        .post(format!("{}/api/attempts/{}/answer", address, attempt_id))
        .json(&serde_json::json!({ "questionIndex": 0, "optionIndex": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(answer.status().as_u16(), 409);

    let submit = client
        .post(format!("{}/api/attempts/{}/submit", address, attempt_id))
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status().as_u16(), 409);

    let ignored: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/signals", address, attempt_id))
        .json(&serde_json::json!({ "kind": "copy-paste" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ignored["locked"], false);

    // Wrong code is a 401 and changes nothing.
    let wrong = client
        .post(format!("{}/api/attempts/{}/unlock", address, attempt_id))
        .json(&serde_json::json!({ "code": "WRONG" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 401);

    // Correct code resumes the attempt; the violation tally stays.
    let unlock = client
        .post(format!("{}/api/attempts/{}/unlock", address, attempt_id))
        .json(&serde_json::json!({ "code": RESET_CODE }))
        .send()
        .await
        .unwrap();
    assert_eq!(unlock.status().as_u16(), 200);

    let attempt: serde_json::Value = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attempt["cheated"], true);
    assert_eq!(attempt["cheatCount"], 1);
    assert_eq!(attempt["status"], "in-progress");

    let answer = client
        .post(format!("{}/api/attempts/{}/answer", address, attempt_id))
        .json(&serde_json::json!({ "questionIndex": 0, "optionIndex": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(answer.status().as_u16(), 200);
}

#[tokio::test]
async fn camera_detections_feed_the_aggregator_when_proctored() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/admin/config", address))
        .header("x-admin-password", ADMIN_PASSWORD)
        .json(&serde_json::json!({ "examOpen": true, "proctoredMode": true }))
        .send()
        .await
        .expect("Failed to configure exam");
    assert_eq!(response.status().as_u16(), 200);

    let started = client
        .post(format!("{}/api/attempts", address))
        .json(&serde_json::json!({
            "name": "Test Student",
            "email": "student@institute.edu",
            "studentId": "s-camera",
            "cameraConsent": true,
        }))
        .send()
        .await
        .expect("Failed to start attempt");
    assert_eq!(started.status().as_u16(), 201);
    let body: serde_json::Value = started.json().await.unwrap();
    let attempt_id = body["attempt"]["id"].as_str().unwrap().to_string();

    // A lone person with a phone in view is a forbidden-object violation.
    let locked: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/detections", address, attempt_id))
        .json(&serde_json::json!([
            { "class": "person", "bbox": [100.0, 100.0, 200.0, 300.0], "score": 0.97 },
            { "class": "cell phone", "bbox": [400.0, 250.0, 60.0, 120.0], "score": 0.88 },
        ]))
        .send()
        .await
        .expect("Failed to report detections")
        .json()
        .await
        .unwrap();

    assert_eq!(locked["locked"], true);
    assert!(
        locked["reason"]
            .as_str()
            .unwrap()
            .contains("cell phone")
    );
}

#[tokio::test]
async fn camera_detections_are_dropped_without_proctored_mode() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    open_exam(&client, &address).await;

    let body = start_attempt(&client, &address, "s-no-proctor").await;
    let attempt_id = body["attempt"]["id"].as_str().unwrap().to_string();

    // Proctoring is off, so even a blatant frame must not touch the attempt.
    let outcome: serde_json::Value = client
        .post(format!("{}/api/attempts/{}/detections", address, attempt_id))
        .json(&serde_json::json!([
            { "class": "person", "bbox": [100.0, 100.0, 200.0, 300.0], "score": 0.97 },
            { "class": "cell phone", "bbox": [400.0, 250.0, 60.0, 120.0], "score": 0.88 },
        ]))
        .send()
        .await
        .expect("Failed to report detections")
        .json()
        .await
        .unwrap();
    assert_eq!(outcome["locked"], false);

    let attempt: serde_json::Value = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attempt["status"], "in-progress");
    assert_eq!(attempt["cheated"], false);
    assert_eq!(attempt["cheatCount"], 0);
}

#[tokio::test]
async fn timer_expiry_auto_submits_once() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    open_exam(&client, &address).await;

    let body = start_attempt(&client, &address, "s-timer").await;
    let attempt_id = body["attempt"]["id"].as_str().unwrap().to_string();
    let set = body["attempt"]["questionSet"].as_str().unwrap().to_string();
    let key = answer_key(&set);

    // One correct answer, then collapse the countdown to two seconds.
    client
        .post(format!("{}/api/attempts/{}/answer", address, attempt_id))
        .json(&serde_json::json!({ "questionIndex": 0, "optionIndex": key[0] }))
        .send()
        .await
        .expect("Failed to record answer");

    let updated: serde_json::Value = client
        .put(format!("{}/api/attempts/{}", address, attempt_id))
        .json(&serde_json::json!({ "timeRemaining": 2 }))
        .send()
        .await
        .expect("Failed to update attempt")
        .json()
        .await
        .unwrap();
    assert_eq!(updated["timeRemaining"], 2);

    // Wait out the countdown plus a tick of slack.
    tokio::time::sleep(Duration::from_secs(5)).await;

    let attempt: serde_json::Value = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(attempt["status"], "submitted");
    assert_eq!(attempt["score"], 1);
    assert_eq!(attempt["timeRemaining"], 0);
    assert!(!attempt["endedAt"].is_null());
    let responses = attempt["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 10);
    assert_eq!(responses[1]["isCorrect"], false);
    assert_eq!(responses[1]["chosenIndex"], -1);
}

#[tokio::test]
async fn closing_the_exam_auto_submits_live_attempts() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    open_exam(&client, &address).await;

    let body = start_attempt(&client, &address, "s-close").await;
    let attempt_id = body["attempt"]["id"].as_str().unwrap().to_string();

    let response = client
        .post(format!("{}/api/admin/config", address))
        .header("x-admin-password", ADMIN_PASSWORD)
        .json(&serde_json::json!({ "examOpen": false }))
        .send()
        .await
        .expect("Failed to close exam");
    assert_eq!(response.status().as_u16(), 200);

    // The 3s exam-window poll picks the change up.
    tokio::time::sleep(Duration::from_secs(5)).await;

    let attempt: serde_json::Value = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attempt["status"], "submitted");
}

#[tokio::test]
async fn duplicate_student_id_conflicts() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    open_exam(&client, &address).await;

    start_attempt(&client, &address, "s-dup").await;

    let response = client
        .post(format!("{}/api/attempts", address))
        .json(&serde_json::json!({
            "name": "Other Student",
            "email": "other@institute.edu",
            "studentId": "s-dup",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn student_lookup_returns_json_null_when_absent() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/attempts/student/unknown", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body.is_null());

    open_exam(&client, &address).await;
    start_attempt(&client, &address, "s-find").await;

    let found: serde_json::Value = client
        .get(format!("{}/api/attempts/student/s-find", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found["studentId"], "s-find");
}

#[tokio::test]
async fn question_sets_rotate_round_robin() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    open_exam(&client, &address).await;

    let mut sets = Vec::new();
    for i in 0..4 {
        let body = start_attempt(&client, &address, &format!("s-rr-{i}")).await;
        sets.push(body["attempt"]["questionSet"].as_str().unwrap().to_string());
    }
    assert_eq!(sets, ["A", "B", "C", "D"]);
}

#[tokio::test]
async fn proctored_mode_requires_camera_consent() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/admin/config", address))
        .header("x-admin-password", ADMIN_PASSWORD)
        .json(&serde_json::json!({ "examOpen": true, "proctoredMode": true }))
        .send()
        .await
        .expect("Failed to configure exam");
    assert_eq!(response.status().as_u16(), 200);

    let refused = client
        .post(format!("{}/api/attempts", address))
        .json(&serde_json::json!({
            "name": "Test Student",
            "email": "student@institute.edu",
            "studentId": "s-consent",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status().as_u16(), 400);

    let accepted = client
        .post(format!("{}/api/attempts", address))
        .json(&serde_json::json!({
            "name": "Test Student",
            "email": "student@institute.edu",
            "studentId": "s-consent",
            "cameraConsent": true,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status().as_u16(), 201);
}

#[tokio::test]
async fn admin_surface_requires_password_and_writes_logs() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    // No/wrong password is a 401.
    let unauthorized = client
        .get(format!("{}/api/admin/config", address))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status().as_u16(), 401);

    let wrong = client
        .post(format!("{}/api/admin/config", address))
        .header("x-admin-password", "nope")
        .json(&serde_json::json!({ "examOpen": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status().as_u16(), 401);

    // Authorized toggles succeed and each lands in the audit trail.
    let config: serde_json::Value = client
        .post(format!("{}/api/admin/config", address))
        .header("x-admin-password", ADMIN_PASSWORD)
        .json(&serde_json::json!({ "examOpen": true, "proctoredMode": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(config["examOpen"], true);
    assert_eq!(config["proctoredMode"], true);
    // The full admin view carries the reset code.
    assert_eq!(config["adminResetCode"], RESET_CODE);

    let logs: serde_json::Value = client
        .get(format!("{}/api/logs", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let actions: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"Exam Opened"));
    assert!(actions.contains(&"Proctoring Enabled"));
}

#[tokio::test]
async fn force_unlock_clears_cheat_flags_and_logs_prior_count() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    open_exam(&client, &address).await;

    let body = start_attempt(&client, &address, "s-force").await;
    let attempt_id = body["attempt"]["id"].as_str().unwrap().to_string();

    client
        .post(format!("{}/api/attempts/{}/signals", address, attempt_id))
        .json(&serde_json::json!({ "kind": "fullscreen-exit" }))
        .send()
        .await
        .expect("Failed to report signal");

    let unlocked: serde_json::Value = client
        .post(format!(
            "{}/api/admin/attempts/{}/force-unlock",
            address, attempt_id
        ))
        .header("x-admin-password", ADMIN_PASSWORD)
        .send()
        .await
        .expect("Failed to force unlock")
        .json()
        .await
        .unwrap();

    assert_eq!(unlocked["cheated"], false);
    assert_eq!(unlocked["cheatCount"], 0);
    assert_eq!(unlocked["status"], "in-progress");

    // The wiped tally survives in the audit trail.
    let logs: serde_json::Value = client
        .get(format!("{}/api/logs", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entry = logs
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["action"] == "Force Unlock")
        .expect("force unlock log entry");
    assert!(entry["details"].as_str().unwrap().contains("count 1"));

    // The attempt is usable again.
    let answer = client
        .post(format!("{}/api/attempts/{}/answer", address, attempt_id))
        .json(&serde_json::json!({ "questionIndex": 0, "optionIndex": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(answer.status().as_u16(), 200);
}

#[tokio::test]
async fn attempt_crud_contract() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    open_exam(&client, &address).await;

    let body = start_attempt(&client, &address, "s-crud").await;
    let attempt_id = body["attempt"]["id"].as_str().unwrap().to_string();

    let listed: serde_json::Value = client
        .get(format!("{}/api/attempts", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // PUT updates answers through the live session.
    let updated: serde_json::Value = client
        .put(format!("{}/api/attempts/{}", address, attempt_id))
        .json(&serde_json::json!({ "answers": [2, 1] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let answers = updated["answers"].as_array().unwrap();
    assert_eq!(answers.len(), 10);
    assert_eq!(answers[0], 2);
    assert_eq!(answers[2], -1);

    let deleted = client
        .delete(format!("{}/api/attempts/{}", address, attempt_id))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 200);

    let gone = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);

    let missing = client
        .delete(format!("{}/api/attempts/{}", address, attempt_id))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn log_endpoints_follow_the_crud_contract() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let created = client
        .post(format!("{}/api/logs", address))
        .json(&serde_json::json!({ "action": "Manual Note", "details": "from test" }))
        .send()
        .await
        .expect("Failed to create log");
    assert_eq!(created.status().as_u16(), 201);
    let log: serde_json::Value = created.json().await.unwrap();
    assert!(log["id"].as_str().unwrap().starts_with("log-"));
    assert_eq!(log["action"], "Manual Note");

    let empty_action = client
        .post(format!("{}/api/logs", address))
        .json(&serde_json::json!({ "action": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty_action.status().as_u16(), 400);

    let cleared: serde_json::Value = client
        .delete(format!("{}/api/logs", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cleared["deleted"], 1);
}
