use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Map, Value as JsonValue};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tower::ServiceExt;
use uuid::Uuid;

async fn setup() -> (Router, SqlitePool) {
    std::env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    std::env::set_var("DATABASE_URL", "sqlite::memory:");
    std::env::set_var("JWT_SECRET", "test_secret_key");
    std::env::set_var("TOKEN_TTL_HOURS", "2");
    let _ = quiz_backend::config::init_config();

    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("options")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    let state = quiz_backend::AppState::new(pool.clone());
    (quiz_backend::routes::build_router(state), pool)
}

fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<&JsonValue>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let resp = app.clone().oneshot(req).await.expect("response");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

async fn register(app: &Router, username: &str) -> String {
    let payload = json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": "correct horse battery",
    });
    let (status, body) = send(app, request("POST", "/api/auth/register", None, Some(&payload))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().expect("token").to_string()
}

/// Creates a five-question test and returns its committed tree, with
/// correctness flags, as the owner sees it.
async fn seed_test(app: &Router, token: &str, name: &str) -> JsonValue {
    let questions: Vec<JsonValue> = (0..5)
        .map(|i| {
            let answers: Vec<JsonValue> = (0..4)
                .map(|j| {
                    json!({
                        "text": format!("Q{} option {}", i, j),
                        "is_correct": j == i % 4,
                    })
                })
                .collect();
            json!({ "text": format!("Question {}", i), "answers": answers })
        })
        .collect();
    let payload = json!({ "name": name, "description": "seed", "questions": questions });
    let (status, body) = send(app, request("POST", "/api/tests", Some(token), Some(&payload))).await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

fn correct_answer_id(tree: &JsonValue, question_index: usize) -> String {
    tree["questions"][question_index]["answers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["is_correct"] == json!(true))
        .expect("one correct answer")["id"]
        .as_str()
        .unwrap()
        .to_string()
}

fn wrong_answer_id(tree: &JsonValue, question_index: usize) -> String {
    tree["questions"][question_index]["answers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["is_correct"] == json!(false))
        .expect("a wrong answer")["id"]
        .as_str()
        .unwrap()
        .to_string()
}

fn question_id(tree: &JsonValue, question_index: usize) -> String {
    tree["questions"][question_index]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

fn attempt_payload(selections: &[(String, String)]) -> JsonValue {
    let mut answers = Map::new();
    for (question, answer) in selections {
        answers.insert(question.clone(), json!(answer));
    }
    json!({ "answers": answers })
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count")
}

#[tokio::test]
async fn scoring_records_result_and_bumps_counter_once() {
    let (app, pool) = setup().await;
    let author = register(&app, "quiz_author").await;
    let taker = register(&app, "quiz_taker").await;

    let tree = seed_test(&app, &author, "Scored test").await;
    let test_id = tree["id"].as_str().unwrap().to_string();

    // Three correct picks, one wrong pick, one question left unanswered.
    let selections = vec![
        (question_id(&tree, 0), correct_answer_id(&tree, 0)),
        (question_id(&tree, 1), correct_answer_id(&tree, 1)),
        (question_id(&tree, 2), correct_answer_id(&tree, 2)),
        (question_id(&tree, 3), wrong_answer_id(&tree, 3)),
    ];

    let (status, result) = send(
        &app,
        request(
            "POST",
            &format!("/api/tests/{}/attempts", test_id),
            Some(&taker),
            Some(&attempt_payload(&selections)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(result["score"], 3);
    assert_eq!(result["question_count"], 5);

    let (_, take_view) = send(&app, request("GET", &format!("/api/tests/{}", test_id), None, None)).await;
    assert_eq!(take_view["passes_number"], 1);
    assert_eq!(count(&pool, "results").await, 1);
}

#[tokio::test]
async fn empty_attempt_scores_zero() {
    let (app, pool) = setup().await;
    let author = register(&app, "empty_author").await;
    let taker = register(&app, "empty_taker").await;

    let tree = seed_test(&app, &author, "Untouched test").await;
    let test_id = tree["id"].as_str().unwrap().to_string();

    let (status, result) = send(
        &app,
        request(
            "POST",
            &format!("/api/tests/{}/attempts", test_id),
            Some(&taker),
            Some(&attempt_payload(&[])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(result["score"], 0);
    assert_eq!(result["question_count"], 5);
    assert_eq!(count(&pool, "results").await, 1);
}

#[tokio::test]
async fn foreign_answer_id_fails_loudly_and_writes_nothing() {
    let (app, pool) = setup().await;
    let author = register(&app, "foreign_author").await;
    let taker = register(&app, "foreign_taker").await;

    let tree = seed_test(&app, &author, "Strict test").await;
    let test_id = tree["id"].as_str().unwrap().to_string();

    // An answer that exists, but belongs to a different question.
    let selections = vec![(question_id(&tree, 0), correct_answer_id(&tree, 1))];
    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/api/tests/{}/attempts", test_id),
            Some(&taker),
            Some(&attempt_payload(&selections)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(count(&pool, "results").await, 0);
    let (_, take_view) = send(&app, request("GET", &format!("/api/tests/{}", test_id), None, None)).await;
    assert_eq!(take_view["passes_number"], 0);
}

#[tokio::test]
async fn unknown_question_id_fails_loudly() {
    let (app, pool) = setup().await;
    let author = register(&app, "unknown_author").await;
    let taker = register(&app, "unknown_taker").await;

    let tree = seed_test(&app, &author, "Keyed test").await;
    let test_id = tree["id"].as_str().unwrap().to_string();

    let selections = vec![(Uuid::new_v4().to_string(), correct_answer_id(&tree, 0))];
    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/api/tests/{}/attempts", test_id),
            Some(&taker),
            Some(&attempt_payload(&selections)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(count(&pool, "results").await, 0);
}

#[tokio::test]
async fn attempting_a_missing_test_is_not_found() {
    let (app, _pool) = setup().await;
    let taker = register(&app, "lost_taker").await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/api/tests/{}/attempts", Uuid::new_v4()),
            Some(&taker),
            Some(&attempt_payload(&[])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn results_are_listed_and_visible_to_their_owner_only() {
    let (app, _pool) = setup().await;
    let author = register(&app, "result_author").await;
    let taker = register(&app, "result_taker").await;

    let tree = seed_test(&app, &author, "Result test").await;
    let test_id = tree["id"].as_str().unwrap().to_string();

    let selections = vec![(question_id(&tree, 0), correct_answer_id(&tree, 0))];
    let (_, result) = send(
        &app,
        request(
            "POST",
            &format!("/api/tests/{}/attempts", test_id),
            Some(&taker),
            Some(&attempt_payload(&selections)),
        ),
    )
    .await;
    let result_id = result["id"].as_str().unwrap().to_string();

    let (status, listed) = send(&app, request("GET", "/api/results", Some(&taker), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["score"], 1);

    let (status, fetched) = send(
        &app,
        request("GET", &format!("/api/results/{}", result_id), Some(&taker), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["question_count"], 5);

    let (status, _) = send(
        &app,
        request("GET", &format!("/api/results/{}", result_id), Some(&author), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn question_count_is_a_snapshot_across_later_edits() {
    let (app, _pool) = setup().await;
    let author = register(&app, "snapshot_author").await;
    let taker = register(&app, "snapshot_taker").await;

    let tree = seed_test(&app, &author, "Snapshot test").await;
    let test_id = tree["id"].as_str().unwrap().to_string();

    let (_, result) = send(
        &app,
        request(
            "POST",
            &format!("/api/tests/{}/attempts", test_id),
            Some(&taker),
            Some(&attempt_payload(&[])),
        ),
    )
    .await;
    let result_id = result["id"].as_str().unwrap().to_string();

    // Grow the test to six questions after the attempt.
    let (_, edit_view) = send(
        &app,
        request("GET", &format!("/api/tests/{}/edit", test_id), Some(&author), None),
    )
    .await;
    let mut update = json!({
        "name": edit_view["name"],
        "description": edit_view["description"],
        "questions": edit_view["questions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|q| {
                json!({
                    "id": q["id"],
                    "text": q["text"],
                    "answers": q["answers"].as_array().unwrap().iter().map(|a| {
                        json!({ "text": a["text"], "is_correct": a["is_correct"] })
                    }).collect::<Vec<_>>(),
                })
            })
            .collect::<Vec<_>>(),
    });
    let extra_answers: Vec<JsonValue> = (0..4)
        .map(|j| json!({ "text": format!("extra option {}", j), "is_correct": j == 0 }))
        .collect();
    update["questions"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "text": "Added later", "answers": extra_answers }));
    let (status, _) = send(
        &app,
        request("PUT", &format!("/api/tests/{}", test_id), Some(&author), Some(&update)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, fetched) = send(
        &app,
        request("GET", &format!("/api/results/{}", result_id), Some(&taker), None),
    )
    .await;
    assert_eq!(fetched["question_count"], 5);
}
