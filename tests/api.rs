//! Router-level tests driving the full HTTP surface against the in-memory store and a manual clock.

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
    response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use trivia_back::{
    config::AppConfig,
    dao::{
        models::{QuestionEntity, QuestionOptionEntity},
        trivia_store::memory::MemoryTriviaStore,
    },
    routes,
    state::{AppState, ManualClock, SharedState},
};

const SESSION: &str = "x-session-token";

fn t0() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

struct TestApp {
    state: SharedState,
    clock: Arc<ManualClock>,
}

impl TestApp {
    async fn new() -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let state = AppState::with_clock(AppConfig::default(), clock.clone());
        state.set_store(Arc::new(MemoryTriviaStore::new())).await;
        Self { state, clock }
    }

    fn router(&self) -> Router {
        routes::router(self.state.clone())
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(SESSION, token);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router().oneshot(request).await.unwrap()
    }

    async fn create_room(&self) -> Value {
        let response = self.send(Method::POST, "/rooms", None, None).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    /// Join `room_id`; returns the player id and its session token.
    async fn join(&self, room_id: &str, username: &str) -> (String, String) {
        let response = self
            .send(
                Method::POST,
                &format!("/rooms/{room_id}/players"),
                None,
                Some(json!({ "username": username })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let header = response.headers()[SESSION].to_str().unwrap().to_owned();
        let body = body_json(response).await;
        assert_eq!(body["session_token"], header.as_str());
        (body["player"]["id"].as_str().unwrap().to_owned(), header)
    }

    async fn create_game(&self, room_id: &str) -> Value {
        let response = self
            .send(
                Method::POST,
                "/games",
                None,
                Some(json!({ "room_id": room_id })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    async fn rounds(&self, game_id: &str) -> Vec<Value> {
        let response = self
            .send(Method::GET, &format!("/games/{game_id}/rounds"), None, None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await.as_array().unwrap().clone()
    }

    async fn seed_question(&self, round_id: &str) -> Uuid {
        let round_id: Uuid = round_id.parse().unwrap();
        let question = QuestionEntity {
            id: Uuid::new_v4(),
            round_id,
            kind: "open".into(),
            text: "Largest planet?".into(),
            media_url: None,
        };
        let option = QuestionOptionEntity {
            id: Uuid::new_v4(),
            question_id: question.id,
            text: "Jupiter".into(),
            is_correct: true,
        };
        let id = question.id;
        self.state
            .require_store()
            .await
            .unwrap()
            .insert_questions(vec![question], vec![option])
            .await
            .unwrap();
        id
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Room with a host, a regular player and a started game of three 60-second rounds.
struct Lobby {
    game_id: String,
    host_token: String,
    player_id: String,
    player_token: String,
}

async fn lobby(app: &TestApp) -> Lobby {
    let room = app.create_room().await;
    let room_id = room["id"].as_str().unwrap().to_owned();
    let (_, host_token) = app.join(&room_id, "host").await;
    let (player_id, player_token) = app.join(&room_id, "player").await;

    let response = app
        .send(
            Method::PUT,
            &format!("/rooms/{room_id}/settings"),
            Some(&host_token),
            Some(json!({
                "rounds": 3,
                "time_per_round": 60,
                "questions_per_round": 1,
                "difficulty": "medium",
                "max_players_per_team": 2
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let game = app.create_game(&room_id).await;
    Lobby {
        game_id: game["id"].as_str().unwrap().to_owned(),
        host_token,
        player_id,
        player_token,
    }
}

#[tokio::test]
async fn healthcheck_reports_ok_with_a_store() {
    let app = TestApp::new().await;
    let response = app.send(Method::GET, "/healthcheck", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn degraded_mode_rejects_store_backed_routes() {
    let app = TestApp::new().await;
    app.state.clear_store().await;

    let response = app.send(Method::POST, "/rooms", None, None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app.send(Method::GET, "/healthcheck", None, None).await;
    assert_eq!(body_json(response).await["status"], "degraded");
}

#[tokio::test]
async fn first_joiner_is_host_and_room_is_readable() {
    let app = TestApp::new().await;
    let room = app.create_room().await;
    let room_id = room["id"].as_str().unwrap();
    assert_eq!(room["slug"].as_str().unwrap().len(), 8);

    app.join(room_id, "ada").await;
    app.join(room_id, "bob").await;

    let response = app
        .send(Method::GET, &format!("/rooms/{room_id}/players"), None, None)
        .await;
    let players = body_json(response).await;
    assert_eq!(players[0]["username"], "ada");
    assert_eq!(players[0]["is_host"], true);
    assert_eq!(players[1]["is_host"], false);

    let response = app
        .send(Method::GET, &format!("/rooms/{room_id}"), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], room_id);
}

#[tokio::test]
async fn blank_username_is_a_bad_request() {
    let app = TestApp::new().await;
    let room = app.create_room().await;
    let response = app
        .send(
            Method::POST,
            &format!("/rooms/{}/players", room["id"].as_str().unwrap()),
            None,
            Some(json!({ "username": "   " })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settings_update_requires_the_host() {
    let app = TestApp::new().await;
    let room = app.create_room().await;
    let room_id = room["id"].as_str().unwrap();
    app.join(room_id, "host").await;
    let (_, guest_token) = app.join(room_id, "guest").await;

    let payload = json!({
        "rounds": 2,
        "time_per_round": 30,
        "questions_per_round": 1,
        "difficulty": "easy",
        "max_players_per_team": 1
    });
    let response = app
        .send(
            Method::PUT,
            &format!("/rooms/{room_id}/settings"),
            Some(&guest_token),
            Some(payload),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn game_materializes_back_to_back_rounds() {
    let app = TestApp::new().await;
    let lobby = lobby(&app).await;

    let rounds = app.rounds(&lobby.game_id).await;
    assert_eq!(rounds.len(), 3);
    for (index, round) in rounds.iter().enumerate() {
        assert_eq!(round["number"], index + 1);
    }
    assert_eq!(rounds[0]["ended_at"], rounds[1]["started_at"]);
    assert_eq!(rounds[1]["ended_at"], rounds[2]["started_at"]);
    assert_eq!(rounds[0]["phase"], "active");
    assert_eq!(rounds[2]["phase"], "pending");

    app.clock.set(t0() + Duration::from_secs(180));
    let rounds = app.rounds(&lobby.game_id).await;
    assert!(rounds.iter().all(|round| round["phase"] == "closed"));
}

#[tokio::test]
async fn pending_round_hides_its_questions() {
    let app = TestApp::new().await;
    let lobby = lobby(&app).await;
    let rounds = app.rounds(&lobby.game_id).await;
    let second = rounds[1]["id"].as_str().unwrap();
    app.seed_question(second).await;
    let uri = format!("/games/{}/rounds/{second}/questions", lobby.game_id);

    let response = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.clock.set(t0() + Duration::from_secs(60));
    let response = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let questions = body_json(response).await;
    assert_eq!(questions[0]["options"][0]["text"], "Jupiter");
    assert!(questions[0]["options"][0].get("is_correct").is_none());
}

#[tokio::test]
async fn answers_open_at_round_end_and_are_accepted_once() {
    let app = TestApp::new().await;
    let lobby = lobby(&app).await;
    let rounds = app.rounds(&lobby.game_id).await;
    let first = rounds[0]["id"].as_str().unwrap();
    let question = app.seed_question(first).await;
    let uri = format!(
        "/games/{}/rounds/{first}/questions/{question}/players/{}",
        lobby.game_id, lobby.player_id
    );
    let answer = json!({ "answer": "Jupiter" });

    app.clock.set(t0() + Duration::from_secs(59));
    let response = app
        .send(Method::POST, &uri, Some(&lobby.player_token), Some(answer.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.clock.set(t0() + Duration::from_secs(60));
    let response = app
        .send(Method::POST, &uri, Some(&lobby.host_token), Some(answer.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(Method::POST, &uri, Some(&lobby.player_token), Some(answer.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let accepted = body_json(response).await;
    assert_eq!(accepted["answer"], "Jupiter");

    let response = app
        .send(Method::POST, &uri, Some(&lobby.player_token), Some(answer))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .send(Method::GET, &uri, Some(&lobby.player_token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], accepted["id"]);

    let response = app
        .send(Method::GET, &uri, Some(&lobby.host_token), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn empty_answer_payload_is_a_bad_request() {
    let app = TestApp::new().await;
    let lobby = lobby(&app).await;
    let rounds = app.rounds(&lobby.game_id).await;
    let first = rounds[0]["id"].as_str().unwrap();
    let question = app.seed_question(first).await;
    app.clock.set(t0() + Duration::from_secs(60));

    let uri = format!(
        "/games/{}/rounds/{first}/questions/{question}/players/{}",
        lobby.game_id, lobby.player_id
    );
    let response = app
        .send(Method::POST, &uri, Some(&lobby.player_token), Some(json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_the_host_deletes_a_game() {
    let app = TestApp::new().await;
    let lobby = lobby(&app).await;
    let uri = format!("/games/{}", lobby.game_id);

    let response = app
        .send(Method::DELETE, &uri, Some(&lobby.player_token), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.send(Method::DELETE, &uri, None, None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(Method::DELETE, &uri, Some(&lobby.host_token), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_game_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .send(
            Method::GET,
            &format!("/games/{}/rounds", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn openapi_document_lists_the_answer_route() {
    let app = TestApp::new().await;
    let response = app
        .send(Method::GET, "/api-doc/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(
        doc["paths"]
            .get("/games/{game_id}/rounds/{round_id}/questions/{question_id}/players/{player_id}")
            .is_some()
    );
}
