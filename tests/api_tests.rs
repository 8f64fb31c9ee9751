// tests/api_tests.rs

use std::{sync::Arc, time::Duration};

use url::Url;
use wildguard::{
    config::Config,
    identity::{IdentityProfile, StaticIdentityProvider},
    routes,
    state::AppState,
    store::MemoryStore,
};

const ADMIN_TOKEN: &str = "idp-admin-token";
const LEARNER_TOKEN: &str = "idp-learner-token";

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let identity = StaticIdentityProvider::new()
        .with_profile(
            ADMIN_TOKEN,
            IdentityProfile {
                sub: "admin-1".to_string(),
                email: "admin@wildguard.my".to_string(),
                name: Some("Admin".to_string()),
                picture: None,
            },
        )
        .with_profile(
            LEARNER_TOKEN,
            IdentityProfile {
                sub: "learner-1".to_string(),
                email: "aina@example.my".to_string(),
                name: Some("Aina".to_string()),
                picture: Some("https://cdn.example.my/aina.png".to_string()),
            },
        );

    let config = Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        oidc_userinfo_url: Url::parse("https://idp.example.my/userinfo").unwrap(),
        admin_emails: vec!["admin@wildguard.my".to_string()],
        pre_quiz_passing_percentage: 0,
        port: 0,
        media_dir: std::env::temp_dir().join(format!("wildguard-api-{}", uuid::Uuid::new_v4())),
        public_base_url: Url::parse("http://media.test").unwrap(),
    };

    let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(identity), config);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

async fn login(client: &reqwest::Client, address: &str, access_token: &str) -> serde_json::Value {
    client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "access_token": access_token }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json")
}

fn sample_quiz() -> serde_json::Value {
    serde_json::json!({
        "title": "Malayan Tiger Basics",
        "category": "mammals",
        "grade_level": "primary-5",
        "difficulty": "easy",
        "questions": [
            {
                "text": "Where does the Malayan tiger live?",
                "options": ["Rainforest", "Desert", "Tundra"],
                "correct_answer": "Rainforest"
            },
            {
                "text": "Is the Malayan tiger endangered?",
                "options": ["Yes", "No"],
                "correct_answer": "Yes",
                "points": 20,
                "penalty": 5
            }
        ]
    })
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn login_creates_then_refreshes_profile() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let first = login(&client, &address, LEARNER_TOKEN).await;
    assert_eq!(first["type"], "Bearer");
    assert_eq!(first["user"]["id"], "learner-1");
    assert_eq!(first["user"]["role"], "user");
    assert_eq!(first["user"]["language"], "en");

    let token = first["token"].as_str().unwrap();

    // Preferences survive the next login.
    let updated = client
        .put(format!("{}/api/me/preferences", address))
        .bearer_auth(token)
        .json(&serde_json::json!({ "language": "ms" }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status().as_u16(), 200);

    let second = login(&client, &address, LEARNER_TOKEN).await;
    assert_eq!(second["user"]["language"], "ms");
    assert_eq!(second["user"]["created_at"], first["user"]["created_at"]);

    let me: serde_json::Value = client
        .get(format!("{}/api/me", address))
        .bearer_auth(second["token"].as_str().unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], "aina@example.my");
    assert_eq!(me["picture"], "https://cdn.example.my/aina.png");
}

#[tokio::test]
async fn admin_role_comes_from_config() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let admin = login(&client, &address, ADMIN_TOKEN).await;
    assert_eq!(admin["user"]["role"], "admin");
}

#[tokio::test]
async fn login_rejects_unknown_access_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "access_token": "forged" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let empty = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "access_token": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status().as_u16(), 400);
}

#[tokio::test]
async fn protected_routes_require_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    for path in ["/api/me", "/api/attempts", "/api/certificate", "/api/sessions/tiger"] {
        let response = client
            .get(format!("{}{}", address, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 401, "{}", path);
    }

    let bad_token = client
        .get(format!("{}/api/me", address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(bad_token.status().as_u16(), 401);
}

#[tokio::test]
async fn only_admins_create_quizzes() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let learner = login(&client, &address, LEARNER_TOKEN).await;

    let response = client
        .post(format!("{}/api/admin/quizzes", address))
        .bearer_auth(learner["token"].as_str().unwrap())
        .json(&sample_quiz())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn quiz_creation_validates_answer_key() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &address, ADMIN_TOKEN).await;
    let token = admin["token"].as_str().unwrap();

    let mut quiz = sample_quiz();
    quiz["questions"][0]["correct_answer"] = serde_json::json!("Ocean");

    let response = client
        .post(format!("{}/api/admin/quizzes", address))
        .bearer_auth(token)
        .json(&quiz)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let mut quiz = sample_quiz();
    quiz["difficulty"] = serde_json::json!("impossible");
    let response = client
        .post(format!("{}/api/admin/quizzes", address))
        .bearer_auth(token)
        .json(&quiz)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn quizzes_hide_answers_and_score_attempts() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &address, ADMIN_TOKEN).await;
    let learner = login(&client, &address, LEARNER_TOKEN).await;
    let learner_token = learner["token"].as_str().unwrap();

    let created: serde_json::Value = client
        .post(format!("{}/api/admin/quizzes", address))
        .bearer_auth(admin["token"].as_str().unwrap())
        .json(&sample_quiz())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let quiz_id = created["id"].as_str().unwrap();

    // Fetching twice without mutation gives identical data.
    let first: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first["max_score"], 30);
    assert!(first["questions"][0].get("correct_answer").is_none());

    let listed: Vec<serde_json::Value> = client
        .get(format!("{}/api/quizzes", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    // First right, second wrong: 10 - 5 = 5 of 30.
    let response = client
        .post(format!("{}/api/quizzes/{}/attempts", address, quiz_id))
        .bearer_auth(learner_token)
        .json(&serde_json::json!({ "answers": ["Rainforest", "No"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let result: serde_json::Value = response.json().await.unwrap();
    assert_eq!(result["correct_count"], 1);
    assert_eq!(result["score"], 5);
    assert_eq!(result["max_score"], 30);
    assert_eq!(result["percentage"], 17);
    assert_eq!(result["unlocked_topics"], serde_json::json!([]));

    let attempts: Vec<serde_json::Value> = client
        .get(format!("{}/api/attempts", address))
        .bearer_auth(learner_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["quiz_id"], quiz_id);

    let missing = client
        .post(format!("{}/api/quizzes/unknown/attempts", address))
        .bearer_auth(learner_token)
        .json(&serde_json::json!({ "answers": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn quiz_stream_delivers_new_quizzes() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &address, ADMIN_TOKEN).await;

    let mut stream = client
        .get(format!("{}/api/quizzes/stream", address))
        .send()
        .await
        .unwrap();
    assert_eq!(stream.status().as_u16(), 200);

    client
        .post(format!("{}/api/admin/quizzes", address))
        .bearer_auth(admin["token"].as_str().unwrap())
        .json(&sample_quiz())
        .send()
        .await
        .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), async {
        let mut buffer = String::new();
        while let Some(chunk) = stream.chunk().await.unwrap() {
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            if buffer.contains("Malayan Tiger Basics") {
                break;
            }
        }
        buffer
    })
    .await
    .expect("No quiz event received");

    assert!(received.contains("event: quiz"));
}

#[tokio::test]
async fn logout_revokes_only_that_token() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let first = login(&client, &address, LEARNER_TOKEN).await;
    let second = login(&client, &address, LEARNER_TOKEN).await;
    let first_token = first["token"].as_str().unwrap();
    let second_token = second["token"].as_str().unwrap();

    let response = client
        .post(format!("{}/api/auth/logout", address))
        .bearer_auth(first_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let revoked = client
        .get(format!("{}/api/me", address))
        .bearer_auth(first_token)
        .send()
        .await
        .unwrap();
    assert_eq!(revoked.status().as_u16(), 401);

    let still_valid = client
        .get(format!("{}/api/me", address))
        .bearer_auth(second_token)
        .send()
        .await
        .unwrap();
    assert_eq!(still_valid.status().as_u16(), 200);

    let anonymous = client
        .post(format!("{}/api/auth/logout", address))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);
}

fn png_form(bytes: &'static [u8], mime: &str) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name("tiger.png")
        .mime_str(mime)
        .unwrap();
    reqwest::multipart::Form::new().part("file", part)
}

#[tokio::test]
async fn admin_uploads_serves_and_deletes_media() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &address, ADMIN_TOKEN).await;
    let token = admin["token"].as_str().unwrap();

    let response = client
        .post(format!("{}/api/admin/media", address))
        .bearer_auth(token)
        .multipart(png_form(b"\x89PNG fake image", "image/png"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let uploaded: serde_json::Value = response.json().await.unwrap();
    let name = uploaded["name"].as_str().unwrap().to_string();
    assert!(name.ends_with(".png"));
    assert_eq!(uploaded["size"], 15);
    assert_eq!(
        uploaded["url"],
        format!("http://media.test/media/{}", name)
    );

    // The URL is usable as a question image.
    let mut quiz = sample_quiz();
    quiz["questions"][0]["image_url"] = uploaded["url"].clone();
    let created = client
        .post(format!("{}/api/admin/quizzes", address))
        .bearer_auth(token)
        .json(&quiz)
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);

    let served = client
        .get(format!("{}/media/{}", address, name))
        .send()
        .await
        .unwrap();
    assert_eq!(served.status().as_u16(), 200);
    assert_eq!(served.bytes().await.unwrap().as_ref(), b"\x89PNG fake image");

    let deleted = client
        .delete(format!("{}/api/admin/media/{}", address, name))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let gone = client
        .delete(format!("{}/api/admin/media/{}", address, name))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}

#[tokio::test]
async fn media_upload_rejects_learners_and_unknown_types() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &address, ADMIN_TOKEN).await;
    let learner = login(&client, &address, LEARNER_TOKEN).await;

    let forbidden = client
        .post(format!("{}/api/admin/media", address))
        .bearer_auth(learner["token"].as_str().unwrap())
        .multipart(png_form(b"img", "image/png"))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);

    let wrong_type = client
        .post(format!("{}/api/admin/media", address))
        .bearer_auth(admin["token"].as_str().unwrap())
        .multipart(png_form(b"<script>", "text/html"))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_type.status().as_u16(), 400);

    let traversal = client
        .delete(format!("{}/api/admin/media/..%2FCargo.toml", address))
        .bearer_auth(admin["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(traversal.status().as_u16(), 404);
}
