use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use reelbase::api::AppState;
use reelbase::config::Config;
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    app: Router,
    state: Arc<AppState>,
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = format!(
        "sqlite:{}/reelbase-test-{}.db?mode=rwc",
        std::env::temp_dir().display(),
        uuid::Uuid::new_v4()
    );
    config.security.jwt_secret = "integration-test-secret-0123456789".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn spawn_app() -> TestApp {
    let state = reelbase::api::create_app_state_from_config(test_config(), None)
        .await
        .expect("Failed to create app state");
    let app = reelbase::api::router(state.clone());
    TestApp { app, state }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn signup(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/signup",
        None,
        Some(json!({
            "firstName": "Test",
            "lastName": "User",
            "email": email,
            "password": password,
        })),
    )
    .await
}

async fn signin(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/signin",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

/// Registers, activates and signs in a user, optionally with a role.
async fn login(test: &TestApp, email: &str, role: Option<&str>) -> (String, String) {
    let (status, body) = signup(&test.app, email, "secret123").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let user_id = body["data"]["id"].as_str().unwrap().to_string();

    let users = test.state.store.users();
    users.set_active_by_email(email, true).await.unwrap();
    if let Some(role) = role {
        users
            .set_role_by_email(email, Some(role.to_string()))
            .await
            .unwrap();
    }

    let (status, body) = signin(&test.app, email, "secret123").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (body["data"]["token"].as_str().unwrap().to_string(), user_id)
}

async fn create_actor(app: &Router, token: &str, first_name: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/actor",
        Some(token),
        Some(json!({
            "firstName": first_name,
            "lastName": "Hanks",
            "gender": "male",
            "age": 67,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn create_movie(app: &Router, token: &str, title: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/movie",
        Some(token),
        Some(json!({
            "title": title,
            "description": "A movie",
            "cost": 90.5,
            "released_date": "2000-12-22",
            "duration": 143,
            "image": "poster.png",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let test = spawn_app().await;

    let (status, body) = send(&test.app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["data"]["database"], true);
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let test = spawn_app().await;
    let actor = json!({"firstName": "Tom", "lastName": "Hanks", "gender": "male", "age": 67});

    let (status, body) = send(&test.app, "POST", "/actor", None, Some(actor.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], false);
    assert_eq!(body["data"], json!([]));

    let (status, _) = send(&test.app, "POST", "/actor", Some("not-a-jwt"), Some(actor)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&test.app, "GET", "/whoami", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Reads stay public
    let (status, body) = send(&test.app, "GET", "/actor", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_actor_create_and_validation() {
    let test = spawn_app().await;
    let (token, _) = login(&test, "ada@example.com", None).await;

    let (status, body) = send(
        &test.app,
        "POST",
        "/actor",
        Some(&token),
        Some(json!({
            "id": "caller-chosen",
            "firstName": "Tom",
            "lastName": "Hanks",
            "gender": "male",
            "age": 67,
            "image": "tom.png",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], true);
    let id = body["data"]["id"].as_str().unwrap();
    assert_ne!(id, "caller-chosen");
    assert_eq!(body["data"]["firstName"], "Tom");

    let (status, body) = send(
        &test.app,
        "POST",
        "/actor",
        Some(&token),
        Some(json!({"lastName": "Hanks", "gender": "male", "age": 67})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], false);
    assert!(body["message"].as_str().unwrap().contains("firstName"));

    let (status, _) = send(
        &test.app,
        "POST",
        "/actor",
        Some(&token),
        Some(json!({"firstName": 42})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_actor_crud_round() {
    let test = spawn_app().await;
    let (token, _) = login(&test, "crud@example.com", None).await;
    let id = create_actor(&test.app, &token, "Meryl").await;

    let (status, body) = send(
        &test.app,
        "PATCH",
        &format!("/actor/{id}"),
        Some(&token),
        Some(json!({"age": 74})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["age"], 74);
    assert_eq!(body["data"]["firstName"], "Meryl");

    let (status, _) = send(&test.app, "DELETE", &format!("/actor/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&test.app, "GET", &format!("/actor/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], false);

    let (status, _) = send(
        &test.app,
        "PATCH",
        "/actor/missing",
        Some(&token),
        Some(json!({"age": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_link_is_idempotent() {
    let test = spawn_app().await;
    let (token, _) = login(&test, "link@example.com", None).await;
    let actor_id = create_actor(&test.app, &token, "Tom").await;
    let movie_id = create_movie(&test.app, &token, "Cast Away").await;

    let uri = format!("/movies/{movie_id}/actors/{actor_id}");
    let (status, body) = send(&test.app, "PUT", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["linked"], true);

    let (status, body) = send(&test.app, "PUT", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["linked"], false);

    let (_, body) = send(&test.app, "GET", &format!("/movies/{movie_id}/actors"), None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(&test.app, "GET", &format!("/movie/{movie_id}"), None, None).await;
    assert_eq!(body["data"]["actorIds"], json!([actor_id]));

    let (_, body) = send(&test.app, "GET", &format!("/actors/{actor_id}/movies"), None, None).await;
    assert_eq!(body["data"][0]["id"], movie_id.as_str());

    let (status, _) = send(
        &test.app,
        "PUT",
        &format!("/movies/{movie_id}/actors/missing"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_actor_delete_blocked_while_linked() {
    let test = spawn_app().await;
    let (token, _) = login(&test, "block@example.com", None).await;
    let actor_id = create_actor(&test.app, &token, "Tom").await;
    let movie_id = create_movie(&test.app, &token, "Big").await;

    send(
        &test.app,
        "PUT",
        &format!("/actors/{actor_id}/movies/{movie_id}"),
        Some(&token),
        None,
    )
    .await;

    let (status, body) = send(
        &test.app,
        "DELETE",
        &format!("/actor/{actor_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], false);

    let (status, _) = send(
        &test.app,
        "DELETE",
        &format!("/actors/{actor_id}/movies/{movie_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &test.app,
        "DELETE",
        &format!("/actor/{actor_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_movie_actor_set_operations() {
    let test = spawn_app().await;
    let (token, _) = login(&test, "set@example.com", None).await;
    let tom = create_actor(&test.app, &token, "Tom").await;
    let meg = create_actor(&test.app, &token, "Meg").await;
    let movie_id = create_movie(&test.app, &token, "Sleepless in Seattle").await;

    let (status, body) = send(
        &test.app,
        "POST",
        &format!("/movie/{movie_id}/actors"),
        Some(&token),
        Some(json!([tom, {"id": meg}, tom])),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["count"], 2);

    let (status, body) = send(
        &test.app,
        "PUT",
        &format!("/movie/{movie_id}/actors"),
        Some(&token),
        Some(json!({"actorIds": [meg]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["actorIds"], json!([meg]));

    let (status, body) = send(
        &test.app,
        "PATCH",
        &format!("/movies/{movie_id}/actors"),
        Some(&token),
        Some(json!({"age": 60})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["count"], 1);

    let (_, body) = send(&test.app, "GET", &format!("/actor/{tom}"), None, None).await;
    assert_eq!(body["data"]["age"], 67);

    let (status, _) = send(
        &test.app,
        "POST",
        "/movie",
        Some(&token),
        Some(json!({
            "title": "Ghost cast",
            "description": "d",
            "released_date": "2001-01-01",
            "duration": 90,
            "image": "i.png",
            "actorIds": ["missing"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_review_lifecycle() {
    let test = spawn_app().await;
    let (author, author_id) = login(&test, "author@example.com", None).await;
    let (other, _) = login(&test, "other@example.com", None).await;
    let (moderator, _) = login(&test, "mod@example.com", Some("moderator")).await;
    let movie_id = create_movie(&test.app, &author, "Philadelphia").await;

    let (status, body) = send(
        &test.app,
        "POST",
        "/review",
        Some(&author),
        Some(json!({
            "reviewScore": 9,
            "description": "Moving",
            "movieId": movie_id,
            "status": "approved",
            "userId": "someone-else",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "checking");
    assert_eq!(body["data"]["userId"], author_id.as_str());
    let review_id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/review/{review_id}");

    let (status, _) = send(
        &test.app,
        "PATCH",
        &uri,
        Some(&author),
        Some(json!({"status": "approved"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &test.app,
        "PATCH",
        &uri,
        Some(&other),
        Some(json!({"description": "Hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &test.app,
        "PATCH",
        &uri,
        Some(&moderator),
        Some(json!({"status": "approved"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "approved");

    let (status, _) = send(
        &test.app,
        "PATCH",
        &uri,
        Some(&moderator),
        Some(json!({"status": "published"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&test.app, "GET", &format!("/reviews/{review_id}/user"), None, None).await;
    assert_eq!(body["data"]["email"], "author@example.com");

    let (status, _) = send(
        &test.app,
        "POST",
        "/review",
        Some(&author),
        Some(json!({"reviewScore": 5, "description": "?", "movieId": "missing"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_movie_reviews_bulk_moderation() {
    let test = spawn_app().await;
    let (author, _) = login(&test, "bulk@example.com", None).await;
    let (moderator, _) = login(&test, "admin@example.com", Some("admin")).await;
    let movie_id = create_movie(&test.app, &author, "Forrest Gump").await;
    let reviews_uri = format!("/movie/{movie_id}/reviews");

    for score in [3, 8] {
        let (status, body) = send(
            &test.app,
            "POST",
            &reviews_uri,
            Some(&author),
            Some(json!({"reviewScore": score, "description": "ok"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, _) = send(
        &test.app,
        "PATCH",
        &reviews_uri,
        Some(&author),
        Some(json!({"status": "declined"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let where_clause = urlencoding::encode(r#"{"reviewScore":{"lt":5}}"#);
    let (status, body) = send(
        &test.app,
        "PATCH",
        &format!("{reviews_uri}?where={where_clause}"),
        Some(&moderator),
        Some(json!({"status": "declined"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["count"], 1);

    let filter = urlencoding::encode(r#"{"where":{"status":"checking"}}"#);
    let (_, body) = send(&test.app, "GET", &format!("{reviews_uri}?filter={filter}"), None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["reviewScore"], 8);

    let (status, body) = send(&test.app, "DELETE", &reviews_uri, Some(&moderator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 2);
}

#[tokio::test]
async fn test_movie_delete_removes_reviews_and_links() {
    let test = spawn_app().await;
    let (token, _) = login(&test, "cascade@example.com", None).await;
    let actor_id = create_actor(&test.app, &token, "Tom").await;
    let movie_id = create_movie(&test.app, &token, "Splash").await;

    send(
        &test.app,
        "PUT",
        &format!("/movies/{movie_id}/actors/{actor_id}"),
        Some(&token),
        None,
    )
    .await;
    let (_, body) = send(
        &test.app,
        "POST",
        &format!("/movie/{movie_id}/reviews"),
        Some(&token),
        Some(json!({"reviewScore": 7, "description": "Wet"})),
    )
    .await;
    let review_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&test.app, "DELETE", &format!("/movie/{movie_id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&test.app, "GET", &format!("/review/{review_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&test.app, "DELETE", &format!("/actor/{actor_id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_search_is_case_insensitive_prefix() {
    let test = spawn_app().await;
    let (token, _) = login(&test, "search@example.com", None).await;
    for name in ["Tom", "tommy", "Atom", "100%"] {
        create_actor(&test.app, &token, name).await;
    }

    let (status, body) = send(&test.app, "GET", "/actor/search/tom", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["firstName"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Tom", "tommy"]);

    let (_, body) = send(&test.app, "GET", "/actor/search/%25", None, None).await;
    assert_eq!(body["data"], json!([]));

    create_movie(&test.app, &token, "The Terminal").await;
    let (_, body) = send(&test.app, "GET", "/movie/search/the%20t", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_signup_and_signin_flow() {
    let test = spawn_app().await;

    let (status, body) = signup(&test.app, "Grace@Example.com", "secret123").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["email"], "grace@example.com");
    assert_eq!(body["data"]["isActive"], false);
    assert!(body["data"].get("password").is_none());

    let (status, body) = signup(&test.app, "grace@example.com", "secret123").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email is already registered");

    let (status, body) = signin(&test.app, "grace@example.com", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User is not active yet");

    test.state
        .store
        .users()
        .set_active_by_email("grace@example.com", true)
        .await
        .unwrap();

    let (status, body) = signin(&test.app, "grace@example.com", "wrong-password").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid user credentials");

    let (status, body) = signin(&test.app, "nobody@example.com", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid user credentials");

    let (status, body) = signin(&test.app, "grace@example.com", "secret123").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["expiresIn"].as_i64().unwrap() > 0);
    let token = body["data"]["token"].as_str().unwrap();

    let (status, body) = send(&test.app, "GET", "/whoami", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "grace@example.com");

    let (status, body) = signup(&test.app, "bad-email", "x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("email") && message.contains("password"));
}

#[tokio::test]
async fn test_user_management_permissions() {
    let test = spawn_app().await;
    let (alice, alice_id) = login(&test, "alice@example.com", None).await;
    let (_, bob_id) = login(&test, "bob@example.com", None).await;
    let (admin, _) = login(&test, "root@example.com", Some("admin")).await;

    let (status, _) = send(
        &test.app,
        "PATCH",
        &format!("/user/{bob_id}"),
        Some(&alice),
        Some(json!({"firstName": "Robert"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &test.app,
        "PATCH",
        &format!("/user/{alice_id}"),
        Some(&alice),
        Some(json!({"role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &test.app,
        "PATCH",
        &format!("/user/{alice_id}"),
        Some(&alice),
        Some(json!({"firstName": "Alicia"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["firstName"], "Alicia");

    let (status, _) = send(
        &test.app,
        "PATCH",
        &format!("/user/{alice_id}"),
        Some(&alice),
        Some(json!({"email": "bob@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &test.app,
        "PATCH",
        &format!("/user/{bob_id}"),
        Some(&admin),
        Some(json!({"role": "moderator"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["role"], "moderator");

    let (status, body) = send(&test.app, "GET", "/users/list", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, _) = send(&test.app, "DELETE", &format!("/user/{bob_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&test.app, "GET", &format!("/users/{bob_id}/reviews"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_filter_validation() {
    let test = spawn_app().await;

    for raw in [
        r#"{"limit":5000}"#,
        r#"{"where":{"nickname":"x"}}"#,
        r#"{"where":{"age":{"between":[1,2]}}}"#,
        r#"{"include":"agents"}"#,
        "{not json",
    ] {
        let (status, body) = send(
            &test.app,
            "GET",
            &format!("/actor?filter={}", urlencoding::encode(raw)),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{raw}");
        assert_eq!(body["status"], false);
    }

    let (status, _) = send(
        &test.app,
        "GET",
        &format!("/actor?filter={}", urlencoding::encode(r#"{"limit":10,"include":"movies"}"#)),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_default_secret_refuses_to_start() {
    let mut config = test_config();
    config.security.jwt_secret = Config::default().security.jwt_secret;

    let result = reelbase::api::create_app_state_from_config(config, None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_movie_actor_delete_keeps_shared_actors() {
    let test = spawn_app().await;
    let (token, _) = login(&test, "shared@example.com", None).await;
    let tom = create_actor(&test.app, &token, "Tom").await;
    let extra = create_actor(&test.app, &token, "Extra").await;
    let first = create_movie(&test.app, &token, "Cast Away").await;
    let second = create_movie(&test.app, &token, "The Terminal").await;

    for (movie_id, actor_id) in [(&first, &tom), (&second, &tom), (&first, &extra)] {
        let (status, _) = send(
            &test.app,
            "PUT",
            &format!("/movies/{movie_id}/actors/{actor_id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &test.app,
        "DELETE",
        &format!("/movies/{first}/actors"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    // Nothing was removed, not even the actor only this movie uses
    let (_, body) = send(&test.app, "GET", &format!("/movies/{first}/actors"), None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let (_, body) = send(&test.app, "GET", &format!("/movies/{second}/actors"), None, None).await;
    assert_eq!(body["data"][0]["id"], json!(tom));

    let where_clause = urlencoding::encode(r#"{"firstName":"Extra"}"#);
    let (status, body) = send(
        &test.app,
        "DELETE",
        &format!("/movies/{first}/actors?where={where_clause}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["count"], 1);

    let (status, _) = send(&test.app, "GET", &format!("/actor/{extra}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&test.app, "GET", &format!("/actor/{tom}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_movie_write_with_unknown_actor_leaves_nothing_behind() {
    let test = spawn_app().await;
    let (token, _) = login(&test, "atomic@example.com", None).await;
    let tom = create_actor(&test.app, &token, "Tom").await;

    let (status, _) = send(
        &test.app,
        "POST",
        "/movie",
        Some(&token),
        Some(json!({
            "title": "Philadelphia",
            "description": "d",
            "released_date": "1993-12-22",
            "duration": 125,
            "image": "p.png",
            "actorIds": [tom, "missing"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&test.app, "GET", "/movie", None, None).await;
    assert_eq!(body["data"], json!([]));

    let movie_id = create_movie(&test.app, &token, "Big").await;
    send(
        &test.app,
        "PUT",
        &format!("/movies/{movie_id}/actors/{tom}"),
        Some(&token),
        None,
    )
    .await;

    let (status, _) = send(
        &test.app,
        "PATCH",
        &format!("/movie/{movie_id}"),
        Some(&token),
        Some(json!({"title": "Bigger", "actorIds": ["missing"]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&test.app, "GET", &format!("/movie/{movie_id}"), None, None).await;
    assert_eq!(body["data"]["title"], "Big");
    assert_eq!(body["data"]["actorIds"], json!([tom]));
}

#[tokio::test]
async fn test_metrics_not_found_when_disabled() {
    let test = spawn_app().await;

    let (status, body) = send(&test.app, "GET", "/metrics", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], false);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_patch_null_clears_optional_fields() {
    let test = spawn_app().await;
    let (token, _) = login(&test, "nulls@example.com", None).await;
    let movie_id = create_movie(&test.app, &token, "Cast Away").await;

    let (status, body) = send(
        &test.app,
        "POST",
        "/actor",
        Some(&token),
        Some(json!({
            "firstName": "Helen",
            "lastName": "Hunt",
            "gender": "female",
            "age": 60,
            "image": "helen.png",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let actor_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = send(
        &test.app,
        "PATCH",
        &format!("/actor/{actor_id}"),
        Some(&token),
        Some(json!({"age": 61})),
    )
    .await;
    assert_eq!(body["data"]["image"], "helen.png");

    let (status, body) = send(
        &test.app,
        "PATCH",
        &format!("/actor/{actor_id}"),
        Some(&token),
        Some(json!({"image": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["image"], Value::Null);
    assert_eq!(body["data"]["age"], 61);

    let (status, body) = send(
        &test.app,
        "PATCH",
        &format!("/movie/{movie_id}"),
        Some(&token),
        Some(json!({"cost": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["cost"], Value::Null);
}
