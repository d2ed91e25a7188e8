//! End-to-end tests over the router: cookie contract, method selection,
//! scope enforcement, discovery endpoints.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use keygate_server::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;

const USERNAME: &str = "gohan@example.com";
const PASSWORD: &str = "password123";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn login_request(name: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "password_credentials": { "name": name, "password": password }
            })
            .to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn health_reports_database_up() {
    let env = common::setup().await;
    let state = common::create_test_state(&env).await;
    let app = build_router(state).await.unwrap();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"], "up");
}

#[tokio::test]
async fn jwks_exposes_only_public_material() {
    let env = common::setup().await;
    let state = common::create_test_state(&env).await;
    let app = build_router(state).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/.well-known/jwks.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let keys = body["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["kty"], "RSA");
    assert!(keys[0].get("d").is_none());
}

#[tokio::test]
async fn login_sets_strict_session_cookies() {
    let env = common::setup().await;
    common::create_user(&env, USERNAME, PASSWORD, false).await;
    let state = common::create_test_state(&env).await;
    let app = build_router(state).await.unwrap();

    let response = app
        .oneshot(login_request(USERNAME, PASSWORD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();

    let token_cookie = cookies
        .iter()
        .find(|c| c.starts_with("token="))
        .expect("token cookie set");
    assert!(token_cookie.contains("HttpOnly"));
    assert!(token_cookie.contains("SameSite=Strict"));

    let login_cookie = cookies
        .iter()
        .find(|c| c.starts_with("login="))
        .expect("login marker cookie set");
    assert!(!login_cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert_eq!(body["identity_name"], USERNAME);
    assert_eq!(body["password_reset_required"], false);
    assert!(body["bearer_token"].as_str().unwrap().contains('.'));
}

#[tokio::test]
async fn login_with_bad_password_is_unauthorized_with_no_detail() {
    let env = common::setup().await;
    common::create_user(&env, USERNAME, PASSWORD, false).await;
    let state = common::create_test_state(&env).await;
    let app = build_router(state).await.unwrap();

    let response = app
        .oneshot(login_request(USERNAME, "invalid password"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn login_requires_exactly_one_method() {
    let env = common::setup().await;
    let state = common::create_test_state(&env).await;
    let app = build_router(state).await.unwrap();

    // no method at all
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // two methods at once
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "password_credentials": { "name": USERNAME, "password": PASSWORD },
                        "key_exchange": { "bearer": "abcdefghij.secret" }
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_revokes_the_session_and_clears_cookies() {
    let env = common::setup().await;
    common::create_user(&env, USERNAME, PASSWORD, false).await;
    let state = common::create_test_state(&env).await;
    let app = build_router(state).await.unwrap();

    let response = app
        .clone()
        .oneshot(login_request(USERNAME, PASSWORD))
        .await
        .unwrap();
    let body = body_json(response).await;
    let bearer = body["bearer_token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/logout")
                .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<String> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("token=;")));

    // the bearer is dead now
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/logout")
                .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn one_time_password_flow_forces_reset_before_use() {
    let env = common::setup().await;
    let user = common::create_user(&env, USERNAME, PASSWORD, true).await;
    let state = common::create_test_state(&env).await;
    let app = build_router(state).await.unwrap();

    let response = app
        .clone()
        .oneshot(login_request(USERNAME, PASSWORD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["password_reset_required"], true);
    let bearer = body["bearer_token"].as_str().unwrap().to_string();

    // the restricted session cannot touch anything else
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/v1/access-keys")
                .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // but it can change the password
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/v1/identities/{}", user.id))
                .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "password": "brand-new-password" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // a fresh login with the new password is unrestricted
    let response = app
        .oneshot(login_request(USERNAME, "brand-new-password"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["password_reset_required"], false);
}

#[tokio::test]
async fn identity_token_is_verifiable_against_jwks_key() {
    let env = common::setup().await;
    let user = common::create_user(&env, USERNAME, PASSWORD, false).await;
    let state = common::create_test_state(&env).await;
    let jwt = state.jwt.clone();
    let app = build_router(state).await.unwrap();

    let response = app
        .clone()
        .oneshot(login_request(USERNAME, PASSWORD))
        .await
        .unwrap();
    let body = body_json(response).await;
    let bearer = body["bearer_token"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/token")
                .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let token = body["token"].as_str().unwrap();
    let claims = jwt.validate_identity_token(token).unwrap();
    assert_eq!(claims.sub, user.id.to_string());
    assert_eq!(claims.name, USERNAME);
}

#[tokio::test]
async fn requests_without_credentials_are_rejected() {
    let env = common::setup().await;
    let state = common::create_test_state(&env).await;
    let app = build_router(state).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/v1/access-keys")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
