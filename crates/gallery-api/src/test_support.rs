use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use gallery_db::Database;
use gallery_db::models::{MediaRow, NewMedia};
use gallery_spotify::SpotifyConfig;

use crate::{AppState, AppStateInner, router};

pub(crate) const BOUNDARY: &str = "gallery-test-boundary";

pub(crate) fn test_state() -> AppState {
    let db = Arc::new(Database::open_in_memory().unwrap());
    AppStateInner::new(db, "test-secret".into(), SpotifyConfig::default())
}

pub(crate) fn test_app() -> (Router, AppState) {
    let state = test_state();
    (router(state.clone()), state)
}

pub(crate) async fn send_raw(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

pub(crate) async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = send_raw(app, req).await;
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

pub(crate) fn empty(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub(crate) fn json_req(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// One multipart part: (field name, optional (filename, content type), data).
pub(crate) type Part<'a> = (&'a str, Option<(&'a str, &'a str)>, &'a str);

pub(crate) fn multipart_req(
    method: &str,
    uri: &str,
    token: Option<&str>,
    parts: &[Part<'_>],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file {
            Some((filename, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(data.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Register a user through the API and return its token and id.
pub(crate) async fn register(app: &Router, email: &str) -> (String, Uuid) {
    let (status, body) = send(
        app,
        json_req(
            "POST",
            "/api/auth/register",
            None,
            json!({ "email": email, "password": "correct horse", "firstName": "Test" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    let token = body["token"].as_str().unwrap().to_string();
    let id = body["user"]["id"].as_str().unwrap().parse().unwrap();
    (token, id)
}

pub(crate) fn seed_media(state: &AppState, filename: &str) -> MediaRow {
    state
        .db
        .insert_media(&NewMedia {
            filename: filename.into(),
            url: "data:image/png;base64,iVBORw0KGgo=".into(),
            media_type: "image".into(),
            user_id: None,
        })
        .unwrap()
}
