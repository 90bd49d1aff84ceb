use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::info;
use uuid::Uuid;

use gallery_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use gallery_types::models::User;

use crate::error::{ApiError, JsonBody};
use crate::{AppState, blocking, convert};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_NAME_LEN: usize = 64;
const TOKEN_TTL_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let first_name = clean_name(req.first_name)?;
    let last_name = clean_name(req.last_name)?;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();
    let row = blocking(&state, move |db| {
        let created = db.create_user(
            &user_id.to_string(),
            &email,
            &password_hash,
            first_name.as_deref(),
            last_name.as_deref(),
        )?;
        if !created {
            return Ok(None);
        }
        db.get_user_by_id(&user_id.to_string())
    })
    .await?
    .ok_or_else(|| ApiError::Conflict("Email already registered".into()))?;

    let user = convert::user(row);
    let token = create_token(&state.jwt_secret, user.id, &user.email)?;
    info!("Registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    let row = blocking(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&row.password)
        .map_err(|e| anyhow::anyhow!("stored password hash is invalid: {}", e))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user = convert::user(row);
    let token = create_token(&state.jwt_secret, user.id, &user.email)?;

    Ok(Json(AuthResponse { user, token }))
}

/// The account behind the bearer token.
pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, ApiError> {
    let id = claims.sub.to_string();
    let row = blocking(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(convert::user(row)))
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ApiError::bad_request("A valid email is required")),
    }
}

pub(crate) fn clean_name(raw: Option<String>) -> Result<Option<String>, ApiError> {
    let Some(name) = raw.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Names must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(Some(name))
}
