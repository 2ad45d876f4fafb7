//! HTTP handlers for `/api/auth`.

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use nostrauth_proto::keys;
use nostrauth_proto::wire::{
    AvailabilityResponse, ChallengeResponse, CompleteRegistrationRequest, CreatedResponse,
    DisplayNameResponse, LoginRequest, PasswordLoginRequest, RegisterRequest, SessionResponse,
    ValueResponse,
};
use serde::Deserialize;

use crate::auth::{self, AuthOutcome};
use crate::error::ApiError;
use crate::state::{AuthenticatedSession, SharedState};
use crate::{profile, ratelimit, registration};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct PubKeyQuery {
    #[serde(rename = "pubKey", default)]
    pub pub_key: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameQuery {
    #[serde(default)]
    pub username: String,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn required<'a>(value: &'a str, name: &str) -> ApiResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{name} is required")));
    }
    Ok(value)
}

fn rate_limited(state: &SharedState, addr: SocketAddr) -> ApiResult<()> {
    if ratelimit::check_and_record(state, addr.ip()) {
        Ok(())
    } else {
        tracing::warn!(ip = %addr.ip(), "rate limit exceeded");
        Err(ApiError::RateLimited)
    }
}

fn session_response(session: &AuthenticatedSession) -> SessionResponse {
    SessionResponse {
        token: session.token.clone(),
        pub_key: session.public_key.clone(),
        user_name: session.username.clone(),
        method: session.method.as_str().to_string(),
        expires_at: session.expires_at_unix,
    }
}

fn verdict(outcome: AuthOutcome) -> ApiResult<Json<SessionResponse>> {
    match outcome {
        AuthOutcome::Verified(session) => Ok(Json(session_response(&session))),
        AuthOutcome::Rejected(reason) => Err(reason.into()),
    }
}

fn created(message: &str) -> (StatusCode, Json<CreatedResponse>) {
    (
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: message.to_string(),
        }),
    )
}

pub async fn health() -> impl IntoResponse {
    "OK"
}

/// GET /challenge?pubKey=
pub async fn challenge(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(q): Query<PubKeyQuery>,
) -> ApiResult<Json<ChallengeResponse>> {
    rate_limited(&state, addr)?;
    let challenge = auth::issue_challenge(&state, &q.pub_key)?;
    Ok(Json(ChallengeResponse {
        challenge: challenge.token,
        expires_at: challenge.expires_at_unix,
    }))
}

/// POST /loginuser
pub async fn login_user(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<SessionResponse>> {
    let req = body(payload)?;
    rate_limited(&state, addr)?;
    verdict(auth::login_with_signature(&state, &req).await?)
}

/// POST /login
pub async fn password_login(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<PasswordLoginRequest>, JsonRejection>,
) -> ApiResult<Json<SessionResponse>> {
    let req = body(payload)?;
    rate_limited(&state, addr)?;
    verdict(auth::login_with_password(&state, &req.username, &req.password).await?)
}

/// POST /registernewuser
///
/// Without a `pubKey` this falls back to registering by name.
pub async fn register_new_user(
    State(state): State<SharedState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = body(payload)?;
    match req.pub_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(pk) => {
            let username = req.user_name.as_deref();
            registration::register_by_key(&state, pk, &req.secret, username).await?;
        }
        None => {
            let username = req.user_name.as_deref().unwrap_or_default();
            let username = required(username, "pubKey or userName")?;
            registration::register_by_name(&state, username, &req.secret).await?;
        }
    }
    Ok(created("registered"))
}

/// POST /registerwithoutnostr
pub async fn register_without_nostr(
    State(state): State<SharedState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = body(payload)?;
    let username = required(req.user_name.as_deref().unwrap_or_default(), "userName")?;
    registration::register_by_name(&state, username, &req.secret).await?;
    Ok(created("registered"))
}

/// POST /completeRegistration
///
/// Requires a bearer session that owns the record being completed.
pub async fn complete_registration(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<CompleteRegistrationRequest>, JsonRejection>,
) -> ApiResult<Json<CreatedResponse>> {
    let token = bearer(&headers).ok_or(ApiError::Unauthorized)?;
    let session = state.session(token).ok_or(ApiError::Unauthorized)?;
    let req = body(payload)?;
    registration::complete_registration(
        &state,
        &session,
        &req.user_name,
        &req.secret,
        req.pub_key.as_deref(),
    )
    .await?;
    Ok(Json(CreatedResponse {
        message: "registration completed".into(),
    }))
}

/// GET /check-username?username=
pub async fn check_username(
    State(state): State<SharedState>,
    Query(q): Query<UsernameQuery>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let username = required(&q.username, "username")?;
    let available = registration::username_available(&state, username).await?;
    Ok(Json(AvailabilityResponse { available }))
}

/// GET /check-pubkey?pubKey=
pub async fn check_pubkey(
    State(state): State<SharedState>,
    Query(q): Query<PubKeyQuery>,
) -> ApiResult<Json<AvailabilityResponse>> {
    let pk = required(&q.pub_key, "pubKey")?;
    let available = registration::public_key_available(&state, pk).await?;
    Ok(Json(AvailabilityResponse { available }))
}

/// GET /get-pubkey?username=
pub async fn get_pubkey(
    State(state): State<SharedState>,
    Query(q): Query<UsernameQuery>,
) -> ApiResult<Json<ValueResponse>> {
    let username = required(&q.username, "username")?;
    match registration::key_for_username(&state, username).await? {
        Some(pk) => Ok(Json(ValueResponse { value: Some(pk) })),
        None => Err(ApiError::NotFound("no public key for username".into())),
    }
}

/// GET /get-username?pubKey=
pub async fn get_username(
    State(state): State<SharedState>,
    Query(q): Query<PubKeyQuery>,
) -> ApiResult<Json<ValueResponse>> {
    let pk = required(&q.pub_key, "pubKey")?;
    match registration::username_for_key(&state, pk).await? {
        Some(name) => Ok(Json(ValueResponse { value: Some(name) })),
        None => Err(ApiError::NotFound("no username for public key".into())),
    }
}

/// DELETE /deletepubkey/{pubKey}
pub async fn delete_pubkey(
    State(state): State<SharedState>,
    Path(pub_key): Path<String>,
) -> ApiResult<Json<CreatedResponse>> {
    registration::delete_by_key(&state, &pub_key).await?;
    Ok(Json(CreatedResponse {
        message: "deleted".into(),
    }))
}

/// GET /display-name?pubKey=
pub async fn display_name(
    State(state): State<SharedState>,
    Query(q): Query<PubKeyQuery>,
) -> ApiResult<Json<DisplayNameResponse>> {
    let pk = required(&q.pub_key, "pubKey")?;
    let pk = keys::normalize_public_key(pk)
        .map_err(|_| ApiError::BadRequest("invalid public key".into()))?;
    let config = &state.config;
    let display_name =
        profile::lookup_display_name(&config.profile_relay, &pk, config.profile_timeout).await;
    Ok(Json(DisplayNameResponse { display_name }))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// GET /me
pub async fn me(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<SessionResponse>> {
    let token = bearer(&headers).ok_or(ApiError::Unauthorized)?;
    let session = state.session(token).ok_or(ApiError::Unauthorized)?;
    Ok(Json(session_response(&session)))
}

/// POST /logout
pub async fn logout(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let token = bearer(&headers).ok_or(ApiError::Unauthorized)?;
    if state.close_session(token) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::Unauthorized)
    }
}
