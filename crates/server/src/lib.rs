use allianceforge_engine::messages::user_message;
use allianceforge_engine::{
    characters, characters_by_gender, classify_window, Character, ChatLogEntry, ChatRouter, Clock,
    Engine, PlayerProfile, Portrait, ProfileError, ProfileStore, ReplyBackend,
    SessionGenderOverride, SystemClock,
};
use allianceforge_protocol::{
    defaults, ChatRequest, ChatResponse, ChatStatus, EquipInput, Gender, ProfileInput,
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

pub mod config;
pub mod error;

pub use config::ServerConfig;
pub use error::ApiError;

pub const MESSAGE_REQUIRED: &str = "Message is required and must be a non-empty string";
pub const PROFILE_FIELDS_REQUIRED: &str = "name and avatarUrl are required strings";
pub const PIECE_REQUIRED: &str = "piece is required and must be a non-empty string";

pub const DEFAULT_LOG_LIMIT: usize = 50;
pub const MAX_LOG_LIMIT: usize = 500;

pub struct AppState {
    pub engine: Engine,
    pub router: ChatRouter,
    pub clock: Arc<dyn Clock>,
    pub allowed_origins: Vec<String>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        let backend = match config.reply_backend.build() {
            Some(b) => {
                tracing::info!(model = b.model(), "reply backend configured");
                Some(Arc::new(b) as Arc<dyn ReplyBackend>)
            }
            None => {
                tracing::info!("no reply backend configured, using offline replies");
                None
            }
        };
        let mut router = ChatRouter::new(backend).with_hours(config.business_hours);
        if let Some(seed) = config.rng_seed {
            router = router.with_seed(seed);
        }
        Self {
            engine: Engine::new(config.db_path.clone()),
            router,
            clock: Arc::new(SystemClock),
            allowed_origins: config.allowed_origins.clone(),
        }
    }
}

type SharedState = State<Arc<AppState>>;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_for(&state.allowed_origins);
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", get(chat_status).post(submit_chat))
        .route("/api/chat/log", get(chat_log))
        .route("/api/characters", get(list_characters))
        .route("/api/profile", get(get_profile).put(put_profile))
        .route("/api/profile/equipment", post(equip_piece))
        .route("/api/profile/equipment/{piece}", delete(unequip_piece))
        .route("/api/portrait", get(portrait))
        .with_state(Arc::new(state))
        // Chat status depends on the wall clock; never let a proxy cache it.
        .layer(SetResponseHeaderLayer::if_not_present(
            axum::http::header::CACHE_CONTROL,
            axum::http::HeaderValue::from_static("no-store"),
        ))
        .layer(cors)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    #[serde(default)]
    timezone: Option<String>,
}

fn timezone_or_default(tz: Option<&str>) -> &str {
    tz.map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(defaults::TIMEZONE)
}

async fn chat_status(State(state): SharedState, Query(q): Query<StatusQuery>) -> Json<ChatStatus> {
    let timezone = timezone_or_default(q.timezone.as_deref());
    Json(state.router.status(state.clock.as_ref(), timezone))
}

async fn submit_chat(
    State(state): SharedState,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let input = json_body(payload, MESSAGE_REQUIRED)?;
    let message = input
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::Validation(MESSAGE_REQUIRED.to_string()))?;
    let timezone = timezone_or_default(input.timezone.as_deref());
    let display_name = input
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(defaults::DISPLAY_NAME);

    let window = classify_window(state.clock.now(), timezone, state.router.hours());
    let response = state
        .router
        .route_message(message, window.is_business_window)
        .await;

    let user = user_message(display_name, message);
    state
        .engine
        .record_exchange(&user, &response, timezone, window.is_business_window)?;

    tracing::info!(
        timezone = %window.resolved_timezone,
        local_hour = window.local_hour,
        business_window = window.is_business_window,
        "chat message routed"
    );

    Ok(Json(ChatResponse {
        success: true,
        response,
        is_business_window: window.is_business_window,
    }))
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    #[serde(default)]
    limit: Option<usize>,
}

/// Transcript page plus the store revision, so a client can tell whether
/// anything changed since its last poll.
#[derive(Debug, Serialize)]
struct ChatLogPage {
    rev: i64,
    entries: Vec<ChatLogEntry>,
}

async fn chat_log(
    State(state): SharedState,
    Query(q): Query<LogQuery>,
) -> Result<Json<ChatLogPage>, ApiError> {
    let limit = q.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
    let entries = state.engine.list_chat_log(limit)?;
    let rev = state.engine.get_rev()?;
    Ok(Json(ChatLogPage { rev, entries }))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>, message: &str) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|e| {
        tracing::debug!(error = %e, "rejected request body");
        ApiError::Validation(message.to_string())
    })
}

fn parse_gender(raw: Option<&str>, field: &str) -> Result<Option<Gender>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Gender::parse(s)
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("{field} must be \"male\" or \"female\""))),
    }
}

#[derive(Debug, Deserialize)]
struct CharacterQuery {
    #[serde(default)]
    gender: Option<String>,
}

async fn list_characters(
    Query(q): Query<CharacterQuery>,
) -> Result<Json<Vec<Character>>, ApiError> {
    let list = match parse_gender(q.gender.as_deref(), "gender")? {
        Some(g) => characters_by_gender(g).copied().collect(),
        None => characters().to_vec(),
    };
    Ok(Json(list))
}

fn load_profile(state: &AppState) -> Result<PlayerProfile, ApiError> {
    state
        .engine
        .read()?
        .ok_or_else(|| ApiError::NotFound(ProfileError::NotRegistered.to_string()))
}

async fn get_profile(State(state): SharedState) -> Result<Json<PlayerProfile>, ApiError> {
    load_profile(&state).map(Json)
}

/// Registers a commander, or edits the existing one. Either way the avatar
/// decides the stored gender.
async fn put_profile(
    State(state): SharedState,
    payload: Result<Json<ProfileInput>, JsonRejection>,
) -> Result<Json<PlayerProfile>, ApiError> {
    let input = json_body(payload, PROFILE_FIELDS_REQUIRED)?;
    let profile = match state.engine.read()? {
        Some(mut existing) => {
            existing
                .edit(&input.name, &input.avatar_url)
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            existing
        }
        None => PlayerProfile::register(&input.name, &input.avatar_url)
            .map_err(|e| ApiError::Validation(e.to_string()))?,
    };
    state.engine.write(&profile)?;
    tracing::info!(gender = profile.commander_gender().as_str(), "profile saved");
    Ok(Json(profile))
}

async fn equip_piece(
    State(state): SharedState,
    payload: Result<Json<EquipInput>, JsonRejection>,
) -> Result<Json<PlayerProfile>, ApiError> {
    let input = json_body(payload, PIECE_REQUIRED)?;
    let piece = input.piece.trim();
    if piece.is_empty() {
        return Err(ApiError::Validation(PIECE_REQUIRED.to_string()));
    }
    let mut profile = load_profile(&state)?;
    if profile.equip(piece) {
        state.engine.write(&profile)?;
    }
    Ok(Json(profile))
}

async fn unequip_piece(
    State(state): SharedState,
    Path(piece): Path<String>,
) -> Result<Json<PlayerProfile>, ApiError> {
    let mut profile = load_profile(&state)?;
    if profile.unequip(&piece) {
        state.engine.write(&profile)?;
    }
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortraitQuery {
    #[serde(default)]
    session_gender: Option<String>,
}

/// The session override arrives per request and is never written back.
async fn portrait(
    State(state): SharedState,
    Query(q): Query<PortraitQuery>,
) -> Result<Json<Portrait>, ApiError> {
    let profile = load_profile(&state)?;
    let session = SessionGenderOverride::from(parse_gender(
        q.session_gender.as_deref(),
        "sessionGender",
    )?);
    Ok(Json(profile.portrait(&session)))
}

pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    let state = AppState::from_config(&config);
    serve_listener(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown requested");
    })
    .await?;
    Ok(())
}

pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<SocketAddr> {
    // Fail fast if the database cannot be opened or migrated.
    state.engine.open()?;
    let app = build_router(state);
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "allianceforge server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(addr)
}

fn cors_for(origins: &[String]) -> CorsLayer {
    use axum::http::header;
    use axum::http::HeaderValue;
    use axum::http::Method;

    let allowed: Vec<String> = origins.to_vec();
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _req| is_allowed_origin(origin, &allowed),
        ))
}

fn is_allowed_origin(origin: &axum::http::HeaderValue, allowed: &[String]) -> bool {
    let Ok(s) = origin.to_str() else {
        return false;
    };
    allowed
        .iter()
        .any(|a| a.trim_end_matches('/').eq_ignore_ascii_case(s))
}
