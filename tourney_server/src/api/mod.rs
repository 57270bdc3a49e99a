//! HTTP/WebSocket API for the tournament server.
//!
//! # Modules
//!
//! - [`tournaments`]: registry, pairing, standings and prizes
//! - [`matches`]: match lifecycle, score submission and match chat
//! - [`disputes`]: dispute filing, admin review and dispute threads
//! - [`profiles`]: player profiles
//! - [`direct_messages`]: private player-to-player messages
//! - [`websocket`]: realtime change feed and presence
//! - [`middleware`]: bearer-token [`Caller`](middleware::Caller) extractor
//!
//! Read-only tournament routes are public. Everything else needs
//! `Authorization: Bearer <jwt>`; the WebSocket takes the token as a query
//! parameter instead.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tourney::{CompetitionConfig, EventHub};
//! use tourney::auth::TokenVerifier;
//! use tourney::db::MemoryRepository;
//! use tourney_server::api::{AppState, create_router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(
//!     Arc::new(MemoryRepository::new()),
//!     EventHub::default(),
//!     TokenVerifier::new("a-secret-of-at-least-thirty-two-bytes", None),
//!     CompetitionConfig::default(),
//! );
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, create_router(state)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. Put the server behind a proxy that
//! restricts origins in production.

pub mod direct_messages;
pub mod disputes;
pub mod errors;
pub mod matches;
pub mod middleware;
pub mod profiles;
pub mod rate_limiter;
pub mod request_id;
pub mod tournaments;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post, put},
};
use serde_json::json;
use std::sync::Arc;
use tourney::{
    CompetitionConfig, EventHub,
    auth::TokenVerifier,
    db::Repository,
    direct_message::DirectMessageManager,
    dispute::DisputeManager,
    matches::MatchManager,
    profile::ProfileManager,
    tournament::TournamentManager,
};
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloned per request; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub tournaments: Arc<TournamentManager>,
    pub matches: Arc<MatchManager>,
    pub disputes: Arc<DisputeManager>,
    pub direct_messages: Arc<DirectMessageManager>,
    pub profiles: Arc<ProfileManager>,
    pub events: EventHub,
    pub verifier: Arc<TokenVerifier>,
    pub repo: Arc<dyn Repository>,
}

impl AppState {
    /// Wire every manager to one repository and one event hub
    pub fn new(
        repo: Arc<dyn Repository>,
        events: EventHub,
        verifier: TokenVerifier,
        competition: CompetitionConfig,
    ) -> Self {
        Self {
            tournaments: Arc::new(TournamentManager::new(
                repo.clone(),
                events.clone(),
                competition,
            )),
            matches: Arc::new(MatchManager::new(repo.clone(), events.clone(), competition)),
            disputes: Arc::new(DisputeManager::new(repo.clone(), events.clone())),
            direct_messages: Arc::new(DirectMessageManager::new(repo.clone(), events.clone())),
            profiles: Arc::new(ProfileManager::new(repo.clone())),
            events,
            verifier: Arc::new(verifier),
            repo,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET  /health
/// GET  /ws?token=<jwt>&topic=<topic>[&key=<uuid>]
///
/// GET  /api/v1/tournaments[?status=]
/// POST /api/v1/tournaments
/// GET  /api/v1/tournaments/{id}
/// GET  /api/v1/tournaments/{id}/participants
/// GET  /api/v1/tournaments/{id}/standings
/// GET  /api/v1/tournaments/{id}/matches
/// POST /api/v1/tournaments/{id}/join
/// POST /api/v1/tournaments/{id}/withdraw
/// POST /api/v1/tournaments/{id}/rounds
/// POST /api/v1/tournaments/{id}/complete
/// GET  /api/v1/tournaments/{id}/prize-tiers
/// PUT  /api/v1/tournaments/{id}/prize-tiers
/// POST /api/v1/tournaments/{id}/distribute
/// GET  /api/v1/tournaments/{id}/payouts
///
/// POST  /api/v1/profiles
/// PATCH /api/v1/profiles/me
/// GET   /api/v1/profiles/{id}
/// PUT   /api/v1/profiles/{id}/skill-rating
///
/// GET  /api/v1/matches/{id}
/// POST /api/v1/matches/{id}/start
/// POST /api/v1/matches/{id}/score
/// POST /api/v1/matches/{id}/cancel
/// GET  /api/v1/matches/{id}/chat
/// POST /api/v1/matches/{id}/chat
/// POST /api/v1/matches/{id}/disputes
///
/// GET  /api/v1/disputes[?status=&match_id=]
/// GET  /api/v1/disputes/{id}
/// POST /api/v1/disputes/{id}/review
/// POST /api/v1/disputes/{id}/resolve
/// GET  /api/v1/disputes/{id}/messages
/// POST /api/v1/disputes/{id}/messages
///
/// POST /api/v1/direct-messages
/// GET  /api/v1/direct-messages/{player_id}
/// POST /api/v1/direct-messages/{player_id}/read
///
/// GET  /api/v1/presence
/// ```
pub fn create_router(state: AppState) -> Router {
    let root_routes = Router::new()
        .route("/health", get(health_check))
        // WebSocket handles its own auth via query parameter
        .route("/ws", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router() -> Router<AppState> {
    let tournament_routes = Router::new()
        .route(
            "/tournaments",
            get(tournaments::list_tournaments).post(tournaments::create_tournament),
        )
        .route("/tournaments/{id}", get(tournaments::get_tournament))
        .route(
            "/tournaments/{id}/participants",
            get(tournaments::list_participants),
        )
        .route("/tournaments/{id}/standings", get(tournaments::standings))
        .route("/tournaments/{id}/matches", get(tournaments::list_matches))
        .route("/tournaments/{id}/join", post(tournaments::join))
        .route("/tournaments/{id}/withdraw", post(tournaments::withdraw))
        .route("/tournaments/{id}/rounds", post(tournaments::generate_round))
        .route("/tournaments/{id}/complete", post(tournaments::complete))
        .route(
            "/tournaments/{id}/prize-tiers",
            get(tournaments::prize_tiers).put(tournaments::set_prize_tiers),
        )
        .route(
            "/tournaments/{id}/distribute",
            post(tournaments::distribute_prizes),
        )
        .route("/tournaments/{id}/payouts", get(tournaments::payouts));

    let profile_routes = Router::new()
        .route("/profiles", post(profiles::register))
        .route("/profiles/me", patch(profiles::update_me))
        .route("/profiles/{id}", get(profiles::get_profile))
        .route(
            "/profiles/{id}/skill-rating",
            put(profiles::set_skill_rating),
        );

    let match_routes = Router::new()
        .route("/matches/{id}", get(matches::get_match))
        .route("/matches/{id}/start", post(matches::start))
        .route("/matches/{id}/score", post(matches::submit_score))
        .route("/matches/{id}/cancel", post(matches::cancel))
        .route(
            "/matches/{id}/chat",
            get(matches::list_messages).post(matches::post_message),
        )
        .route("/matches/{id}/disputes", post(disputes::raise));

    let dispute_routes = Router::new()
        .route("/disputes", get(disputes::list))
        .route("/disputes/{id}", get(disputes::get_dispute))
        .route("/disputes/{id}/review", post(disputes::review))
        .route("/disputes/{id}/resolve", post(disputes::resolve))
        .route(
            "/disputes/{id}/messages",
            get(disputes::list_messages).post(disputes::post_message),
        );

    let direct_message_routes = Router::new()
        .route("/direct-messages", post(direct_messages::send))
        .route("/direct-messages/{id}", get(direct_messages::conversation))
        .route("/direct-messages/{id}/read", post(direct_messages::mark_read));

    Router::new()
        .merge(tournament_routes)
        .merge(profile_routes)
        .merge(match_routes)
        .merge(dispute_routes)
        .merge(direct_message_routes)
        .route("/presence", get(websocket::presence))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store answers, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","database":true,"subscribers":3,"timestamp":"2026-10-19T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match state.repo.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            false
        }
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "subscribers": state.events.subscriber_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
