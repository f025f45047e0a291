//! HTTP surface: auth, profile, party and catalog routes plus the realtime
//! gateway upgrade.

pub mod auth;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod middleware;
pub mod movies;
pub mod parties;
pub mod state;
pub mod users;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};

pub use error::{ApiError, ApiResult};
pub use state::{AppState, AppStateInner, AuthConfig};

/// Every route of the service. Cross-cutting layers (CORS, tracing) are
/// added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/movies/popular", get(movies::popular))
        .route("/movies/trending", get(movies::trending))
        .route("/movies/now-playing", get(movies::now_playing))
        .route("/movies/top-rated", get(movies::top_rated))
        .route("/movies/search", get(movies::search))
        .route("/movies/genre/{genre}", get(movies::by_genre))
        .route("/movies/{movie_id}/details", get(movies::details))
        .route("/gateway", get(gateway::ws_upgrade))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/parties", get(parties::list_parties).post(parties::create_party))
        .route("/parties/code/{short_code}", get(parties::get_party_by_code))
        .route("/parties/code/{short_code}/join", post(parties::join_party))
        .route("/parties/{party_id}", get(parties::get_party))
        .route("/parties/{party_id}/leave", post(parties::leave_party))
        .route("/parties/{party_id}/movies", post(parties::add_movie))
        .route("/parties/{party_id}/movies/{movie_id}/like", post(parties::toggle_like))
        .route("/parties/{party_id}/movies/{movie_id}/match", get(parties::match_status))
        .route("/movies/suggestions/party/{party_id}", get(parties::suggestions))
        .route("/users/me", get(users::me).patch(users::update_me))
        .route("/users/me/password", put(users::change_password))
        .route("/users/me/genres", put(users::update_genres))
        .route(
            "/users/me/favorite-movies",
            get(users::favorite_movies).post(users::add_favorite_movie),
        )
        .route("/users/me/favorite-movies/{movie_id}", delete(users::remove_favorite_movie))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
