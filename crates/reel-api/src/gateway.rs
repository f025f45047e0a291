use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::Deserialize;

use reel_gateway::connection;

use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::middleware::verify_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    /// Browsers cannot set headers on a WebSocket handshake, so the token
    /// may come in the query string instead.
    pub token: Option<String>,
}

/// Authenticate, then hand the socket to the room event loop.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GatewayQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let token = match (&bearer, &query.token) {
        (Some(TypedHeader(Authorization(bearer))), _) => bearer.token(),
        (None, Some(token)) => token.as_str(),
        (None, None) => return Err(ApiError::Unauthorized),
    };
    let claims = verify_token(&state.auth.jwt_secret, token)?;

    let dispatcher = state.dispatcher.clone();
    Ok(ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, dispatcher, claims.sub, claims.name)
    }))
}
