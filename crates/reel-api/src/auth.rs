use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use reel_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::{AppState, AuthConfig};
use crate::users::profile_from_row;

pub const MIN_PASSWORD_LEN: usize = 6;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req.name.trim().to_string();
    let email = normalize_email(&req.email);
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("name, email and password are required"));
    }
    if !looks_like_email(&email) {
        return Err(ApiError::bad_request("invalid email address"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    let (id, user_name, user_email, genres) = (user_id.to_string(), name.clone(), email.clone(), req.favorite_genres);
    let row = state
        .db(move |db| {
            db.create_user(&id, &user_name, &user_email, &password_hash, &genres)?;
            db.get_user_by_id(&id)
        })
        .await?
        .ok_or_else(|| ApiError::internal("user vanished after insert"))?;

    let token = create_token(&state.auth, user_id, &name)?;
    info!("User {} registered", user_id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            token,
            user: profile_from_row(row)?,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("email and password are required"));
    }

    let email = normalize_email(&req.email);
    let user = state
        .db(move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password)? {
        return Err(ApiError::InvalidCredentials);
    }

    let user = profile_from_row(user)?;
    let token = create_token(&state.auth, user.id, &user.name)?;

    Ok(Json(LoginResponse { token, user }))
}

/// Hash a password with Argon2id and a fresh random salt.
pub(crate) fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(ApiError::internal)
}

pub(crate) fn verify_password(password: &str, stored_hash: &str) -> ApiResult<bool> {
    let parsed_hash = PasswordHash::new(stored_hash).map_err(ApiError::internal)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn create_token(auth: &AuthConfig, user_id: Uuid, name: &str) -> ApiResult<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp: (chrono::Utc::now() + auth.token_ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(ApiError::internal)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn token_carries_user() {
        let auth = AuthConfig {
            jwt_secret: "test-secret".into(),
            token_ttl: chrono::Duration::hours(1),
        };
        let user_id = Uuid::new_v4();
        let token = create_token(&auth, user_id, "Ana").unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, user_id);
        assert_eq!(data.claims.name, "Ana");
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("ana@example.com"));
        assert!(!looks_like_email("ana@example"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ana example@x.com"));
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
