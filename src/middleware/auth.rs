use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::auth::{Claims, Principal};
use crate::config;
use crate::error::ApiError;

/// JWT authentication middleware that validates tokens and injects the
/// resolved [`Principal`] as a request extension. Requests that cannot be
/// resolved are rejected here, before any handler runs.
pub async fn jwt_auth(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers).map_err(ApiError::unauthorized)?;
    let claims = validate_jwt(&token).map_err(ApiError::unauthorized)?;

    request.extensions_mut().insert(Principal::from(claims));

    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        Some(_) => Err("empty bearer token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

/// Validate a JWT and extract its claims
fn validate_jwt(token: &str) -> Result<Claims, String> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("invalid JWT token: {}", e))?;

    Ok(token_data.claims)
}
