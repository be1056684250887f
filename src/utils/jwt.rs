// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::AppError,
    models::actor::{Actor, Role},
};

/// JWT Claims structure.
///
/// The engine never authenticates; it consumes identities that the portal's
/// identity tier already issued. Tokens only need to verify here.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// User's role: 'student', 'instructor' or 'admin'.
    pub role: String,
    /// Display name, echoed on denial pages.
    pub name: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    /// Builds the request-scoped `Actor` the engine consumes. Fails when
    /// the token carries an id or role the engine does not recognize.
    pub fn into_actor(self) -> Result<Actor, AppError> {
        let id = self
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthenticationMissing("Invalid subject claim".to_string()))?;
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| AppError::AuthenticationMissing("Unknown role claim".to_string()))?;
        Ok(Actor {
            id,
            role,
            display_name: self.name,
        })
    }
}

/// Signs a new JWT for the user. Used by tests and operator tooling; the
/// production issuer lives in the identity collaborator.
pub fn sign_jwt(
    id: i64,
    name: &str,
    role: Role,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let claims = Claims {
        sub: id.to_string(),
        role: role.as_str().to_string(),
        name: name.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationMissing("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects the
/// resulting `Actor` into request extensions. A request with no usable
/// identity stops here with 401; no engine code runs.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return Err(AppError::AuthenticationMissing(
                "Missing bearer token".to_string(),
            ));
        }
    };

    let claims = verify_jwt(token, &config.jwt_secret)?;
    let actor = claims.into_actor()?;
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}
