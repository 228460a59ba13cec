// src/auth/jwt.rs
use crate::auth::Claims;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

const MAX_TOKEN_LENGTH: usize = 4096;
const MAX_SUBJECT_LENGTH: usize = 128;

/// Validate a bearer token issued by the identity provider.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    if token.is_empty() || token.len() > MAX_TOKEN_LENGTH {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.validate_nbf = false;

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?
        .claims;

    // The subject becomes a database key.
    if claims.sub.is_empty()
        || claims.sub.len() > MAX_SUBJECT_LENGTH
        || claims.sub.chars().any(|c| c.is_control() || c.is_whitespace())
    {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }

    Ok(claims)
}

#[cfg(test)]
pub fn generate_token(user_id: &str, secret: &str, ttl_secs: i64) -> String {
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: Some(format!("{}@example.com", user_id)),
        exp: (now + ttl_secs) as usize,
        iat: now as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
