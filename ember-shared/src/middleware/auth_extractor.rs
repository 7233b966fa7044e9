use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::errors::{AppError, ErrorCode};
use crate::types::auth::{AuthUser, Claims};

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let claims = validate_jwt(&token, &jwt_secret())?;

        if claims.is_expired() {
            return Err(AppError::new(ErrorCode::TokenExpired, "token has expired"));
        }

        Ok(AuthUser::from(claims))
    }
}

/// Secret used to verify access tokens, `JWT_SECRET` or the development default.
pub fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string())
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::new(ErrorCode::Unauthorized, "invalid authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AppError::new(ErrorCode::Unauthorized, "authorization header must use Bearer scheme"))
}

/// Verify an HS256 token and return its claims.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::new(ErrorCode::TokenExpired, "token has expired")
        }
        _ => AppError::new(ErrorCode::TokenInvalid, format!("invalid token: {e}")),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    fn claims(user_id: Uuid, ttl_secs: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims { sub: user_id, iat: now, exp: now + ttl_secs }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn valid_token_roundtrips() {
        let user_id = Uuid::now_v7();
        let token = sign(&claims(user_id, 3600), "secret-a");
        let claims = validate_jwt(&token, "secret-a").unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(!claims.is_expired());
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = sign(&claims(Uuid::now_v7(), 3600), "secret-a");
        let err = validate_jwt(&token, "secret-b").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::TokenInvalid));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let token = sign(&claims(Uuid::now_v7(), -3600), "secret-a");
        let err = validate_jwt(&token, "secret-a").unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::TokenExpired));
    }

    #[test]
    fn extra_provider_claims_are_ignored() {
        let now = Utc::now().timestamp();
        let token = encode(
            &Header::default(),
            &serde_json::json!({ "sub": Uuid::nil(), "iat": now, "exp": now + 60, "role": "user", "jti": Uuid::nil() }),
            &EncodingKey::from_secret(b"secret-a"),
        )
        .unwrap();
        assert_eq!(validate_jwt(&token, "secret-a").unwrap().sub, Uuid::nil());
    }

    #[test]
    fn bearer_prefix_required() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Token abc".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("Authorization", "Bearer abc".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc");
    }

    #[tokio::test]
    async fn extractor_accepts_bearer_token() {
        let user_id = Uuid::now_v7();
        let token = sign(&claims(user_id, 3600), &jwt_secret());
        let (mut parts, _) = Request::builder()
            .uri("/")
            .header("Authorization", format!("Bearer {token}"))
            .body(())
            .unwrap()
            .into_parts();

        let user = AuthUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.id, user_id);
    }

    #[tokio::test]
    async fn extractor_rejects_missing_header() {
        let (mut parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
        let err = AuthUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Unauthorized));
    }
}
