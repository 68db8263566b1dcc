//! Bearer-token identities. Tokens are HS256 JWTs issued by the sign-in
//! provider; the `role` claim is the only source of admin rights.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

/// Signing material shared through `app_data`.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Mints a token valid for `ttl_secs`. Used by tooling and tests; the
    /// service itself only verifies.
    pub fn issue(&self, sub: &str, email: &str, role: Role, ttl_secs: i64) -> Result<String, AppError> {
        let claims = Claims {
            sub: sub.to_string(),
            email: email.to_lowercase(),
            role,
            exp: (Utc::now().timestamp() + ttl_secs).max(0) as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("rejected bearer token: {e}");
                AppError::Unauthorized
            })
    }
}

fn claims_from(req: &HttpRequest) -> Result<Claims, AppError> {
    let keys = req
        .app_data::<web::Data<JwtKeys>>()
        .ok_or_else(|| AppError::Internal("JwtKeys not configured".to_string()))?;
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;
    keys.verify(token.trim())
}

/// Any signed-in user.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(claims_from(req).map(|claims| Identity {
            user_id: claims.sub,
            email: claims.email.to_lowercase(),
            role: claims.role,
        }))
    }
}

/// A signed-in user holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub email: String,
}

impl FromRequest for AdminIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(claims_from(req).and_then(|claims| match claims.role {
            Role::Admin => Ok(AdminIdentity { email: claims.email }),
            Role::Customer => Err(AppError::Forbidden),
        }))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new(b"test-secret")
    }

    fn request_with(token: &str) -> HttpRequest {
        TestRequest::default()
            .app_data(web::Data::new(keys()))
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request()
    }

    #[actix_web::test]
    async fn customer_token_yields_identity() {
        let token = keys().issue("user-1", "Sam@Example.com", Role::Customer, 3600).unwrap();
        let identity = Identity::extract(&request_with(&token)).await.unwrap();
        assert_eq!(identity.email, "sam@example.com");
        assert!(!identity.is_admin());
    }

    #[actix_web::test]
    async fn customer_token_is_not_admin() {
        let token = keys().issue("user-1", "sam@example.com", Role::Customer, 3600).unwrap();
        let err = AdminIdentity::extract(&request_with(&token)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[actix_web::test]
    async fn admin_token_passes() {
        let token = keys().issue("admin-1", "ops@keycut.com.au", Role::Admin, 3600).unwrap();
        let admin = AdminIdentity::extract(&request_with(&token)).await.unwrap();
        assert_eq!(admin.email, "ops@keycut.com.au");
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        let req = TestRequest::default().app_data(web::Data::new(keys())).to_http_request();
        assert!(matches!(Identity::extract(&req).await.unwrap_err(), AppError::Unauthorized));
    }

    #[actix_web::test]
    async fn foreign_signature_is_unauthorized() {
        let token = JwtKeys::new(b"other").issue("u", "sam@example.com", Role::Admin, 3600).unwrap();
        assert!(matches!(
            AdminIdentity::extract(&request_with(&token)).await.unwrap_err(),
            AppError::Unauthorized
        ));
    }

    #[actix_web::test]
    async fn expired_token_is_unauthorized() {
        let token = keys().issue("u", "sam@example.com", Role::Customer, -3600).unwrap();
        assert!(matches!(Identity::extract(&request_with(&token)).await.unwrap_err(), AppError::Unauthorized));
    }
}
