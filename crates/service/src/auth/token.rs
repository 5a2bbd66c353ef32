//! HS256 bearer tokens carrying the caller's user, tenant and role.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use models::user::UserRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::AuthUser;
use super::errors::AuthError;
use crate::actor::Actor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub uid: String,
    pub tid: String,
    pub role: UserRole,
    pub exp: usize,
}

impl Claims {
    pub fn to_actor(&self) -> Result<Actor, AuthError> {
        let user_id = Uuid::parse_str(&self.uid).map_err(|e| AuthError::TokenError(e.to_string()))?;
        let tenant_id = Uuid::parse_str(&self.tid).map_err(|e| AuthError::TokenError(e.to_string()))?;
        Ok(Actor::new(user_id, tenant_id, self.role))
    }
}

pub fn issue_token(secret: &str, user: &AuthUser, ttl_hours: i64) -> Result<String, AuthError> {
    let exp = (chrono::Utc::now() + chrono::Duration::hours(ttl_hours)).timestamp() as usize;
    let claims = Claims {
        sub: user.email.clone(),
        uid: user.id.to_string(),
        tid: user.tenant_id.to_string(),
        role: user.role,
        exp,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::TokenError(e.to_string()))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AuthError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> AuthUser {
        AuthUser { id: Uuid::new_v4(), tenant_id: Uuid::new_v4(), email: "dev@example.com".into(), name: "Dev".into(), role }
    }

    #[test]
    fn issued_token_decodes_to_same_actor() {
        let u = user(UserRole::Developer);
        let token = issue_token("a-very-long-test-secret", &u, 1).unwrap();
        let actor = decode_token("a-very-long-test-secret", &token).unwrap().to_actor().unwrap();
        assert_eq!(actor, Actor::new(u.id, u.tenant_id, UserRole::Developer));
    }

    #[test]
    fn wrong_secret_or_expired_token_is_rejected() {
        let u = user(UserRole::Client);
        let token = issue_token("a-very-long-test-secret", &u, 1).unwrap();
        assert!(matches!(decode_token("another-secret-value", &token), Err(AuthError::Unauthorized)));
        let expired = issue_token("a-very-long-test-secret", &u, -2).unwrap();
        assert!(matches!(decode_token("a-very-long-test-secret", &expired), Err(AuthError::Unauthorized)));
    }
}
