use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;

use crate::models::{
    auth::Claims,
    user::{LoginResponse, User, UserRole},
};

pub struct AuthService;

impl AuthService {
    /// Check credentials and issue an access token.
    pub async fn login(
        pool: &PgPool,
        email: &str,
        password: &str,
        jwt_secret: &str,
        access_ttl: u64,
    ) -> anyhow::Result<LoginResponse> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, role, code, created_at, updated_at
             FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email.trim())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Invalid credentials"))?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| anyhow::anyhow!("Invalid credentials"))?;
        if !valid {
            anyhow::bail!("Invalid credentials");
        }

        let access_token = Self::generate_access_token(&user, jwt_secret, access_ttl)?;
        Ok(LoginResponse {
            access_token,
            user: user.into(),
        })
    }

    pub fn generate_access_token(
        user: &User,
        secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<String> {
        let role: UserRole = user.role.parse()?;
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id.to_string(),
            role,
            code: user.code.clone(),
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_access_token;
    use uuid::Uuid;

    fn user(role: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ops@example.com".into(),
            password_hash: String::new(),
            role: role.into(),
            code: "C042".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let u = user("admin");
        let token = AuthService::generate_access_token(&u, "secret", 60).unwrap();
        let decoded = decode_access_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, u.id);
        assert_eq!(decoded.role, UserRole::Admin);
        assert_eq!(decoded.code, "C042");
    }

    #[test]
    fn test_token_wrong_secret() {
        let token = AuthService::generate_access_token(&user("user"), "secret", 60).unwrap();
        assert!(decode_access_token(&token, "other").is_err());
    }

    #[test]
    fn test_unknown_role_cannot_get_token() {
        assert!(AuthService::generate_access_token(&user("root"), "secret", 60).is_err());
    }
}
