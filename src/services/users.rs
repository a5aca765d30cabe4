use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::{CreateUserRequest, UpdateUserRequest, User, UserRole};

const USER_COLUMNS: &str = "id, email, password_hash, role, code, created_at, updated_at";
const BCRYPT_COST: u32 = 12;

fn validate_email(email: &str) -> anyhow::Result<()> {
    let email = email.trim();
    anyhow::ensure!(
        email.len() >= 3 && email.contains('@') && !email.starts_with('@') && !email.ends_with('@'),
        "Invalid email: {email}"
    );
    Ok(())
}

fn validate_password(password: &str) -> anyhow::Result<()> {
    anyhow::ensure!(password.len() >= 8, "Password must be at least 8 characters");
    Ok(())
}

fn validate_code(code: &str) -> anyhow::Result<()> {
    anyhow::ensure!(!code.trim().is_empty(), "code is required");
    Ok(())
}

pub struct UserService;

impl UserService {
    pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY role, email"
        ))
        .fetch_all(pool)
        .await?;
        Ok(users)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn create(pool: &PgPool, req: &CreateUserRequest) -> anyhow::Result<User> {
        validate_email(&req.email)?;
        validate_password(&req.password)?;
        validate_code(&req.code)?;

        let password_hash = bcrypt::hash(&req.password, BCRYPT_COST)?;
        let role = req.role.unwrap_or(UserRole::User);

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, role, code)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(req.email.trim())
        .bind(&password_hash)
        .bind(role.to_string())
        .bind(req.code.trim())
        .fetch_one(pool)
        .await?;

        tracing::info!("User {} created ({})", user.email, user.role);
        Ok(user)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateUserRequest,
    ) -> anyhow::Result<Option<User>> {
        if let Some(email) = &req.email {
            validate_email(email)?;
        }
        if let Some(code) = &req.code {
            validate_code(code)?;
        }
        let password_hash = match &req.password {
            Some(password) => {
                validate_password(password)?;
                Some(bcrypt::hash(password, BCRYPT_COST)?)
            }
            None => None,
        };

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET email         = COALESCE($2, email),
                 password_hash = COALESCE($3, password_hash),
                 role          = COALESCE($4, role),
                 code          = COALESCE($5, code),
                 updated_at    = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(req.email.as_deref().map(str::trim))
        .bind(password_hash)
        .bind(req.role.map(|r| r.to_string()))
        .bind(req.code.as_deref().map(str::trim))
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    /// Returns false when no such user exists.
    pub async fn delete(pool: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Create the configured administrator if the table has no admin yet.
    pub async fn ensure_bootstrap_admin(
        pool: &PgPool,
        email: &str,
        password: &str,
    ) -> anyhow::Result<()> {
        let admins: i64 =
            sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM users WHERE role = 'admin'")
                .fetch_one(pool)
                .await?;
        if admins > 0 {
            return Ok(());
        }

        let req = CreateUserRequest {
            email: email.to_string(),
            password: password.to_string(),
            role: Some(UserRole::Admin),
            code: "ADMIN".to_string(),
        };
        Self::create(pool, &req).await?;
        tracing::info!("Bootstrap administrator {email} created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ops@example.com").is_ok());
        assert!(validate_email("ops").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ops@").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_code() {
        assert!(validate_code("C001").is_ok());
        assert!(validate_code("   ").is_err());
    }
}
