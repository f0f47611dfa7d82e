use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::get_config;
use crate::dto::auth_dto::{LoginPayload, RegisterPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::user::User;

#[derive(Clone)]
pub struct UserService {
    pool: SqlitePool,
}

impl UserService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, payload: RegisterPayload) -> Result<User> {
        let taken = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE username = ? OR email = ?",
        )
        .bind(&payload.username)
        .bind(&payload.email)
        .fetch_one(&self.pool)
        .await?;
        if taken > 0 {
            return Err(Error::BadRequest(
                "Username or email is already taken".to_string(),
            ));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(payload.password.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?
            .to_string();

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: payload.username,
            email: payload.email,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn login(&self, payload: LoginPayload) -> Result<(User, String)> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(&payload.username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Unauthorized("Invalid username or password".to_string()))?;

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| Error::Internal(format!("Stored password hash is invalid: {}", e)))?;
        if Argon2::default()
            .verify_password(payload.password.as_bytes(), &parsed)
            .is_err()
        {
            return Err(Error::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        }

        let token = issue_token(user.id)?;
        Ok((user, token))
    }

    pub async fn get_by_id(&self, user_id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }
}

pub fn issue_token(user_id: Uuid) -> Result<String> {
    let config = get_config();
    let exp = (Utc::now() + Duration::hours(config.token_ttl_hours)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
}
