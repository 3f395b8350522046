//! Token-based accounts: register, login, logout, and the bearer-token
//! extractor the gated handlers use.
//!
//! Roles (`educator` / `learner`) are a stored attribute on the user row
//! and are checked per handler, not encoded in the type system.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};
use axum::Json;
use thiserror::Error;
use uuid::Uuid;

use crate::db::Db;
use crate::models::{LoginReq, RegisterReq, SessionRes, User};
use crate::util::{e401, e403, e422, e500, ApiError};

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("failed to hash password")]
    Hash,
}

pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| CredentialError::Hash)
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Field-level registration checks; the message is shown to the user as-is.
pub fn validate_registration(req: &RegisterReq) -> Result<(), String> {
    let required = [
        req.email.trim(),
        req.first_name.trim(),
        req.surname.trim(),
        req.password1.as_str(),
        req.password2.as_str(),
    ];
    if required.iter().any(|f| f.is_empty()) {
        return Err("All required fields must be filled.".into());
    }
    if req.password1 != req.password2 {
        return Err("Passwords don't match.".into());
    }
    if !matches!(req.role.to_lowercase().as_str(), "educator" | "learner") {
        return Err("Role must be 'educator' or 'learner'.".into());
    }
    Ok(())
}

async fn issue_session(db: &Db, user_id: Uuid) -> sqlx::Result<Uuid> {
    let token = Uuid::new_v4();
    sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
        .bind(token)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(token)
}

pub async fn register(
    State(db): State<Db>,
    Json(req): Json<RegisterReq>,
) -> Result<Json<SessionRes>, ApiError> {
    validate_registration(&req).map_err(e422)?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(req.email.trim())
        .fetch_one(&db)
        .await
        .map_err(e500)?;
    if exists {
        return Err(e422("Email already exists."));
    }

    let hash = hash_password(&req.password1).map_err(e500)?;
    let role = req.role.to_lowercase();
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, surname, mobile_no, role)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(req.email.trim())
    .bind(hash)
    .bind(req.first_name.trim())
    .bind(req.surname.trim())
    .bind(req.mobile_no)
    .bind(&role)
    .fetch_one(&db)
    .await
    .map_err(e500)?;

    let token = issue_session(&db, user.id).await.map_err(e500)?;
    tracing::info!(user_id = %user.id, role = %role, "registered");
    Ok(Json(SessionRes {
        token,
        user_id: user.id,
        role,
    }))
}

pub async fn login(
    State(db): State<Db>,
    Json(req): Json<LoginReq>,
) -> Result<Json<SessionRes>, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(req.email.trim())
        .fetch_optional(&db)
        .await
        .map_err(e500)?;

    let user = match user {
        Some(u) if verify_password(&req.password, &u.password_hash) => u,
        _ => return Err(e401("Invalid email or password.")),
    };

    if user.role.to_lowercase() != req.role.to_lowercase() {
        return Err(e403(format!(
            "Please login as a {role} using the {role} login option.",
            role = user.role
        )));
    }

    let token = issue_session(&db, user.id).await.map_err(e500)?;
    tracing::info!(user_id = %user.id, "logged in");
    Ok(Json(SessionRes {
        token,
        user_id: user.id,
        role: user.role,
    }))
}

pub async fn logout(
    State(db): State<Db>,
    current: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(current.token)
        .execute(&db)
        .await
        .map_err(e500)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// The authenticated caller, resolved from `Authorization: Bearer <token>`.
pub struct CurrentUser {
    pub user: User,
    pub token: Uuid,
}

impl CurrentUser {
    pub fn require_role(&self, role: &str, message: &str) -> Result<(), ApiError> {
        if self.user.role.to_lowercase() == role {
            Ok(())
        } else {
            Err(e403(message))
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<Db> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, db: &Db) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| e401("Missing Authorization header."))?;
        let raw = header_value.strip_prefix("Bearer ").unwrap_or(header_value);
        let token: Uuid = raw
            .parse()
            .map_err(|_| e401("Invalid session token."))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM users u
            JOIN sessions s ON s.user_id = u.id
            WHERE s.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await
        .map_err(e500)?
        .ok_or_else(|| e401("Session not found."))?;

        Ok(CurrentUser { user, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> RegisterReq {
        RegisterReq {
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            surname: "Lovelace".into(),
            mobile_no: None,
            password1: "hunter22".into(),
            password2: "hunter22".into(),
            role: "learner".into(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(validate_registration(&req()).is_ok());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut r = req();
        r.surname = "  ".into();
        assert_eq!(
            validate_registration(&r).unwrap_err(),
            "All required fields must be filled."
        );
    }

    #[test]
    fn password_mismatch_is_rejected() {
        let mut r = req();
        r.password2 = "hunter23".into();
        assert_eq!(
            validate_registration(&r).unwrap_err(),
            "Passwords don't match."
        );
    }

    #[test]
    fn unknown_role_is_rejected() {
        let mut r = req();
        r.role = "admin".into();
        assert!(validate_registration(&r).is_err());
    }

    #[test]
    fn role_check_is_case_insensitive() {
        let mut r = req();
        r.role = "Educator".into();
        assert!(validate_registration(&r).is_ok());
    }

    #[test]
    fn password_roundtrip_verifies() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("hunter22", "not-a-phc-string"));
    }
}
