use crate::db::{DbAdminUser, DbUser, DeskStorage};
use crate::error::DeskError;
use crate::service::password::{hash_password, verify_password};
use chrono::Utc;
use tracing::info;

pub const MIN_PASSWORD_CHARS: usize = 6;

fn require(field: &str, value: &str) -> Result<(), DeskError> {
    if value.trim().is_empty() {
        return Err(DeskError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

fn is_unique_violation(e: &DeskError) -> bool {
    matches!(
        e,
        DeskError::DatabaseError(db)
            if db.as_database_error().is_some_and(|d| d.is_unique_violation())
    )
}

pub async fn register_user(
    storage: &DeskStorage,
    username: &str,
    email: Option<&str>,
    password: &str,
) -> Result<DbUser, DeskError> {
    require("username", username)?;
    require("password", password)?;
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(DeskError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    let email = email.map(str::trim).filter(|e| !e.is_empty());

    if storage.find_user_by_username(username).await?.is_some() {
        return Err(DeskError::BadRequest("username is already taken".into()));
    }
    if let Some(email) = email
        && storage.find_user_by_email(email).await?.is_some()
    {
        return Err(DeskError::BadRequest("email is already registered".into()));
    }

    let hash = hash_password(password.to_string()).await?;
    // A concurrent registration can still win the insert.
    let user = storage
        .create_user(username, email, &hash, Utc::now())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DeskError::BadRequest("username or email is already taken".into())
            } else {
                e
            }
        })?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Look the user up by email, or by username when no email is given.
pub async fn authenticate_user(
    storage: &DeskStorage,
    email: Option<&str>,
    username: Option<&str>,
    password: &str,
) -> Result<DbUser, DeskError> {
    let email = email.filter(|e| !e.trim().is_empty());
    let username = username.filter(|u| !u.trim().is_empty());
    if (email.is_none() && username.is_none()) || password.is_empty() {
        return Err(DeskError::BadRequest(
            "email (or username) and password are required".into(),
        ));
    }

    let user = match (email, username) {
        (Some(email), _) => storage.find_user_by_email(email).await?,
        (None, Some(username)) => storage.find_user_by_username(username).await?,
        (None, None) => None,
    };
    let Some(user) = user else {
        return Err(DeskError::InvalidCredentials);
    };
    if !verify_password(password.to_string(), user.password_hash.clone()).await? {
        return Err(DeskError::InvalidCredentials);
    }
    Ok(user)
}

/// Create the first admin. Refused once any admin exists.
pub async fn create_first_admin(
    storage: &DeskStorage,
    username: &str,
    password: &str,
) -> Result<DbAdminUser, DeskError> {
    if storage.admin_exists().await? {
        return Err(DeskError::BadRequest("Admin user already exists".into()));
    }
    require("username", username)?;
    require("password", password)?;
    let hash = hash_password(password.to_string()).await?;
    let Some(admin) = storage
        .create_admin_if_none(username, &hash, Utc::now())
        .await?
    else {
        return Err(DeskError::BadRequest("Admin user already exists".into()));
    };
    info!(admin_id = %admin.id, username = %admin.username, "admin user created");
    Ok(admin)
}

pub async fn authenticate_admin(
    storage: &DeskStorage,
    username: &str,
    password: &str,
) -> Result<DbAdminUser, DeskError> {
    let Some(admin) = storage.find_admin_by_username(username).await? else {
        return Err(DeskError::InvalidCredentials);
    };
    if !verify_password(password.to_string(), admin.password_hash.clone()).await? {
        return Err(DeskError::InvalidCredentials);
    }
    Ok(admin)
}

/// Seed an admin from configuration when the table is still empty.
pub async fn seed_admin(
    storage: &DeskStorage,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<Option<DbAdminUser>, DeskError> {
    let (Some(username), Some(password)) = (username, password) else {
        return Ok(None);
    };
    if storage.admin_exists().await? {
        return Ok(None);
    }
    create_first_admin(storage, username, password).await.map(Some)
}
