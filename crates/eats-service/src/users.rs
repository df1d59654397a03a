//! Accounts, login and email verification.

use std::sync::Arc;

use eats_auth::{hash_password, verify_password, JwtService};
use eats_db::{EmailTaken, NewUser, Store};
use eats_schemas::{User, UserRole};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::mailer::Mailer;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    jwt: JwtService,
    mailer: Arc<dyn Mailer>,
}

fn validate_email(email: &str) -> ServiceResult<()> {
    let ok = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    };
    if !ok {
        return Err(ServiceError::Invalid("Invalid email".into()));
    }
    Ok(())
}

fn validate_password(password: &str) -> ServiceResult<()> {
    if password.is_empty() {
        return Err(ServiceError::Invalid("Password must not be empty".into()));
    }
    Ok(())
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, jwt: JwtService, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, jwt, mailer }
    }

    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> ServiceResult<User> {
        let email = email.trim();
        validate_email(email)?;
        validate_password(password)?;

        if self.store.user_by_email(email).await?.is_some() {
            return Err(ServiceError::EmailTaken);
        }

        let user = self
            .store
            .insert_user(NewUser {
                email: email.to_string(),
                password_hash: hash_password(password)?,
                role,
            })
            .await
            .map_err(email_conflict)?;
        info!(user_id = user.id, role = user.role.as_str(), "account created");

        self.issue_verification(&user).await?;
        Ok(user)
    }

    /// Returns a signed token for the account.
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<String> {
        let user = self
            .store
            .user_by_email(email.trim())
            .await?
            .ok_or(ServiceError::UserNotFound)?;

        if !verify_password(password, &user.password_hash) {
            return Err(ServiceError::WrongPassword);
        }
        Ok(self.jwt.sign(user.id)?)
    }

    /// Resolves a bearer token to its user. Any failure yields `None`.
    pub async fn authenticate(&self, token: &str) -> Option<User> {
        let id = match self.jwt.verify(token) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "rejected token");
                return None;
            }
        };
        match self.store.user_by_id(id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = ?e, user_id = id, "token user lookup failed");
                None
            }
        }
    }

    pub async fn user_profile(&self, user_id: i64) -> ServiceResult<User> {
        self.store
            .user_by_id(user_id)
            .await?
            .ok_or(ServiceError::UserNotFound)
    }

    /// Changing the email clears `verified` and mails a fresh code.
    pub async fn edit_profile(
        &self,
        user_id: i64,
        email: Option<&str>,
        password: Option<&str>,
    ) -> ServiceResult<User> {
        let mut user = self.user_profile(user_id).await?;
        let mut email_changed = false;

        if let Some(email) = email.map(str::trim) {
            if email != user.email {
                validate_email(email)?;
                if self.store.user_by_email(email).await?.is_some() {
                    return Err(ServiceError::EmailTaken);
                }
                user.email = email.to_string();
                user.verified = false;
                email_changed = true;
            }
        }
        if let Some(password) = password {
            validate_password(password)?;
            user.password_hash = hash_password(password)?;
        }

        let user = self.store.update_user(&user).await.map_err(email_conflict)?;
        if email_changed {
            self.issue_verification(&user).await?;
        }
        Ok(user)
    }

    pub async fn verify_email(&self, code: &str) -> ServiceResult<User> {
        let v = self
            .store
            .verification_by_code(code)
            .await?
            .ok_or(ServiceError::VerificationNotFound)?;

        let mut user = self.user_profile(v.user_id).await?;
        user.verified = true;
        let user = self.store.update_user(&user).await?;
        self.store.delete_verification(v.id).await?;

        info!(user_id = user.id, "email verified");
        Ok(user)
    }

    async fn issue_verification(&self, user: &User) -> ServiceResult<()> {
        let code = Uuid::new_v4().to_string();
        self.store.replace_verification(user.id, &code).await?;

        // A failed send leaves the code in place; the account is still usable.
        if let Err(e) = self.mailer.send_verification(&user.email, &code).await {
            warn!(error = ?e, user_id = user.id, "verification email failed");
        }
        Ok(())
    }
}

/// A concurrent write can pass the email lookup and still hit the store's unique index.
fn email_conflict(e: anyhow::Error) -> ServiceError {
    if e.downcast_ref::<EmailTaken>().is_some() {
        ServiceError::EmailTaken
    } else {
        ServiceError::Internal(e)
    }
}
