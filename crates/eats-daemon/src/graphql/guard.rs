use async_graphql::{Context, Guard, Result};
use eats_schemas::UserRole;

use super::viewer;

pub const FORBIDDEN: &str = "Forbidden resource";

/// Which roles a field accepts. `Any` means "any logged-in user".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedRole {
    Client,
    Owner,
    Delivery,
    Any,
}

impl AllowedRole {
    pub fn admits(&self, role: UserRole) -> bool {
        match self {
            AllowedRole::Any => true,
            AllowedRole::Client => role == UserRole::Client,
            AllowedRole::Owner => role == UserRole::Owner,
            AllowedRole::Delivery => role == UserRole::Delivery,
        }
    }
}

pub struct RoleGuard {
    allowed: AllowedRole,
}

impl RoleGuard {
    pub fn new(allowed: AllowedRole) -> Self {
        Self { allowed }
    }
}

impl Guard for RoleGuard {
    async fn check(&self, ctx: &Context<'_>) -> Result<()> {
        let user = viewer(ctx)?;
        if self.allowed.admits(user.role) {
            Ok(())
        } else {
            Err(FORBIDDEN.into())
        }
    }
}
