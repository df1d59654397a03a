use eats_auth::AuthError;
use eats_orders::RuleError;
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures a caller can act on. `Display` is the user-facing message.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("There is a user with that email already")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Verification not found")]
    VerificationNotFound,

    #[error("Restaurant not found")]
    RestaurantNotFound,

    #[error("Category not found")]
    CategoryNotFound,

    #[error("Dish not found")]
    DishNotFound,

    #[error("Order not found")]
    OrderNotFound,

    /// The caller does not own the restaurant being changed.
    #[error("You can't do that")]
    NotOwner,

    #[error("You can't see that")]
    NotVisible,

    #[error(transparent)]
    Rule(#[from] RuleError),

    /// Input failed validation; the message says which field.
    #[error("{0}")]
    Invalid(String),

    /// Storage or crypto failure. Never shown to clients verbatim.
    #[error("Could not complete the request")]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        ServiceError::Internal(e.into())
    }
}

impl ServiceError {
    pub fn is_internal(&self) -> bool {
        matches!(self, ServiceError::Internal(_))
    }
}
