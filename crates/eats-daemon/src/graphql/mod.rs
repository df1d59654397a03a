//! GraphQL schema: queries, mutations and order subscriptions.
//!
//! Resolvers are grouped per domain and merged into the three roots. Each
//! request carries a [`Viewer`] resolved from the `x-jwt` header (HTTP) or
//! the `x-jwt` field of the websocket `connection_init` payload.
//!
//! Mutations and lookups report domain failures as `{ ok: false, error }`
//! outputs. Missing auth and wrong roles fail the field through
//! [`guard::RoleGuard`].

use async_graphql::{Context, MergedObject, MergedSubscription, Schema, SimpleObject};
use eats_schemas::User;
use eats_service::{ServiceError, Services};
use tracing::error;

pub mod guard;
pub mod objects;
pub mod orders;
pub mod payments;
pub mod restaurants;
pub mod subscriptions;
pub mod users;

/// Header (and websocket init key) carrying the session token.
pub const JWT_HEADER: &str = "x-jwt";

pub type EatsSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

#[derive(MergedObject, Default)]
pub struct QueryRoot(
    users::UserQuery,
    restaurants::RestaurantQuery,
    orders::OrderQuery,
    payments::PaymentQuery,
);

#[derive(MergedObject, Default)]
pub struct MutationRoot(
    users::UserMutation,
    restaurants::RestaurantMutation,
    orders::OrderMutation,
    payments::PaymentMutation,
);

#[derive(MergedSubscription, Default)]
pub struct SubscriptionRoot(subscriptions::OrderSubscription);

pub fn build_schema(services: Services) -> EatsSchema {
    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        SubscriptionRoot::default(),
    )
    .data(services)
    .finish()
}

/// The authenticated user for one request or websocket session.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<User>);

// ---------------------------------------------------------------------------
// Resolver helpers
// ---------------------------------------------------------------------------

pub(crate) fn services<'a>(ctx: &Context<'a>) -> &'a Services {
    ctx.data_unchecked::<Services>()
}

pub(crate) fn viewer<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a User> {
    ctx.data::<Viewer>()
        .ok()
        .and_then(|v| v.0.as_ref())
        .ok_or_else(|| async_graphql::Error::new(guard::FORBIDDEN))
}

/// User-facing text for a failed service call. Internal failures are logged
/// with their cause chain and reported generically.
pub(crate) fn failure(e: ServiceError) -> String {
    if e.is_internal() {
        error!(error = ?e, "request failed");
    }
    e.to_string()
}

/// Same as [`failure`] for object fields that fail the whole field.
pub(crate) fn field_error(e: ServiceError) -> async_graphql::Error {
    async_graphql::Error::new(failure(e))
}

/// `{ ok, error }` result of mutations that return nothing else.
#[derive(SimpleObject, Debug, Clone, Default)]
pub struct CoreOutput {
    pub ok: bool,
    pub error: Option<String>,
}

impl CoreOutput {
    pub fn from_result<T>(res: Result<T, ServiceError>) -> Self {
        match res {
            Ok(_) => Self {
                ok: true,
                error: None,
            },
            Err(e) => Self {
                ok: false,
                error: Some(failure(e)),
            },
        }
    }
}

/// Pagination argument shared by the listing queries. Pages start at 1.
#[derive(async_graphql::InputObject, Debug, Clone)]
pub struct PaginationInput {
    #[graphql(default = 1)]
    pub page: i64,
}
