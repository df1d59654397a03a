//! Shared records for the eats backend.
//!
//! Plain data only: storage lives in `eats-db`, rules in `eats-orders`, and
//! the GraphQL object wrappers in `eats-daemon`. With the `graphql` feature
//! the enums and the option records also derive their GraphQL impls so the
//! API can accept and return them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Restaurants and search results are paged by this many rows.
pub const PAGE_SIZE: i64 = 25;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::Enum))]
#[cfg_attr(feature = "graphql", graphql(rename_items = "PascalCase"))]
pub enum UserRole {
    Client,
    Owner,
    Delivery,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Client => "Client",
            UserRole::Owner => "Owner",
            UserRole::Delivery => "Delivery",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Client" => Some(UserRole::Client),
            "Owner" => Some(UserRole::Owner),
            "Delivery" => Some(UserRole::Delivery),
            _ => None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    /// argon2 PHC string; never leaves the service layer.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub verified: bool,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("verified", &self.verified)
            .field("password_hash", &"<REDACTED>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub id: i64,
    pub code: String,
    pub user_id: i64,
}

// ---------------------------------------------------------------------------
// Restaurants and menus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub cover_image: Option<String>,
}

/// Display name stored for a category: trimmed, lowercased, single-spaced.
pub fn normalize_category_name(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Category slug: trimmed, lowercased, words joined with `-`.
///
/// `"  Korean  BBQ "` and `"korean bbq"` both map to `"korean-bbq"`, which is
/// what makes category creation idempotent.
pub fn slugify(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    pub cover_image: String,
    pub address: String,
    pub category_id: Option<i64>,
    pub owner_id: i64,
    pub is_promoted: bool,
    pub promoted_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "graphql",
    derive(async_graphql::SimpleObject, async_graphql::InputObject)
)]
#[cfg_attr(feature = "graphql", graphql(input_name = "DishChoiceInput"))]
pub struct DishChoice {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<i32>,
}

/// A customizable part of a dish.
///
/// An option either carries a flat `extra` (e.g. "extra cheese") or a list of
/// `choices` each with its own optional `extra` (e.g. size).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "graphql",
    derive(async_graphql::SimpleObject, async_graphql::InputObject)
)]
#[cfg_attr(feature = "graphql", graphql(input_name = "DishOptionInput"))]
pub struct DishOption {
    pub name: String,
    #[serde(default)]
    #[cfg_attr(feature = "graphql", graphql(default))]
    pub choices: Vec<DishChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    pub id: i64,
    pub restaurant_id: i64,
    pub name: String,
    pub price: i32,
    pub photo: Option<String>,
    pub description: String,
    pub options: Vec<DishOption>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(async_graphql::Enum))]
#[cfg_attr(feature = "graphql", graphql(rename_items = "PascalCase"))]
pub enum OrderStatus {
    Pending,
    Cooking,
    Cooked,
    PickedUp,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Cooking => "Cooking",
            OrderStatus::Cooked => "Cooked",
            OrderStatus::PickedUp => "PickedUp",
            OrderStatus::Delivered => "Delivered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(OrderStatus::Pending),
            "Cooking" => Some(OrderStatus::Cooking),
            "Cooked" => Some(OrderStatus::Cooked),
            "PickedUp" => Some(OrderStatus::PickedUp),
            "Delivered" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

/// One option picked by the customer for an ordered dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(
    feature = "graphql",
    derive(async_graphql::SimpleObject, async_graphql::InputObject)
)]
#[cfg_attr(feature = "graphql", graphql(input_name = "OrderItemOptionInput"))]
pub struct OrderItemOption {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    /// `None` once the dish is removed from the menu.
    pub dish_id: Option<i64>,
    pub options: Vec<OrderItemOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` once the customer account is deleted.
    pub customer_id: Option<i64>,
    pub driver_id: Option<i64>,
    /// `None` once the restaurant is deleted.
    pub restaurant_id: Option<i64>,
    pub total: i32,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub transaction_id: String,
    pub user_id: i64,
    pub restaurant_id: i64,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// A page of rows plus the unpaged row count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_results: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        total_pages(self.total_results)
    }
}

/// 1-based page number clamped to >= 1, converted to a row offset.
pub fn page_offset(page: i64) -> i64 {
    page.max(1).saturating_sub(1).saturating_mul(PAGE_SIZE)
}

pub fn total_pages(total_results: i64) -> i64 {
    if total_results <= 0 {
        return 0;
    }
    (total_results - 1) / PAGE_SIZE + 1
}
