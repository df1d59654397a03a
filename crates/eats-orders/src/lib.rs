//! Order rules: pricing, who may move an order where, and who may see it.
//!
//! # Status table
//!
//! ```text
//!   Pending ──► Cooking ──► Cooked ──► PickedUp ──► Delivered
//!              └──── Owner ────┘      └──── Delivery ────┘
//!
//!   driver: None ──take()──► Some(user)     (once only, Delivery role)
//! ```
//!
//! The table is keyed on (role, target status) only. Clients never edit, and
//! nobody may move an order back to `Pending`. Visibility is checked before
//! the table: a user who cannot see an order cannot edit it either.
//!
//! Everything here is pure; callers load the rows and persist the outcome.

use eats_schemas::{Dish, Order, OrderItemOption, OrderStatus, User, UserRole};
use thiserror::Error;

// ---------------------------------------------------------------------------
// RuleError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The caller's role may not set `target`.
    #[error("{role:?} may not set order status to {target:?}")]
    StatusNotAllowed { role: UserRole, target: OrderStatus },

    /// A driver already holds the order.
    #[error("order already has a driver")]
    DriverAlreadyAssigned,

    /// Prices plus extras do not fit the currency column.
    #[error("Order total is too large")]
    TotalOverflow,
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Price of one ordered dish with the customer's selected options.
///
/// A selected option adds its flat `extra` when the dish option has one;
/// otherwise the matching choice's `extra`. Unknown option names and unknown
/// choices add nothing.
pub fn dish_unit_price(dish: &Dish, selected: &[OrderItemOption]) -> Result<i32, RuleError> {
    let mut price = dish.price;
    for pick in selected {
        let Some(opt) = dish.options.iter().find(|o| o.name == pick.name) else {
            continue;
        };
        let extra = match opt.extra {
            Some(flat) => flat,
            None => pick
                .choice
                .as_deref()
                .and_then(|c| opt.choices.iter().find(|ch| ch.name == c))
                .and_then(|ch| ch.extra)
                .unwrap_or(0),
        };
        price = price.checked_add(extra).ok_or(RuleError::TotalOverflow)?;
    }
    Ok(price)
}

/// Sum of unit prices over `(dish, selected options)` lines.
pub fn order_total<'a, I>(lines: I) -> Result<i32, RuleError>
where
    I: IntoIterator<Item = (&'a Dish, &'a [OrderItemOption])>,
{
    lines.into_iter().try_fold(0i32, |total, (dish, selected)| {
        total
            .checked_add(dish_unit_price(dish, selected)?)
            .ok_or(RuleError::TotalOverflow)
    })
}

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

/// Statuses a role may set. Empty for clients.
pub fn allowed_targets(role: UserRole) -> &'static [OrderStatus] {
    match role {
        UserRole::Client => &[],
        UserRole::Owner => &[OrderStatus::Cooking, OrderStatus::Cooked],
        UserRole::Delivery => &[OrderStatus::PickedUp, OrderStatus::Delivered],
    }
}

pub fn check_status_change(role: UserRole, target: OrderStatus) -> Result<(), RuleError> {
    if allowed_targets(role).contains(&target) {
        Ok(())
    } else {
        Err(RuleError::StatusNotAllowed { role, target })
    }
}

/// Driver assignment is once-only.
pub fn check_take(order: &Order) -> Result<(), RuleError> {
    match order.driver_id {
        None => Ok(()),
        Some(_) => Err(RuleError::DriverAlreadyAssigned),
    }
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Whether `user` may read `order`.
///
/// `restaurant_owner_id` is the owner of `order.restaurant_id`, or `None`
/// when the restaurant no longer exists.
pub fn can_see(user: &User, order: &Order, restaurant_owner_id: Option<i64>) -> bool {
    match user.role {
        UserRole::Client => order.customer_id == Some(user.id),
        UserRole::Delivery => order.driver_id == Some(user.id),
        UserRole::Owner => restaurant_owner_id == Some(user.id),
    }
}

/// Customer, driver, or restaurant owner of the order, regardless of role.
/// Used to route order-update notifications.
pub fn is_participant(user_id: i64, order: &Order, restaurant_owner_id: Option<i64>) -> bool {
    order.customer_id == Some(user_id)
        || order.driver_id == Some(user_id)
        || restaurant_owner_id == Some(user_id)
}
