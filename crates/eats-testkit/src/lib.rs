//! Test support: an in-memory [`eats_db::Store`] and a few row fixtures.

use std::sync::Arc;

use anyhow::Result;
use eats_db::{NewDish, NewRestaurant, NewUser, Store};
use eats_schemas::{Dish, DishChoice, DishOption, Restaurant, User, UserRole};

mod mem_store;

pub use mem_store::MemStore;

/// 32+ byte signing key accepted by `eats-config` secret resolution.
pub const TEST_JWT_KEY: &str = "eats-test-signing-key-0123456789abcdef";

pub fn mem_store() -> Arc<MemStore> {
    Arc::new(MemStore::new())
}

/// Inserts a user row directly. The password hash is not a real hash, so
/// these users cannot log in; go through the user service for that.
pub async fn seed_user(store: &dyn Store, email: &str, role: UserRole) -> Result<User> {
    store
        .insert_user(NewUser {
            email: email.to_string(),
            password_hash: "unusable".to_string(),
            role,
        })
        .await
}

pub async fn seed_restaurant(store: &dyn Store, owner_id: i64, name: &str) -> Result<Restaurant> {
    let category = store.get_or_create_category("Korean BBQ").await?;
    store
        .insert_restaurant(NewRestaurant {
            name: name.to_string(),
            cover_image: "https://cdn.eats.test/cover.png".to_string(),
            address: "1 Main St".to_string(),
            category_id: Some(category.id),
            owner_id,
        })
        .await
}

pub async fn seed_dish(
    store: &dyn Store,
    restaurant_id: i64,
    name: &str,
    price: i32,
    options: Vec<DishOption>,
) -> Result<Dish> {
    store
        .insert_dish(NewDish {
            restaurant_id,
            name: name.to_string(),
            price,
            photo: None,
            description: format!("{name} description"),
            options,
        })
        .await
}

/// Size (choice extras) plus a flat-extra topping.
///
/// `[Size: L] + [Cheese]` on a 10000 dish prices at 10000 + 2000 + 500.
pub fn sample_options() -> Vec<DishOption> {
    vec![
        DishOption {
            name: "Size".to_string(),
            choices: vec![
                DishChoice {
                    name: "M".to_string(),
                    extra: None,
                },
                DishChoice {
                    name: "L".to_string(),
                    extra: Some(2000),
                },
            ],
            extra: None,
        },
        DishOption {
            name: "Cheese".to_string(),
            choices: vec![],
            extra: Some(500),
        },
    ]
}
