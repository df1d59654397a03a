use chrono::{Duration, Utc};
use eats_db::{NewDish, NewOrder, NewOrderItem, NewRestaurant, NewUser, OrderScope, PgStore, Store};
use eats_schemas::{DishOption, OrderItemOption, OrderStatus, UserRole};
use uuid::Uuid;

async fn store_or_skip() -> anyhow::Result<Option<PgStore>> {
    let url = match std::env::var(eats_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: EATS_DATABASE_URL not set");
            return Ok(None);
        }
    };
    let pool = eats_db::connect(&url, 2).await?;
    eats_db::migrate(&pool).await?;
    Ok(Some(PgStore::new(pool)))
}

async fn user(store: &PgStore, role: UserRole) -> anyhow::Result<i64> {
    let u = store
        .insert_user(NewUser {
            email: format!("{}@eats.test", Uuid::new_v4().simple()),
            password_hash: "x".into(),
            role,
        })
        .await?;
    Ok(u.id)
}

/// DB-backed test. Skips if EATS_DATABASE_URL is not set.
#[tokio::test]
async fn driver_assignment_is_conditional_and_items_round_trip() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };

    let owner = user(&store, UserRole::Owner).await?;
    let client = user(&store, UserRole::Client).await?;
    let driver_a = user(&store, UserRole::Delivery).await?;
    let driver_b = user(&store, UserRole::Delivery).await?;

    let r = store
        .insert_restaurant(NewRestaurant {
            name: "Test Kitchen".into(),
            cover_image: "https://img/c.png".into(),
            address: "1 Main St".into(),
            category_id: None,
            owner_id: owner,
        })
        .await?;
    let dish = store
        .insert_dish(NewDish {
            restaurant_id: r.id,
            name: "Bibimbap".into(),
            price: 10000,
            photo: None,
            description: "rice".into(),
            options: vec![DishOption {
                name: "Spice".into(),
                choices: vec![],
                extra: Some(500),
            }],
        })
        .await?;
    assert_eq!(dish.options.len(), 1);

    let picks = vec![OrderItemOption {
        name: "Spice".into(),
        choice: None,
    }];
    let order = store
        .insert_order(NewOrder {
            customer_id: client,
            restaurant_id: r.id,
            total: 10500,
            items: vec![NewOrderItem {
                dish_id: dish.id,
                options: picks.clone(),
            }],
        })
        .await?;
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.driver_id.is_none());

    let loaded = store.order_by_id(order.id).await?.expect("order exists");
    assert_eq!(loaded.items.len(), 1);
    assert_eq!(loaded.items[0].options, picks);

    let taken = store.assign_driver(order.id, driver_a).await?;
    assert_eq!(taken.and_then(|o| o.driver_id), Some(driver_a));

    // Second taker loses.
    assert!(store.assign_driver(order.id, driver_b).await?.is_none());

    let mine = store.orders_for(OrderScope::Owner(owner), None).await?;
    assert_eq!(mine.len(), 1);
    let cooked = store
        .orders_for(OrderScope::Owner(owner), Some(OrderStatus::Cooked))
        .await?;
    assert!(cooked.is_empty());

    let moved = store.set_order_status(order.id, OrderStatus::Cooked).await?;
    assert_eq!(moved.map(|o| o.status), Some(OrderStatus::Cooked));

    // Deleting the dish keeps the order line with no dish.
    store.delete_dish(dish.id).await?;
    let after = store.order_by_id(order.id).await?.expect("order exists");
    assert_eq!(after.items[0].dish_id, None);

    Ok(())
}

/// DB-backed test. Skips if EATS_DATABASE_URL is not set.
#[tokio::test]
async fn expired_promotions_are_cleared() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };

    let owner = user(&store, UserRole::Owner).await?;
    let cat = store.get_or_create_category("  Test  Category ").await?;
    let again = store.get_or_create_category("test category").await?;
    assert_eq!(cat.id, again.id);
    assert_eq!(cat.slug, "test-category");

    let r = store
        .insert_restaurant(NewRestaurant {
            name: format!("Promo {}", Uuid::new_v4().simple()),
            cover_image: "c".into(),
            address: "a".into(),
            category_id: Some(cat.id),
            owner_id: owner,
        })
        .await?;

    store
        .promote_restaurant(r.id, Utc::now() - Duration::minutes(1))
        .await?;
    let before = store.restaurant_by_id(r.id).await?.expect("restaurant exists");
    assert!(before.is_promoted);

    let n = store.clear_expired_promotions(Utc::now()).await?;
    assert!(n >= 1);

    let after = store.restaurant_by_id(r.id).await?.expect("restaurant exists");
    assert!(!after.is_promoted);
    assert!(after.promoted_until.is_none());

    Ok(())
}
