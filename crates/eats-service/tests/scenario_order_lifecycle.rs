use std::sync::Arc;

use eats_auth::JwtService;
use eats_orders::RuleError;
use eats_schemas::{OrderItemOption, OrderStatus, User, UserRole};
use eats_service::{
    CreateOrderItem, OrderEvent, RecordingMailer, ServiceError, Services,
};
use eats_testkit::{mem_store, sample_options, seed_dish, seed_restaurant, seed_user, TEST_JWT_KEY};

struct World {
    svc: Services,
    owner: User,
    client: User,
    driver: User,
    restaurant_id: i64,
    dish_id: i64,
}

async fn world() -> World {
    let store = mem_store();
    let svc = Services::new(
        store.clone(),
        JwtService::new(TEST_JWT_KEY.as_bytes(), 3600),
        Arc::new(RecordingMailer::new()),
        7,
    );
    let owner = seed_user(store.as_ref(), "owner@eats.test", UserRole::Owner).await.unwrap();
    let client = seed_user(store.as_ref(), "client@eats.test", UserRole::Client).await.unwrap();
    let driver = seed_user(store.as_ref(), "driver@eats.test", UserRole::Delivery).await.unwrap();
    let r = seed_restaurant(store.as_ref(), owner.id, "Grill House").await.unwrap();
    let d = seed_dish(store.as_ref(), r.id, "Pizza Slice", 10000, sample_options())
        .await
        .unwrap();
    World {
        svc,
        owner,
        client,
        driver,
        restaurant_id: r.id,
        dish_id: d.id,
    }
}

fn large_with_cheese(dish_id: i64) -> CreateOrderItem {
    CreateOrderItem {
        dish_id,
        options: vec![
            OrderItemOption {
                name: "Size".into(),
                choice: Some("L".into()),
            },
            OrderItemOption {
                name: "Cheese".into(),
                choice: None,
            },
        ],
    }
}

#[tokio::test]
async fn order_flows_from_pending_to_delivered_with_events() {
    let w = world().await;
    let mut rx = w.svc.bus.subscribe();

    let order = w
        .svc
        .orders
        .create_order(
            &w.client,
            w.restaurant_id,
            vec![large_with_cheese(w.dish_id), CreateOrderItem { dish_id: w.dish_id, options: vec![] }],
        )
        .await
        .unwrap();
    assert_eq!(order.total, 12500 + 10000);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 2);

    match rx.recv().await.unwrap() {
        OrderEvent::Pending { order: o, owner_id } => {
            assert_eq!(o.id, order.id);
            assert_eq!(owner_id, w.owner.id);
        }
        other => panic!("expected Pending, got {other:?}"),
    }

    w.svc
        .orders
        .edit_order(&w.owner, order.id, OrderStatus::Cooking)
        .await
        .unwrap();
    assert!(matches!(rx.recv().await.unwrap(), OrderEvent::Updated { .. }));

    w.svc
        .orders
        .edit_order(&w.owner, order.id, OrderStatus::Cooked)
        .await
        .unwrap();
    assert!(matches!(rx.recv().await.unwrap(), OrderEvent::Cooked { .. }));
    assert!(matches!(rx.recv().await.unwrap(), OrderEvent::Updated { .. }));

    let taken = w.svc.orders.take_order(&w.driver, order.id).await.unwrap();
    assert_eq!(taken.driver_id, Some(w.driver.id));

    for s in [OrderStatus::PickedUp, OrderStatus::Delivered] {
        let o = w.svc.orders.edit_order(&w.driver, order.id, s).await.unwrap();
        assert_eq!(o.status, s);
    }

    let seen = w.svc.orders.get_order(&w.client, order.id).await.unwrap();
    assert_eq!(seen.status, OrderStatus::Delivered);
}

#[tokio::test]
async fn roles_cannot_set_each_others_states() {
    let w = world().await;
    let order = w
        .svc
        .orders
        .create_order(&w.client, w.restaurant_id, vec![large_with_cheese(w.dish_id)])
        .await
        .unwrap();

    // Client sees the order but may not edit it.
    let err = w
        .svc
        .orders
        .edit_order(&w.client, order.id, OrderStatus::Cooking)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rule(RuleError::StatusNotAllowed { .. })));

    let err = w
        .svc
        .orders
        .edit_order(&w.owner, order.id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rule(RuleError::StatusNotAllowed { .. })));

    // Driver has not taken it yet, so cannot see it at all.
    let err = w
        .svc
        .orders
        .edit_order(&w.driver, order.id, OrderStatus::PickedUp)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotVisible));

    w.svc.orders.take_order(&w.driver, order.id).await.unwrap();
    let err = w
        .svc
        .orders
        .edit_order(&w.driver, order.id, OrderStatus::Cooked)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rule(RuleError::StatusNotAllowed { .. })));
}

#[tokio::test]
async fn second_take_conflicts() {
    let w = world().await;
    let other = seed_user(w.svc.store.as_ref(), "d2@eats.test", UserRole::Delivery)
        .await
        .unwrap();
    let order = w
        .svc
        .orders
        .create_order(&w.client, w.restaurant_id, vec![large_with_cheese(w.dish_id)])
        .await
        .unwrap();

    w.svc.orders.take_order(&w.driver, order.id).await.unwrap();
    let err = w.svc.orders.take_order(&other, order.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Rule(RuleError::DriverAlreadyAssigned)));
    assert_eq!(err.to_string(), "order already has a driver");
}

#[tokio::test]
async fn create_order_validates_restaurant_and_dishes() {
    let w = world().await;

    let err = w
        .svc
        .orders
        .create_order(&w.client, 9999, vec![large_with_cheese(w.dish_id)])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::RestaurantNotFound));

    let err = w
        .svc
        .orders
        .create_order(&w.client, w.restaurant_id, vec![large_with_cheese(9999)])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::DishNotFound));

    let err = w
        .svc
        .orders
        .create_order(&w.client, w.restaurant_id, vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Invalid(_)));

    // A dish from another restaurant cannot be ordered here.
    let other_r = seed_restaurant(w.svc.store.as_ref(), w.owner.id, "Other Place")
        .await
        .unwrap();
    let foreign = seed_dish(w.svc.store.as_ref(), other_r.id, "Foreign Dish", 100, vec![])
        .await
        .unwrap();
    let err = w
        .svc
        .orders
        .create_order(&w.client, w.restaurant_id, vec![large_with_cheese(foreign.id)])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::DishNotFound));
}

#[tokio::test]
async fn listings_are_role_scoped() {
    let w = world().await;
    let stranger = seed_user(w.svc.store.as_ref(), "x@eats.test", UserRole::Client)
        .await
        .unwrap();
    let order = w
        .svc
        .orders
        .create_order(&w.client, w.restaurant_id, vec![large_with_cheese(w.dish_id)])
        .await
        .unwrap();

    assert_eq!(w.svc.orders.get_orders(&w.client, None).await.unwrap().len(), 1);
    assert_eq!(w.svc.orders.get_orders(&w.owner, None).await.unwrap().len(), 1);
    assert!(w.svc.orders.get_orders(&w.driver, None).await.unwrap().is_empty());
    assert!(w.svc.orders.get_orders(&stranger, None).await.unwrap().is_empty());
    assert!(w
        .svc
        .orders
        .get_orders(&w.owner, Some(OrderStatus::Cooked))
        .await
        .unwrap()
        .is_empty());

    let err = w.svc.orders.get_order(&stranger, order.id).await.unwrap_err();
    assert_eq!(err.to_string(), "You can't see that");
    let err = w.svc.orders.get_order(&w.client, 424242).await.unwrap_err();
    assert_eq!(err.to_string(), "Order not found");
}

#[tokio::test]
async fn oversized_total_is_rejected_without_persisting() {
    let w = world().await;
    let pricey = seed_dish(w.svc.store.as_ref(), w.restaurant_id, "Gold Platter", 2_000_000_000, vec![])
        .await
        .unwrap();
    let line = || CreateOrderItem {
        dish_id: pricey.id,
        options: vec![],
    };

    let err = w
        .svc
        .orders
        .create_order(&w.client, w.restaurant_id, vec![line(), line()])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rule(RuleError::TotalOverflow)));
    assert_eq!(err.to_string(), "Order total is too large");
    assert!(!err.is_internal());
    assert!(w.svc.orders.get_orders(&w.client, None).await.unwrap().is_empty());

    // One of them still fits.
    let order = w
        .svc
        .orders
        .create_order(&w.client, w.restaurant_id, vec![line()])
        .await
        .unwrap();
    assert_eq!(order.total, 2_000_000_000);
}
