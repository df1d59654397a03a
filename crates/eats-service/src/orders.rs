use std::sync::Arc;

use eats_db::{NewOrder, NewOrderItem, OrderScope, Store};
use eats_orders::{can_see, check_status_change, check_take, order_total, RuleError};
use eats_schemas::{Dish, Order, OrderItemOption, OrderStatus, User, UserRole};
use tracing::info;

use crate::bus::{OrderBus, OrderEvent};
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct CreateOrderItem {
    pub dish_id: i64,
    pub options: Vec<OrderItemOption>,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    bus: OrderBus,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, bus: OrderBus) -> Self {
        Self { store, bus }
    }

    /// Owner of the order's restaurant, `None` once the restaurant is gone.
    pub async fn restaurant_owner(&self, order: &Order) -> ServiceResult<Option<i64>> {
        let Some(rid) = order.restaurant_id else {
            return Ok(None);
        };
        Ok(self.store.restaurant_by_id(rid).await?.map(|r| r.owner_id))
    }

    pub async fn create_order(
        &self,
        customer: &User,
        restaurant_id: i64,
        items: Vec<CreateOrderItem>,
    ) -> ServiceResult<Order> {
        let restaurant = self
            .store
            .restaurant_by_id(restaurant_id)
            .await?
            .ok_or(ServiceError::RestaurantNotFound)?;

        if items.is_empty() {
            return Err(ServiceError::Invalid("An order needs at least one item".into()));
        }

        let mut dishes: Vec<Dish> = Vec::with_capacity(items.len());
        for item in &items {
            let dish = self
                .store
                .dish_by_id(item.dish_id)
                .await?
                .filter(|d| d.restaurant_id == restaurant.id)
                .ok_or(ServiceError::DishNotFound)?;
            dishes.push(dish);
        }

        let total = order_total(
            dishes
                .iter()
                .zip(&items)
                .map(|(dish, item)| (dish, item.options.as_slice())),
        )?;

        let order = self
            .store
            .insert_order(NewOrder {
                customer_id: customer.id,
                restaurant_id: restaurant.id,
                total,
                items: items
                    .into_iter()
                    .map(|i| NewOrderItem {
                        dish_id: i.dish_id,
                        options: i.options,
                    })
                    .collect(),
            })
            .await?;

        info!(
            order_id = order.id,
            restaurant_id = restaurant.id,
            customer_id = customer.id,
            total,
            "order created"
        );
        self.bus.publish(OrderEvent::Pending {
            order: order.clone(),
            owner_id: restaurant.owner_id,
        });
        Ok(order)
    }

    /// Orders visible to `user`, optionally narrowed to one status.
    pub async fn get_orders(
        &self,
        user: &User,
        status: Option<OrderStatus>,
    ) -> ServiceResult<Vec<Order>> {
        let scope = match user.role {
            UserRole::Client => OrderScope::Customer(user.id),
            UserRole::Delivery => OrderScope::Driver(user.id),
            UserRole::Owner => OrderScope::Owner(user.id),
        };
        Ok(self.store.orders_for(scope, status).await?)
    }

    pub async fn get_order(&self, user: &User, order_id: i64) -> ServiceResult<Order> {
        let (order, _) = self.visible_order(user, order_id).await?;
        Ok(order)
    }

    async fn visible_order(&self, user: &User, order_id: i64) -> ServiceResult<(Order, Option<i64>)> {
        let order = self
            .store
            .order_by_id(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound)?;
        let owner_id = self.restaurant_owner(&order).await?;
        if !can_see(user, &order, owner_id) {
            return Err(ServiceError::NotVisible);
        }
        Ok((order, owner_id))
    }

    /// Visibility first, then the role/status table.
    pub async fn edit_order(
        &self,
        user: &User,
        order_id: i64,
        status: OrderStatus,
    ) -> ServiceResult<Order> {
        let (_, owner_id) = self.visible_order(user, order_id).await?;
        check_status_change(user.role, status)?;

        let order = self
            .store
            .set_order_status(order_id, status)
            .await?
            .ok_or(ServiceError::OrderNotFound)?;

        info!(order_id, status = status.as_str(), user_id = user.id, "order status changed");
        if user.role == UserRole::Owner && status == OrderStatus::Cooked {
            self.bus.publish(OrderEvent::Cooked {
                order: order.clone(),
            });
        }
        self.bus.publish(OrderEvent::Updated {
            order: order.clone(),
            owner_id,
        });
        Ok(order)
    }

    /// Assigns `driver` to an order that has none.
    pub async fn take_order(&self, driver: &User, order_id: i64) -> ServiceResult<Order> {
        let current = self
            .store
            .order_by_id(order_id)
            .await?
            .ok_or(ServiceError::OrderNotFound)?;
        check_take(&current)?;

        // Lost the race between the check and the update.
        let order = self
            .store
            .assign_driver(order_id, driver.id)
            .await?
            .ok_or(RuleError::DriverAlreadyAssigned)?;

        info!(order_id, driver_id = driver.id, "order taken");
        let owner_id = self.restaurant_owner(&order).await?;
        self.bus.publish(OrderEvent::Updated {
            order: order.clone(),
            owner_id,
        });
        Ok(order)
    }
}
