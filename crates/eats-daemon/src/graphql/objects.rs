//! GraphQL views over the shared records.
//!
//! Relations (a restaurant's category and menu, an order's customer) are
//! resolved lazily through the services on the request context.

use async_graphql::{Context, Object, Result};
use chrono::{DateTime, Utc};
use eats_schemas::{
    Category, Dish, DishOption, Order, OrderItem, OrderItemOption, OrderStatus, Payment,
    Restaurant, User, UserRole,
};

use super::{field_error, services, Viewer};

pub struct UserObject(pub User);

#[Object(name = "User")]
impl UserObject {
    async fn id(&self) -> i64 {
        self.0.id
    }
    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }
    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_at
    }
    async fn email(&self) -> &str {
        &self.0.email
    }
    async fn role(&self) -> UserRole {
        self.0.role
    }
    async fn verified(&self) -> bool {
        self.0.verified
    }
}

pub struct CategoryObject(pub Category);

#[Object(name = "Category")]
impl CategoryObject {
    async fn id(&self) -> i64 {
        self.0.id
    }
    async fn name(&self) -> &str {
        &self.0.name
    }
    async fn slug(&self) -> &str {
        &self.0.slug
    }
    async fn cover_image(&self) -> Option<&str> {
        self.0.cover_image.as_deref()
    }
    async fn restaurant_count(&self, ctx: &Context<'_>) -> Result<i64> {
        services(ctx)
            .restaurants
            .count_restaurants(self.0.id)
            .await
            .map_err(field_error)
    }
}

pub struct RestaurantObject(pub Restaurant);

#[Object(name = "Restaurant")]
impl RestaurantObject {
    async fn id(&self) -> i64 {
        self.0.id
    }
    async fn name(&self) -> &str {
        &self.0.name
    }
    async fn cover_image(&self) -> &str {
        &self.0.cover_image
    }
    async fn address(&self) -> &str {
        &self.0.address
    }
    async fn owner_id(&self) -> i64 {
        self.0.owner_id
    }
    async fn is_promoted(&self) -> bool {
        self.0.is_promoted
    }
    async fn promoted_until(&self) -> Option<DateTime<Utc>> {
        self.0.promoted_until
    }
    async fn category(&self, ctx: &Context<'_>) -> Result<Option<CategoryObject>> {
        let Some(id) = self.0.category_id else {
            return Ok(None);
        };
        let cat = services(ctx)
            .restaurants
            .category_by_id(id)
            .await
            .map_err(field_error)?;
        Ok(cat.map(CategoryObject))
    }
    async fn menu(&self, ctx: &Context<'_>) -> Result<Vec<DishObject>> {
        let dishes = services(ctx)
            .restaurants
            .menu(self.0.id)
            .await
            .map_err(field_error)?;
        Ok(dishes.into_iter().map(DishObject).collect())
    }
    /// Only the owner sees a restaurant's orders; everyone else gets `[]`.
    async fn orders(&self, ctx: &Context<'_>) -> Result<Vec<OrderObject>> {
        let is_owner = ctx
            .data::<Viewer>()
            .ok()
            .and_then(|v| v.0.as_ref())
            .is_some_and(|u| u.id == self.0.owner_id);
        if !is_owner {
            return Ok(Vec::new());
        }
        let orders = services(ctx)
            .restaurants
            .restaurant_orders(self.0.id)
            .await
            .map_err(field_error)?;
        Ok(orders.into_iter().map(OrderObject).collect())
    }
}

pub struct DishObject(pub Dish);

#[Object(name = "Dish")]
impl DishObject {
    async fn id(&self) -> i64 {
        self.0.id
    }
    async fn restaurant_id(&self) -> i64 {
        self.0.restaurant_id
    }
    async fn name(&self) -> &str {
        &self.0.name
    }
    async fn price(&self) -> i32 {
        self.0.price
    }
    async fn photo(&self) -> Option<&str> {
        self.0.photo.as_deref()
    }
    async fn description(&self) -> &str {
        &self.0.description
    }
    async fn options(&self) -> Vec<DishOption> {
        self.0.options.clone()
    }
}

pub struct OrderItemObject(pub OrderItem);

#[Object(name = "OrderItem")]
impl OrderItemObject {
    async fn id(&self) -> i64 {
        self.0.id
    }
    async fn options(&self) -> Vec<OrderItemOption> {
        self.0.options.clone()
    }
    /// `null` once the dish has been removed from the menu.
    async fn dish(&self, ctx: &Context<'_>) -> Result<Option<DishObject>> {
        let Some(id) = self.0.dish_id else {
            return Ok(None);
        };
        let dish = services(ctx)
            .store
            .dish_by_id(id)
            .await
            .map_err(|e| field_error(e.into()))?;
        Ok(dish.map(DishObject))
    }
}

pub struct OrderObject(pub Order);

#[Object(name = "Order")]
impl OrderObject {
    async fn id(&self) -> i64 {
        self.0.id
    }
    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }
    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_at
    }
    async fn total(&self) -> i32 {
        self.0.total
    }
    async fn status(&self) -> OrderStatus {
        self.0.status
    }
    async fn customer_id(&self) -> Option<i64> {
        self.0.customer_id
    }
    async fn driver_id(&self) -> Option<i64> {
        self.0.driver_id
    }
    async fn restaurant_id(&self) -> Option<i64> {
        self.0.restaurant_id
    }
    async fn items(&self) -> Vec<OrderItemObject> {
        self.0.items.iter().cloned().map(OrderItemObject).collect()
    }
    async fn customer(&self, ctx: &Context<'_>) -> Result<Option<UserObject>> {
        user_by_id(ctx, self.0.customer_id).await
    }
    async fn driver(&self, ctx: &Context<'_>) -> Result<Option<UserObject>> {
        user_by_id(ctx, self.0.driver_id).await
    }
    async fn restaurant(&self, ctx: &Context<'_>) -> Result<Option<RestaurantObject>> {
        let Some(id) = self.0.restaurant_id else {
            return Ok(None);
        };
        let r = services(ctx)
            .store
            .restaurant_by_id(id)
            .await
            .map_err(|e| field_error(e.into()))?;
        Ok(r.map(RestaurantObject))
    }
}

async fn user_by_id(ctx: &Context<'_>, id: Option<i64>) -> Result<Option<UserObject>> {
    let Some(id) = id else {
        return Ok(None);
    };
    let user = services(ctx)
        .store
        .user_by_id(id)
        .await
        .map_err(|e| field_error(e.into()))?;
    Ok(user.map(UserObject))
}

pub struct PaymentObject(pub Payment);

#[Object(name = "Payment")]
impl PaymentObject {
    async fn id(&self) -> i64 {
        self.0.id
    }
    async fn transaction_id(&self) -> &str {
        &self.0.transaction_id
    }
    async fn restaurant_id(&self) -> i64 {
        self.0.restaurant_id
    }
    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }
    async fn restaurant(&self, ctx: &Context<'_>) -> Result<Option<RestaurantObject>> {
        let r = services(ctx)
            .store
            .restaurant_by_id(self.0.restaurant_id)
            .await
            .map_err(|e| field_error(e.into()))?;
        Ok(r.map(RestaurantObject))
    }
}
