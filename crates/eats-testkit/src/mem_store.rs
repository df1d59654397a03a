//! In-memory [`Store`].
//!
//! Mirrors the Postgres schema's observable behavior: unique emails and
//! category slugs, `on delete` cascades and set-nulls, promoted-first paging,
//! and the conditional driver assignment.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eats_db::{
    EmailTaken, NewDish, NewOrder, NewPayment, NewRestaurant, NewUser, OrderScope, Store,
};
use eats_schemas::{
    normalize_category_name, page_offset, slugify, Category, Dish, Order, OrderItem, OrderStatus,
    Page, Payment, Restaurant, User, Verification, PAGE_SIZE,
};
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    verifications: BTreeMap<i64, Verification>,
    categories: BTreeMap<i64, Category>,
    restaurants: BTreeMap<i64, Restaurant>,
    dishes: BTreeMap<i64, Dish>,
    orders: BTreeMap<i64, Order>,
    payments: BTreeMap<i64, Payment>,
}

impl Tables {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paged(mut rows: Vec<Restaurant>, page: i64) -> Page<Restaurant> {
    rows.sort_by_key(|r| (!r.is_promoted, r.id));
    let total_results = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(page_offset(page) as usize)
        .take(PAGE_SIZE as usize)
        .collect();
    Page {
        items,
        total_results,
    }
}

#[async_trait]
impl Store for MemStore {
    async fn insert_user(&self, new: NewUser) -> Result<User> {
        let mut t = self.inner.lock().await;
        if t.users.values().any(|u| u.email == new.email) {
            return Err(EmailTaken.into());
        }
        let now = Utc::now();
        let user = User {
            id: t.id(),
            created_at: now,
            updated_at: now,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            verified: false,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let t = self.inner.lock().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let mut t = self.inner.lock().await;
        if t
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(EmailTaken.into());
        }
        let row = t
            .users
            .get_mut(&user.id)
            .ok_or_else(|| anyhow!("update_user failed: no user {}", user.id))?;
        row.email = user.email.clone();
        row.password_hash = user.password_hash.clone();
        row.verified = user.verified;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn replace_verification(&self, user_id: i64, code: &str) -> Result<Verification> {
        let mut t = self.inner.lock().await;
        t.verifications.retain(|_, v| v.user_id != user_id);
        let v = Verification {
            id: t.id(),
            code: code.to_string(),
            user_id,
        };
        t.verifications.insert(v.id, v.clone());
        Ok(v)
    }

    async fn verification_by_code(&self, code: &str) -> Result<Option<Verification>> {
        let t = self.inner.lock().await;
        Ok(t.verifications.values().find(|v| v.code == code).cloned())
    }

    async fn delete_verification(&self, id: i64) -> Result<()> {
        self.inner.lock().await.verifications.remove(&id);
        Ok(())
    }

    async fn get_or_create_category(&self, name: &str) -> Result<Category> {
        let mut t = self.inner.lock().await;
        let slug = slugify(name);
        if let Some(c) = t.categories.values().find(|c| c.slug == slug) {
            return Ok(c.clone());
        }
        let c = Category {
            id: t.id(),
            name: normalize_category_name(name),
            slug,
            cover_image: None,
        };
        t.categories.insert(c.id, c.clone());
        Ok(c)
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.inner.lock().await.categories.values().cloned().collect())
    }

    async fn category_by_id(&self, id: i64) -> Result<Option<Category>> {
        Ok(self.inner.lock().await.categories.get(&id).cloned())
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let t = self.inner.lock().await;
        Ok(t.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn count_restaurants_in_category(&self, category_id: i64) -> Result<i64> {
        let t = self.inner.lock().await;
        Ok(t.restaurants
            .values()
            .filter(|r| r.category_id == Some(category_id))
            .count() as i64)
    }

    async fn insert_restaurant(&self, new: NewRestaurant) -> Result<Restaurant> {
        let mut t = self.inner.lock().await;
        if !t.users.contains_key(&new.owner_id) {
            return Err(anyhow!("insert_restaurant failed: no owner {}", new.owner_id));
        }
        let r = Restaurant {
            id: t.id(),
            name: new.name,
            cover_image: new.cover_image,
            address: new.address,
            category_id: new.category_id,
            owner_id: new.owner_id,
            is_promoted: false,
            promoted_until: None,
        };
        t.restaurants.insert(r.id, r.clone());
        Ok(r)
    }

    async fn restaurant_by_id(&self, id: i64) -> Result<Option<Restaurant>> {
        Ok(self.inner.lock().await.restaurants.get(&id).cloned())
    }

    async fn update_restaurant(&self, r: &Restaurant) -> Result<Restaurant> {
        let mut t = self.inner.lock().await;
        let row = t
            .restaurants
            .get_mut(&r.id)
            .ok_or_else(|| anyhow!("update_restaurant failed: no restaurant {}", r.id))?;
        row.name = r.name.clone();
        row.cover_image = r.cover_image.clone();
        row.address = r.address.clone();
        row.category_id = r.category_id;
        Ok(row.clone())
    }

    async fn delete_restaurant(&self, id: i64) -> Result<()> {
        let mut t = self.inner.lock().await;
        t.restaurants.remove(&id);

        let gone: Vec<i64> = t
            .dishes
            .values()
            .filter(|d| d.restaurant_id == id)
            .map(|d| d.id)
            .collect();
        t.dishes.retain(|_, d| d.restaurant_id != id);
        t.payments.retain(|_, p| p.restaurant_id != id);
        for o in t.orders.values_mut() {
            if o.restaurant_id == Some(id) {
                o.restaurant_id = None;
            }
            for item in &mut o.items {
                if item.dish_id.is_some_and(|d| gone.contains(&d)) {
                    item.dish_id = None;
                }
            }
        }
        Ok(())
    }

    async fn restaurants_page(&self, page: i64) -> Result<Page<Restaurant>> {
        let t = self.inner.lock().await;
        Ok(paged(t.restaurants.values().cloned().collect(), page))
    }

    async fn restaurants_in_category(
        &self,
        category_id: i64,
        page: i64,
    ) -> Result<Page<Restaurant>> {
        let t = self.inner.lock().await;
        let rows = t
            .restaurants
            .values()
            .filter(|r| r.category_id == Some(category_id))
            .cloned()
            .collect();
        Ok(paged(rows, page))
    }

    async fn search_restaurants(&self, query: &str, page: i64) -> Result<Page<Restaurant>> {
        let needle = query.to_lowercase();
        let t = self.inner.lock().await;
        let rows = t
            .restaurants
            .values()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(paged(rows, page))
    }

    async fn restaurants_by_owner(&self, owner_id: i64) -> Result<Vec<Restaurant>> {
        let t = self.inner.lock().await;
        Ok(t.restaurants
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn promote_restaurant(&self, id: i64, until: DateTime<Utc>) -> Result<()> {
        let mut t = self.inner.lock().await;
        if let Some(r) = t.restaurants.get_mut(&id) {
            r.is_promoted = true;
            r.promoted_until = Some(until);
        }
        Ok(())
    }

    async fn clear_expired_promotions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut t = self.inner.lock().await;
        let mut n = 0;
        for r in t.restaurants.values_mut() {
            if r.is_promoted && r.promoted_until.is_some_and(|u| u < now) {
                r.is_promoted = false;
                r.promoted_until = None;
                n += 1;
            }
        }
        Ok(n)
    }

    async fn insert_dish(&self, new: NewDish) -> Result<Dish> {
        let mut t = self.inner.lock().await;
        if !t.restaurants.contains_key(&new.restaurant_id) {
            return Err(anyhow!(
                "insert_dish failed: no restaurant {}",
                new.restaurant_id
            ));
        }
        let d = Dish {
            id: t.id(),
            restaurant_id: new.restaurant_id,
            name: new.name,
            price: new.price,
            photo: new.photo,
            description: new.description,
            options: new.options,
        };
        t.dishes.insert(d.id, d.clone());
        Ok(d)
    }

    async fn dish_by_id(&self, id: i64) -> Result<Option<Dish>> {
        Ok(self.inner.lock().await.dishes.get(&id).cloned())
    }

    async fn update_dish(&self, dish: &Dish) -> Result<Dish> {
        let mut t = self.inner.lock().await;
        let row = t
            .dishes
            .get_mut(&dish.id)
            .ok_or_else(|| anyhow!("update_dish failed: no dish {}", dish.id))?;
        row.name = dish.name.clone();
        row.price = dish.price;
        row.photo = dish.photo.clone();
        row.description = dish.description.clone();
        row.options = dish.options.clone();
        Ok(row.clone())
    }

    async fn delete_dish(&self, id: i64) -> Result<()> {
        let mut t = self.inner.lock().await;
        t.dishes.remove(&id);
        for o in t.orders.values_mut() {
            for item in &mut o.items {
                if item.dish_id == Some(id) {
                    item.dish_id = None;
                }
            }
        }
        Ok(())
    }

    async fn dishes_for_restaurant(&self, restaurant_id: i64) -> Result<Vec<Dish>> {
        let t = self.inner.lock().await;
        Ok(t.dishes
            .values()
            .filter(|d| d.restaurant_id == restaurant_id)
            .cloned()
            .collect())
    }

    async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        let mut t = self.inner.lock().await;
        let now = Utc::now();
        let id = t.id();
        let mut items = Vec::with_capacity(new.items.len());
        for item in new.items {
            items.push(OrderItem {
                id: t.id(),
                dish_id: Some(item.dish_id),
                options: item.options,
            });
        }
        let o = Order {
            id,
            created_at: now,
            updated_at: now,
            customer_id: Some(new.customer_id),
            driver_id: None,
            restaurant_id: Some(new.restaurant_id),
            total: new.total,
            status: OrderStatus::Pending,
            items,
        };
        t.orders.insert(o.id, o.clone());
        Ok(o)
    }

    async fn order_by_id(&self, id: i64) -> Result<Option<Order>> {
        Ok(self.inner.lock().await.orders.get(&id).cloned())
    }

    async fn set_order_status(&self, id: i64, status: OrderStatus) -> Result<Option<Order>> {
        let mut t = self.inner.lock().await;
        Ok(t.orders.get_mut(&id).map(|o| {
            o.status = status;
            o.updated_at = Utc::now();
            o.clone()
        }))
    }

    async fn assign_driver(&self, id: i64, driver_id: i64) -> Result<Option<Order>> {
        let mut t = self.inner.lock().await;
        Ok(t.orders
            .get_mut(&id)
            .filter(|o| o.driver_id.is_none())
            .map(|o| {
                o.driver_id = Some(driver_id);
                o.updated_at = Utc::now();
                o.clone()
            }))
    }

    async fn orders_for(
        &self,
        scope: OrderScope,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let t = self.inner.lock().await;
        let owned: Vec<i64> = match scope {
            OrderScope::Owner(owner) => t
                .restaurants
                .values()
                .filter(|r| r.owner_id == owner)
                .map(|r| r.id)
                .collect(),
            _ => Vec::new(),
        };
        Ok(t.orders
            .values()
            .filter(|o| match scope {
                OrderScope::Customer(id) => o.customer_id == Some(id),
                OrderScope::Driver(id) => o.driver_id == Some(id),
                OrderScope::Owner(_) => o.restaurant_id.is_some_and(|r| owned.contains(&r)),
            })
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect())
    }

    async fn orders_for_restaurant(&self, restaurant_id: i64) -> Result<Vec<Order>> {
        let t = self.inner.lock().await;
        Ok(t.orders
            .values()
            .filter(|o| o.restaurant_id == Some(restaurant_id))
            .cloned()
            .collect())
    }

    async fn insert_payment(&self, new: NewPayment) -> Result<Payment> {
        let mut t = self.inner.lock().await;
        let p = Payment {
            id: t.id(),
            transaction_id: new.transaction_id,
            user_id: new.user_id,
            restaurant_id: new.restaurant_id,
            created_at: Utc::now(),
        };
        t.payments.insert(p.id, p.clone());
        Ok(p)
    }

    async fn payments_for_user(&self, user_id: i64) -> Result<Vec<Payment>> {
        let t = self.inner.lock().await;
        Ok(t.payments
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}
