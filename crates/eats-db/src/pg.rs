use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eats_schemas::{
    normalize_category_name, page_offset, slugify, Category, Dish, DishOption, Order, OrderItem,
    OrderItemOption, OrderStatus, Page, Payment, Restaurant, User, UserRole, Verification,
    PAGE_SIZE,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::like_pattern;
use crate::store::{
    EmailTaken, NewDish, NewOrder, NewPayment, NewRestaurant, NewUser, OrderScope, Store,
};

const USER_COLS: &str = "id, created_at, updated_at, email, password_hash, role, verified";
const RESTAURANT_COLS: &str =
    "id, name, cover_image, address, category_id, owner_id, is_promoted, promoted_until";
const DISH_COLS: &str = "id, restaurant_id, name, price, photo, description, options";
const ORDER_COLS: &str =
    "id, created_at, updated_at, customer_id, driver_id, restaurant_id, total, status";
const PAYMENT_COLS: &str = "id, transaction_id, user_id, restaurant_id, created_at";

/// Postgres-backed [`Store`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Loads the items of every order in `rows` with one query.
    async fn with_items(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let mut orders = rows.iter().map(order_from_row).collect::<Result<Vec<_>>>()?;
        if orders.is_empty() {
            return Ok(orders);
        }
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();

        let item_rows = sqlx::query(
            r#"
            select id, order_id, dish_id, options
            from order_items
            where order_id = any($1)
            order by id asc
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .context("load order_items failed")?;

        for row in item_rows {
            let order_id: i64 = row.try_get("order_id")?;
            let Json(options): Json<Vec<OrderItemOption>> = row.try_get("options")?;
            let item = OrderItem {
                id: row.try_get("id")?,
                dish_id: row.try_get("dish_id")?,
                options,
            };
            if let Some(o) = orders.iter_mut().find(|o| o.id == order_id) {
                o.items.push(item);
            }
        }
        Ok(orders)
    }

    async fn restaurant_page_where(
        &self,
        filter: &str,
        arg: RestaurantFilterArg<'_>,
        page: i64,
    ) -> Result<Page<Restaurant>> {
        let count_sql = format!("select count(*)::bigint from restaurants where {filter}");
        let rows_sql = format!(
            "select {RESTAURANT_COLS} from restaurants where {filter} \
             order by is_promoted desc, id asc limit $2 offset $3"
        );

        let count_q = sqlx::query_as::<_, (i64,)>(&count_sql);
        let rows_q = sqlx::query(&rows_sql);
        let (count_q, rows_q) = match arg {
            RestaurantFilterArg::None => (count_q.bind(None::<i64>), rows_q.bind(None::<i64>)),
            RestaurantFilterArg::Id(id) => (count_q.bind(id), rows_q.bind(id)),
            RestaurantFilterArg::Text(t) => (count_q.bind(t), rows_q.bind(t)),
        };

        let (total_results,) = count_q
            .fetch_one(&self.pool)
            .await
            .context("count restaurants failed")?;
        let rows = rows_q
            .bind(PAGE_SIZE)
            .bind(page_offset(page))
            .fetch_all(&self.pool)
            .await
            .context("page restaurants failed")?;

        Ok(Page {
            items: rows.iter().map(restaurant_from_row).collect::<Result<_>>()?,
            total_results,
        })
    }
}

/// The single `$1` bound into a restaurant listing filter.
enum RestaurantFilterArg<'a> {
    None,
    Id(i64),
    Text(&'a str),
}

#[async_trait]
impl Store for PgStore {
    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    async fn insert_user(&self, new: NewUser) -> Result<User> {
        let res = sqlx::query(&format!(
            "insert into users (email, password_hash, role) values ($1, $2, $3) \
             returning {USER_COLS}"
        ))
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => user_from_row(&row),
            Err(e) => {
                if is_unique_constraint_violation(&e, "uq_users_email") {
                    return Err(EmailTaken.into());
                }
                Err(anyhow::Error::new(e).context("insert_user failed"))
            }
        }
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("select {USER_COLS} from users where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("user_by_id failed")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("select {USER_COLS} from users where email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("user_by_email failed")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let res = sqlx::query(&format!(
            r#"
            update users
            set email = $2, password_hash = $3, verified = $4, updated_at = now()
            where id = $1
            returning {USER_COLS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.verified)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => user_from_row(&row),
            Err(e) => {
                if is_unique_constraint_violation(&e, "uq_users_email") {
                    return Err(EmailTaken.into());
                }
                Err(anyhow::Error::new(e).context("update_user failed"))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Verifications
    // -----------------------------------------------------------------------

    async fn replace_verification(&self, user_id: i64, code: &str) -> Result<Verification> {
        let mut tx = self.pool.begin().await.context("begin tx failed")?;

        sqlx::query("delete from verifications where user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("delete old verification failed")?;

        let row = sqlx::query(
            "insert into verifications (code, user_id) values ($1, $2) returning id, code, user_id",
        )
        .bind(code)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .context("insert verification failed")?;

        tx.commit().await.context("commit verification failed")?;
        verification_from_row(&row)
    }

    async fn verification_by_code(&self, code: &str) -> Result<Option<Verification>> {
        let row = sqlx::query("select id, code, user_id from verifications where code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .context("verification_by_code failed")?;
        row.as_ref().map(verification_from_row).transpose()
    }

    async fn delete_verification(&self, id: i64) -> Result<()> {
        sqlx::query("delete from verifications where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete_verification failed")?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    async fn get_or_create_category(&self, name: &str) -> Result<Category> {
        // The no-op update makes `returning` yield the existing row on conflict.
        let row = sqlx::query(
            r#"
            insert into categories (name, slug) values ($1, $2)
            on conflict (slug) do update set slug = excluded.slug
            returning id, name, slug, cover_image
            "#,
        )
        .bind(normalize_category_name(name))
        .bind(slugify(name))
        .fetch_one(&self.pool)
        .await
        .context("get_or_create_category failed")?;
        category_from_row(&row)
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("select id, name, slug, cover_image from categories order by id")
            .fetch_all(&self.pool)
            .await
            .context("categories failed")?;
        rows.iter().map(category_from_row).collect()
    }

    async fn category_by_id(&self, id: i64) -> Result<Option<Category>> {
        let row = sqlx::query("select id, name, slug, cover_image from categories where id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("category_by_id failed")?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let row =
            sqlx::query("select id, name, slug, cover_image from categories where slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
                .context("category_by_slug failed")?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn count_restaurants_in_category(&self, category_id: i64) -> Result<i64> {
        let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
            "select count(*)::bigint from restaurants where category_id = $1",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .context("count_restaurants_in_category failed")?;
        Ok(n)
    }

    // -----------------------------------------------------------------------
    // Restaurants
    // -----------------------------------------------------------------------

    async fn insert_restaurant(&self, new: NewRestaurant) -> Result<Restaurant> {
        let row = sqlx::query(&format!(
            r#"
            insert into restaurants (name, cover_image, address, category_id, owner_id)
            values ($1, $2, $3, $4, $5)
            returning {RESTAURANT_COLS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.cover_image)
        .bind(&new.address)
        .bind(new.category_id)
        .bind(new.owner_id)
        .fetch_one(&self.pool)
        .await
        .context("insert_restaurant failed")?;
        restaurant_from_row(&row)
    }

    async fn restaurant_by_id(&self, id: i64) -> Result<Option<Restaurant>> {
        let row = sqlx::query(&format!(
            "select {RESTAURANT_COLS} from restaurants where id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("restaurant_by_id failed")?;
        row.as_ref().map(restaurant_from_row).transpose()
    }

    async fn update_restaurant(&self, r: &Restaurant) -> Result<Restaurant> {
        let row = sqlx::query(&format!(
            r#"
            update restaurants
            set name = $2, cover_image = $3, address = $4, category_id = $5, updated_at = now()
            where id = $1
            returning {RESTAURANT_COLS}
            "#
        ))
        .bind(r.id)
        .bind(&r.name)
        .bind(&r.cover_image)
        .bind(&r.address)
        .bind(r.category_id)
        .fetch_one(&self.pool)
        .await
        .context("update_restaurant failed")?;
        restaurant_from_row(&row)
    }

    async fn delete_restaurant(&self, id: i64) -> Result<()> {
        sqlx::query("delete from restaurants where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete_restaurant failed")?;
        Ok(())
    }

    async fn restaurants_page(&self, page: i64) -> Result<Page<Restaurant>> {
        self.restaurant_page_where("($1::bigint is null)", RestaurantFilterArg::None, page)
            .await
    }

    async fn restaurants_in_category(
        &self,
        category_id: i64,
        page: i64,
    ) -> Result<Page<Restaurant>> {
        self.restaurant_page_where("category_id = $1", RestaurantFilterArg::Id(category_id), page)
            .await
    }

    async fn search_restaurants(&self, query: &str, page: i64) -> Result<Page<Restaurant>> {
        let pattern = like_pattern(query);
        self.restaurant_page_where(
            r"name ilike $1 escape '\'",
            RestaurantFilterArg::Text(&pattern),
            page,
        )
        .await
    }

    async fn restaurants_by_owner(&self, owner_id: i64) -> Result<Vec<Restaurant>> {
        let rows = sqlx::query(&format!(
            "select {RESTAURANT_COLS} from restaurants where owner_id = $1 order by id asc"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .context("restaurants_by_owner failed")?;
        rows.iter().map(restaurant_from_row).collect()
    }

    async fn promote_restaurant(&self, id: i64, until: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            update restaurants
            set is_promoted = true, promoted_until = $2, updated_at = now()
            where id = $1
            "#,
        )
        .bind(id)
        .bind(until)
        .execute(&self.pool)
        .await
        .context("promote_restaurant failed")?;
        Ok(())
    }

    async fn clear_expired_promotions(&self, now: DateTime<Utc>) -> Result<u64> {
        let res = sqlx::query(
            r#"
            update restaurants
            set is_promoted = false, promoted_until = null, updated_at = now()
            where is_promoted = true
              and promoted_until < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .context("clear_expired_promotions failed")?;
        Ok(res.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Dishes
    // -----------------------------------------------------------------------

    async fn insert_dish(&self, new: NewDish) -> Result<Dish> {
        let row = sqlx::query(&format!(
            r#"
            insert into dishes (restaurant_id, name, price, photo, description, options)
            values ($1, $2, $3, $4, $5, $6)
            returning {DISH_COLS}
            "#
        ))
        .bind(new.restaurant_id)
        .bind(&new.name)
        .bind(new.price)
        .bind(&new.photo)
        .bind(&new.description)
        .bind(Json(&new.options))
        .fetch_one(&self.pool)
        .await
        .context("insert_dish failed")?;
        dish_from_row(&row)
    }

    async fn dish_by_id(&self, id: i64) -> Result<Option<Dish>> {
        let row = sqlx::query(&format!("select {DISH_COLS} from dishes where id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("dish_by_id failed")?;
        row.as_ref().map(dish_from_row).transpose()
    }

    async fn update_dish(&self, dish: &Dish) -> Result<Dish> {
        let row = sqlx::query(&format!(
            r#"
            update dishes
            set name = $2, price = $3, photo = $4, description = $5, options = $6
            where id = $1
            returning {DISH_COLS}
            "#
        ))
        .bind(dish.id)
        .bind(&dish.name)
        .bind(dish.price)
        .bind(&dish.photo)
        .bind(&dish.description)
        .bind(Json(&dish.options))
        .fetch_one(&self.pool)
        .await
        .context("update_dish failed")?;
        dish_from_row(&row)
    }

    async fn delete_dish(&self, id: i64) -> Result<()> {
        sqlx::query("delete from dishes where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete_dish failed")?;
        Ok(())
    }

    async fn dishes_for_restaurant(&self, restaurant_id: i64) -> Result<Vec<Dish>> {
        let rows = sqlx::query(&format!(
            "select {DISH_COLS} from dishes where restaurant_id = $1 order by id asc"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await
        .context("dishes_for_restaurant failed")?;
        rows.iter().map(dish_from_row).collect()
    }

    // -----------------------------------------------------------------------
    // Orders
    // -----------------------------------------------------------------------

    async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await.context("begin tx failed")?;

        let row = sqlx::query(&format!(
            r#"
            insert into orders (customer_id, restaurant_id, total, status)
            values ($1, $2, $3, $4)
            returning {ORDER_COLS}
            "#
        ))
        .bind(new.customer_id)
        .bind(new.restaurant_id)
        .bind(new.total)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await
        .context("insert order failed")?;
        let mut order = order_from_row(&row)?;

        for item in &new.items {
            let (id,): (i64,) = sqlx::query_as::<_, (i64,)>(
                "insert into order_items (order_id, dish_id, options) values ($1, $2, $3) returning id",
            )
            .bind(order.id)
            .bind(item.dish_id)
            .bind(Json(&item.options))
            .fetch_one(&mut *tx)
            .await
            .context("insert order_item failed")?;

            order.items.push(OrderItem {
                id,
                dish_id: Some(item.dish_id),
                options: item.options.clone(),
            });
        }

        tx.commit().await.context("commit order failed")?;
        Ok(order)
    }

    async fn order_by_id(&self, id: i64) -> Result<Option<Order>> {
        let rows = sqlx::query(&format!("select {ORDER_COLS} from orders where id = $1"))
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .context("order_by_id failed")?;
        Ok(self.with_items(rows).await?.into_iter().next())
    }

    async fn set_order_status(&self, id: i64, status: OrderStatus) -> Result<Option<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            update orders
            set status = $2, updated_at = now()
            where id = $1
            returning {ORDER_COLS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .context("set_order_status failed")?;
        Ok(self.with_items(rows).await?.into_iter().next())
    }

    async fn assign_driver(&self, id: i64, driver_id: i64) -> Result<Option<Order>> {
        // Conditional on `driver_id is null`: concurrent takers race in the
        // database and exactly one sees a row come back.
        let rows = sqlx::query(&format!(
            r#"
            update orders
            set driver_id = $2, updated_at = now()
            where id = $1
              and driver_id is null
            returning {ORDER_COLS}
            "#
        ))
        .bind(id)
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await
        .context("assign_driver failed")?;
        Ok(self.with_items(rows).await?.into_iter().next())
    }

    async fn orders_for(
        &self,
        scope: OrderScope,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let (filter, user_id) = match scope {
            OrderScope::Customer(id) => ("customer_id = $1", id),
            OrderScope::Driver(id) => ("driver_id = $1", id),
            OrderScope::Owner(id) => (
                "restaurant_id in (select id from restaurants where owner_id = $1)",
                id,
            ),
        };
        let sql = format!(
            "select {ORDER_COLS} from orders where {filter} \
             and ($2::text is null or status = $2) order by id asc"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .context("orders_for failed")?;
        self.with_items(rows).await
    }

    async fn orders_for_restaurant(&self, restaurant_id: i64) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "select {ORDER_COLS} from orders where restaurant_id = $1 order by id asc"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await
        .context("orders_for_restaurant failed")?;
        self.with_items(rows).await
    }

    // -----------------------------------------------------------------------
    // Payments
    // -----------------------------------------------------------------------

    async fn insert_payment(&self, new: NewPayment) -> Result<Payment> {
        let row = sqlx::query(&format!(
            r#"
            insert into payments (transaction_id, user_id, restaurant_id)
            values ($1, $2, $3)
            returning {PAYMENT_COLS}
            "#
        ))
        .bind(&new.transaction_id)
        .bind(new.user_id)
        .bind(new.restaurant_id)
        .fetch_one(&self.pool)
        .await
        .context("insert_payment failed")?;
        payment_from_row(&row)
    }

    async fn payments_for_user(&self, user_id: i64) -> Result<Vec<Payment>> {
        let rows = sqlx::query(&format!(
            "select {PAYMENT_COLS} from payments where user_id = $1 order by id asc"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("payments_for_user failed")?;
        rows.iter().map(payment_from_row).collect()
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: UserRole::parse(&role).ok_or_else(|| anyhow!("invalid user role in db: {role}"))?,
        verified: row.try_get("verified")?,
    })
}

fn verification_from_row(row: &PgRow) -> Result<Verification> {
    Ok(Verification {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        user_id: row.try_get("user_id")?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        cover_image: row.try_get("cover_image")?,
    })
}

fn restaurant_from_row(row: &PgRow) -> Result<Restaurant> {
    Ok(Restaurant {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        cover_image: row.try_get("cover_image")?,
        address: row.try_get("address")?,
        category_id: row.try_get("category_id")?,
        owner_id: row.try_get("owner_id")?,
        is_promoted: row.try_get("is_promoted")?,
        promoted_until: row.try_get("promoted_until")?,
    })
}

fn dish_from_row(row: &PgRow) -> Result<Dish> {
    let Json(options): Json<Vec<DishOption>> = row.try_get("options")?;
    Ok(Dish {
        id: row.try_get("id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        photo: row.try_get("photo")?,
        description: row.try_get("description")?,
        options,
    })
}

/// Order without items; see [`PgStore::with_items`].
fn order_from_row(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        customer_id: row.try_get("customer_id")?,
        driver_id: row.try_get("driver_id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        total: row.try_get("total")?,
        status: OrderStatus::parse(&status)
            .ok_or_else(|| anyhow!("invalid order status in db: {status}"))?,
        items: Vec::new(),
    })
}

fn payment_from_row(row: &PgRow) -> Result<Payment> {
    Ok(Payment {
        id: row.try_get("id")?,
        transaction_id: row.try_get("transaction_id")?,
        user_id: row.try_get("user_id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Detect a Postgres unique constraint violation by name.
fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
