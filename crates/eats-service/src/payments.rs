use std::sync::Arc;

use chrono::{Duration, Utc};
use eats_db::{NewPayment, Store};
use eats_schemas::{Payment, User};
use tracing::info;

use crate::error::{ServiceError, ServiceResult};

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn Store>,
    promotion_days: i64,
}

impl PaymentService {
    pub fn new(store: Arc<dyn Store>, promotion_days: i64) -> Self {
        Self {
            store,
            promotion_days,
        }
    }

    /// Records the payment and promotes the restaurant for `promotion_days`
    /// from now. Paying again restarts the window.
    pub async fn create_payment(
        &self,
        owner: &User,
        transaction_id: &str,
        restaurant_id: i64,
    ) -> ServiceResult<Payment> {
        let restaurant = self
            .store
            .restaurant_by_id(restaurant_id)
            .await?
            .ok_or(ServiceError::RestaurantNotFound)?;
        if restaurant.owner_id != owner.id {
            return Err(ServiceError::NotOwner);
        }

        let payment = self
            .store
            .insert_payment(NewPayment {
                transaction_id: transaction_id.to_string(),
                user_id: owner.id,
                restaurant_id,
            })
            .await?;

        let until = Utc::now() + Duration::days(self.promotion_days);
        self.store.promote_restaurant(restaurant_id, until).await?;

        info!(
            payment_id = payment.id,
            restaurant_id,
            promoted_until = %until,
            "restaurant promoted"
        );
        Ok(payment)
    }

    pub async fn get_payments(&self, owner: &User) -> ServiceResult<Vec<Payment>> {
        Ok(self.store.payments_for_user(owner.id).await?)
    }
}
