//! Application services for the eats backend.
//!
//! Each service owns an `Arc<dyn Store>` and returns [`ServiceError`] for
//! anything a client can act on. The GraphQL layer turns those into
//! `{ ok, error }` outputs; nothing here knows about HTTP or GraphQL.

use std::sync::Arc;

use eats_auth::JwtService;
use eats_db::Store;

pub mod bus;
pub mod error;
pub mod mailer;
pub mod orders;
pub mod payments;
pub mod promotion;
pub mod restaurants;
pub mod users;

pub use bus::{OrderBus, OrderEvent};
pub use error::{ServiceError, ServiceResult};
pub use mailer::{Mailer, RecordingMailer, TracingMailer};
pub use orders::{CreateOrderItem, OrderService};
pub use payments::PaymentService;
pub use promotion::sweep_promotions;
pub use restaurants::{CreateDish, CreateRestaurant, EditDish, EditRestaurant, RestaurantService};
pub use users::UserService;

/// Every service wired to one store and one order bus.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn Store>,
    pub bus: OrderBus,
    pub users: UserService,
    pub restaurants: RestaurantService,
    pub orders: OrderService,
    pub payments: PaymentService,
}

impl Services {
    pub fn new(
        store: Arc<dyn Store>,
        jwt: JwtService,
        mailer: Arc<dyn Mailer>,
        promotion_days: i64,
    ) -> Self {
        let bus = OrderBus::default();
        Self {
            users: UserService::new(store.clone(), jwt, mailer),
            restaurants: RestaurantService::new(store.clone()),
            orders: OrderService::new(store.clone(), bus.clone()),
            payments: PaymentService::new(store.clone(), promotion_days),
            bus,
            store,
        }
    }
}
