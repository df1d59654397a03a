//! In-process order event bus.
//!
//! A thin wrapper over `tokio::sync::broadcast`. Publishing with no
//! subscribers is a no-op, and a receiver that falls behind by more than the
//! channel capacity loses the oldest events (`RecvError::Lagged`).

use eats_schemas::Order;
use tokio::sync::broadcast;

/// Default channel capacity.
pub const ORDER_BUS_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
pub enum OrderEvent {
    /// A client placed an order; `owner_id` owns the restaurant.
    Pending { order: Order, owner_id: i64 },
    /// An owner marked an order `Cooked`.
    Cooked { order: Order },
    /// Status changed or a driver took the order.
    Updated { order: Order, owner_id: Option<i64> },
}

impl OrderEvent {
    pub fn order(&self) -> &Order {
        match self {
            OrderEvent::Pending { order, .. }
            | OrderEvent::Cooked { order }
            | OrderEvent::Updated { order, .. } => order,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OrderBus {
    tx: broadcast::Sender<OrderEvent>,
}

impl Default for OrderBus {
    fn default() -> Self {
        Self::new(ORDER_BUS_CAPACITY)
    }
}

impl OrderBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: OrderEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.tx.subscribe()
    }
}
