//! Order subscriptions over the in-process [`OrderBus`].
//!
//! Each subscription owns its own broadcast receiver. Lagged receivers skip
//! the events they missed.

use async_graphql::{Context, InputObject, Result, Subscription};
use eats_orders::is_participant;
use eats_schemas::Order;
use eats_service::{OrderBus, OrderEvent};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use super::guard::{AllowedRole, RoleGuard};
use super::objects::OrderObject;
use super::{failure, services, viewer};

#[derive(InputObject)]
pub struct OrderUpdatesInput {
    pub id: i64,
}

#[derive(Default)]
pub struct OrderSubscription;

#[Subscription]
impl OrderSubscription {
    /// New orders for restaurants the caller owns.
    #[graphql(guard = "RoleGuard::new(AllowedRole::Owner)")]
    async fn pending_orders(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = OrderObject>> {
        let me = viewer(ctx)?.id;
        Ok(order_events(&services(ctx).bus, move |ev| match ev {
            OrderEvent::Pending { order, owner_id } if owner_id == me => Some(order),
            _ => None,
        }))
    }

    /// Every order an owner marks as cooked.
    #[graphql(guard = "RoleGuard::new(AllowedRole::Delivery)")]
    async fn cooked_orders(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = OrderObject>> {
        viewer(ctx)?;
        Ok(order_events(&services(ctx).bus, |ev| match ev {
            OrderEvent::Cooked { order } => Some(order),
            _ => None,
        }))
    }

    /// Changes to one order, for its customer, driver and restaurant owner.
    #[graphql(guard = "RoleGuard::new(AllowedRole::Any)")]
    async fn order_updates(
        &self,
        ctx: &Context<'_>,
        input: OrderUpdatesInput,
    ) -> Result<impl Stream<Item = OrderObject>> {
        let me = viewer(ctx)?;
        let svc = services(ctx);
        // Subscribe before the lookup so no update slips between the two.
        let rx = svc.bus.subscribe();
        svc.orders
            .get_order(me, input.id)
            .await
            .map_err(|e| async_graphql::Error::new(failure(e)))?;

        let (me, order_id) = (me.id, input.id);
        Ok(
            BroadcastStream::new(rx).filter_map(move |msg| async move {
                match msg.ok()? {
                    OrderEvent::Updated { order, owner_id }
                        if order.id == order_id && is_participant(me, &order, owner_id) =>
                    {
                        Some(OrderObject(order))
                    }
                    _ => None,
                }
            }),
        )
    }
}

fn order_events<F>(bus: &OrderBus, pick: F) -> impl Stream<Item = OrderObject>
where
    F: Fn(OrderEvent) -> Option<Order> + Clone + Send + Sync + 'static,
{
    BroadcastStream::new(bus.subscribe()).filter_map(move |msg| {
        let pick = pick.clone();
        async move { msg.ok().and_then(pick).map(OrderObject) }
    })
}
