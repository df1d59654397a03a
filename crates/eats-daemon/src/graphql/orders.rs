use async_graphql::{Context, InputObject, Object, Result, SimpleObject};
use eats_schemas::{OrderItemOption, OrderStatus};
use eats_service::CreateOrderItem;

use super::guard::{AllowedRole, RoleGuard};
use super::objects::OrderObject;
use super::{failure, services, viewer, CoreOutput};

#[derive(InputObject)]
pub struct CreateOrderItemInput {
    pub dish_id: i64,
    #[graphql(default)]
    pub options: Vec<OrderItemOption>,
}

#[derive(InputObject)]
pub struct CreateOrderInput {
    pub restaurant_id: i64,
    pub items: Vec<CreateOrderItemInput>,
}

#[derive(InputObject)]
pub struct GetOrdersInput {
    pub status: Option<OrderStatus>,
}

#[derive(InputObject)]
pub struct OrderIdInput {
    pub id: i64,
}

#[derive(InputObject)]
pub struct EditOrderInput {
    pub id: i64,
    pub status: OrderStatus,
}

#[derive(SimpleObject, Default)]
pub struct CreateOrderOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub order_id: Option<i64>,
}

#[derive(SimpleObject, Default)]
pub struct GetOrdersOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub orders: Option<Vec<OrderObject>>,
}

#[derive(SimpleObject, Default)]
pub struct GetOrderOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub order: Option<OrderObject>,
}

#[derive(Default)]
pub struct OrderQuery;

#[Object]
impl OrderQuery {
    #[graphql(guard = "RoleGuard::new(AllowedRole::Any)")]
    async fn get_orders(&self, ctx: &Context<'_>, input: GetOrdersInput) -> Result<GetOrdersOutput> {
        let me = viewer(ctx)?;
        Ok(match services(ctx).orders.get_orders(me, input.status).await {
            Ok(orders) => GetOrdersOutput {
                ok: true,
                orders: Some(orders.into_iter().map(OrderObject).collect()),
                ..Default::default()
            },
            Err(e) => GetOrdersOutput {
                error: Some(failure(e)),
                ..Default::default()
            },
        })
    }

    #[graphql(guard = "RoleGuard::new(AllowedRole::Any)")]
    async fn get_order(&self, ctx: &Context<'_>, input: OrderIdInput) -> Result<GetOrderOutput> {
        let me = viewer(ctx)?;
        Ok(match services(ctx).orders.get_order(me, input.id).await {
            Ok(order) => GetOrderOutput {
                ok: true,
                order: Some(OrderObject(order)),
                ..Default::default()
            },
            Err(e) => GetOrderOutput {
                error: Some(failure(e)),
                ..Default::default()
            },
        })
    }
}

#[derive(Default)]
pub struct OrderMutation;

#[Object]
impl OrderMutation {
    #[graphql(guard = "RoleGuard::new(AllowedRole::Client)")]
    async fn create_order(
        &self,
        ctx: &Context<'_>,
        input: CreateOrderInput,
    ) -> Result<CreateOrderOutput> {
        let me = viewer(ctx)?;
        let items = input
            .items
            .into_iter()
            .map(|i| CreateOrderItem {
                dish_id: i.dish_id,
                options: i.options,
            })
            .collect();
        Ok(
            match services(ctx)
                .orders
                .create_order(me, input.restaurant_id, items)
                .await
            {
                Ok(order) => CreateOrderOutput {
                    ok: true,
                    order_id: Some(order.id),
                    ..Default::default()
                },
                Err(e) => CreateOrderOutput {
                    error: Some(failure(e)),
                    ..Default::default()
                },
            },
        )
    }

    #[graphql(guard = "RoleGuard::new(AllowedRole::Any)")]
    async fn edit_order(&self, ctx: &Context<'_>, input: EditOrderInput) -> Result<CoreOutput> {
        let me = viewer(ctx)?;
        Ok(CoreOutput::from_result(
            services(ctx)
                .orders
                .edit_order(me, input.id, input.status)
                .await,
        ))
    }

    #[graphql(guard = "RoleGuard::new(AllowedRole::Delivery)")]
    async fn take_order(&self, ctx: &Context<'_>, input: OrderIdInput) -> Result<CoreOutput> {
        let me = viewer(ctx)?;
        Ok(CoreOutput::from_result(
            services(ctx).orders.take_order(me, input.id).await,
        ))
    }
}
