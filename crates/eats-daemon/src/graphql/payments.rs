use async_graphql::{Context, InputObject, Object, Result, SimpleObject};

use super::guard::{AllowedRole, RoleGuard};
use super::objects::PaymentObject;
use super::{failure, services, viewer, CoreOutput};

#[derive(InputObject)]
pub struct CreatePaymentInput {
    pub transaction_id: String,
    pub restaurant_id: i64,
}

#[derive(SimpleObject, Default)]
pub struct GetPaymentsOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub payments: Option<Vec<PaymentObject>>,
}

#[derive(Default)]
pub struct PaymentQuery;

#[Object]
impl PaymentQuery {
    #[graphql(guard = "RoleGuard::new(AllowedRole::Owner)")]
    async fn get_payments(&self, ctx: &Context<'_>) -> Result<GetPaymentsOutput> {
        let me = viewer(ctx)?;
        Ok(match services(ctx).payments.get_payments(me).await {
            Ok(ps) => GetPaymentsOutput {
                ok: true,
                payments: Some(ps.into_iter().map(PaymentObject).collect()),
                ..Default::default()
            },
            Err(e) => GetPaymentsOutput {
                error: Some(failure(e)),
                ..Default::default()
            },
        })
    }
}

#[derive(Default)]
pub struct PaymentMutation;

#[Object]
impl PaymentMutation {
    /// Records the payment and promotes the restaurant.
    #[graphql(guard = "RoleGuard::new(AllowedRole::Owner)")]
    async fn create_payment(
        &self,
        ctx: &Context<'_>,
        input: CreatePaymentInput,
    ) -> Result<CoreOutput> {
        let me = viewer(ctx)?;
        Ok(CoreOutput::from_result(
            services(ctx)
                .payments
                .create_payment(me, &input.transaction_id, input.restaurant_id)
                .await,
        ))
    }
}
