use async_graphql::{Context, InputObject, Object, Result, SimpleObject};
use eats_schemas::UserRole;

use super::guard::{AllowedRole, RoleGuard};
use super::objects::UserObject;
use super::{failure, services, viewer, CoreOutput};

#[derive(InputObject)]
pub struct CreateAccountInput {
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(InputObject)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(InputObject)]
pub struct EditProfileInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(InputObject)]
pub struct VerifyEmailInput {
    pub code: String,
}

#[derive(SimpleObject, Default)]
pub struct LoginOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub token: Option<String>,
}

#[derive(SimpleObject, Default)]
pub struct UserProfileOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub user: Option<UserObject>,
}

#[derive(Default)]
pub struct UserQuery;

#[Object]
impl UserQuery {
    #[graphql(guard = "RoleGuard::new(AllowedRole::Any)")]
    async fn me(&self, ctx: &Context<'_>) -> Result<UserObject> {
        Ok(UserObject(viewer(ctx)?.clone()))
    }

    #[graphql(guard = "RoleGuard::new(AllowedRole::Any)")]
    async fn user_profile(&self, ctx: &Context<'_>, user_id: i64) -> UserProfileOutput {
        match services(ctx).users.user_profile(user_id).await {
            Ok(user) => UserProfileOutput {
                ok: true,
                user: Some(UserObject(user)),
                ..Default::default()
            },
            Err(e) => UserProfileOutput {
                error: Some(failure(e)),
                ..Default::default()
            },
        }
    }
}

#[derive(Default)]
pub struct UserMutation;

#[Object]
impl UserMutation {
    async fn create_account(&self, ctx: &Context<'_>, input: CreateAccountInput) -> CoreOutput {
        CoreOutput::from_result(
            services(ctx)
                .users
                .create_account(&input.email, &input.password, input.role)
                .await,
        )
    }

    async fn login(&self, ctx: &Context<'_>, input: LoginInput) -> LoginOutput {
        match services(ctx).users.login(&input.email, &input.password).await {
            Ok(token) => LoginOutput {
                ok: true,
                token: Some(token),
                ..Default::default()
            },
            Err(e) => LoginOutput {
                error: Some(failure(e)),
                ..Default::default()
            },
        }
    }

    #[graphql(guard = "RoleGuard::new(AllowedRole::Any)")]
    async fn edit_profile(&self, ctx: &Context<'_>, input: EditProfileInput) -> Result<CoreOutput> {
        let me = viewer(ctx)?;
        Ok(CoreOutput::from_result(
            services(ctx)
                .users
                .edit_profile(me.id, input.email.as_deref(), input.password.as_deref())
                .await,
        ))
    }

    async fn verify_email(&self, ctx: &Context<'_>, input: VerifyEmailInput) -> CoreOutput {
        CoreOutput::from_result(services(ctx).users.verify_email(&input.code).await)
    }
}
