use async_graphql::{Context, InputObject, Object, Result, SimpleObject};
use eats_schemas::{DishOption, Page, Restaurant};
use eats_service::{CreateDish, CreateRestaurant, EditDish, EditRestaurant, ServiceError};

use super::guard::{AllowedRole, RoleGuard};
use super::objects::{CategoryObject, RestaurantObject};
use super::{failure, services, viewer, CoreOutput, PaginationInput};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(InputObject)]
pub struct CreateRestaurantInput {
    pub name: String,
    pub cover_image: String,
    pub address: String,
    pub category_name: String,
}

#[derive(InputObject)]
pub struct EditRestaurantInput {
    pub restaurant_id: i64,
    pub name: Option<String>,
    pub cover_image: Option<String>,
    pub address: Option<String>,
    pub category_name: Option<String>,
}

#[derive(InputObject)]
pub struct RestaurantIdInput {
    pub restaurant_id: i64,
}

#[derive(InputObject)]
pub struct CategoryInput {
    pub slug: String,
    #[graphql(default = 1)]
    pub page: i64,
}

#[derive(InputObject)]
pub struct SearchRestaurantInput {
    pub query: String,
    #[graphql(default = 1)]
    pub page: i64,
}

#[derive(InputObject)]
pub struct CreateDishInput {
    pub restaurant_id: i64,
    pub name: String,
    pub price: i32,
    pub description: String,
    #[graphql(default)]
    pub options: Vec<DishOption>,
    pub photo: Option<String>,
}

#[derive(InputObject)]
pub struct EditDishInput {
    pub dish_id: i64,
    pub name: Option<String>,
    pub price: Option<i32>,
    pub description: Option<String>,
    pub options: Option<Vec<DishOption>>,
    pub photo: Option<String>,
}

#[derive(InputObject)]
pub struct DishIdInput {
    pub dish_id: i64,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[derive(SimpleObject, Default)]
pub struct CreateRestaurantOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub restaurant_id: Option<i64>,
}

#[derive(SimpleObject, Default)]
pub struct RestaurantOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub restaurant: Option<RestaurantObject>,
}

#[derive(SimpleObject, Default)]
pub struct MyRestaurantsOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub restaurants: Option<Vec<RestaurantObject>>,
}

#[derive(SimpleObject, Default)]
pub struct AllCategoriesOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub categories: Option<Vec<CategoryObject>>,
}

#[derive(SimpleObject, Default)]
pub struct CategoryOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub category: Option<CategoryObject>,
    pub restaurants: Option<Vec<RestaurantObject>>,
    pub total_pages: Option<i64>,
    pub total_results: Option<i64>,
}

/// One page of restaurants. Used by both `restaurants` and
/// `searchRestaurant`.
#[derive(SimpleObject, Default)]
pub struct RestaurantsOutput {
    pub ok: bool,
    pub error: Option<String>,
    pub results: Option<Vec<RestaurantObject>>,
    pub total_pages: Option<i64>,
    pub total_results: Option<i64>,
}

impl RestaurantsOutput {
    fn from_page(res: Result<Page<Restaurant>, ServiceError>) -> Self {
        match res {
            Ok(page) => Self {
                ok: true,
                total_pages: Some(page.total_pages()),
                total_results: Some(page.total_results),
                results: Some(page.items.into_iter().map(RestaurantObject).collect()),
                ..Default::default()
            },
            Err(e) => Self {
                error: Some(failure(e)),
                ..Default::default()
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RestaurantQuery;

#[Object]
impl RestaurantQuery {
    #[graphql(guard = "RoleGuard::new(AllowedRole::Owner)")]
    async fn my_restaurants(&self, ctx: &Context<'_>) -> Result<MyRestaurantsOutput> {
        let me = viewer(ctx)?;
        Ok(match services(ctx).restaurants.my_restaurants(me).await {
            Ok(rs) => MyRestaurantsOutput {
                ok: true,
                restaurants: Some(rs.into_iter().map(RestaurantObject).collect()),
                ..Default::default()
            },
            Err(e) => MyRestaurantsOutput {
                error: Some(failure(e)),
                ..Default::default()
            },
        })
    }

    #[graphql(guard = "RoleGuard::new(AllowedRole::Owner)")]
    async fn my_restaurant(
        &self,
        ctx: &Context<'_>,
        input: RestaurantIdInput,
    ) -> Result<RestaurantOutput> {
        let me = viewer(ctx)?;
        let res = services(ctx)
            .restaurants
            .my_restaurant(me, input.restaurant_id)
            .await;
        Ok(restaurant_output(res))
    }

    async fn all_categories(&self, ctx: &Context<'_>) -> AllCategoriesOutput {
        match services(ctx).restaurants.all_categories().await {
            Ok(cats) => AllCategoriesOutput {
                ok: true,
                categories: Some(cats.into_iter().map(CategoryObject).collect()),
                ..Default::default()
            },
            Err(e) => AllCategoriesOutput {
                error: Some(failure(e)),
                ..Default::default()
            },
        }
    }

    async fn category(&self, ctx: &Context<'_>, input: CategoryInput) -> CategoryOutput {
        match services(ctx)
            .restaurants
            .category(&input.slug, input.page)
            .await
        {
            Ok((cat, page)) => CategoryOutput {
                ok: true,
                category: Some(CategoryObject(cat)),
                total_pages: Some(page.total_pages()),
                total_results: Some(page.total_results),
                restaurants: Some(page.items.into_iter().map(RestaurantObject).collect()),
                ..Default::default()
            },
            Err(e) => CategoryOutput {
                error: Some(failure(e)),
                ..Default::default()
            },
        }
    }

    async fn restaurants(&self, ctx: &Context<'_>, input: PaginationInput) -> RestaurantsOutput {
        RestaurantsOutput::from_page(services(ctx).restaurants.restaurants(input.page).await)
    }

    async fn restaurant(&self, ctx: &Context<'_>, input: RestaurantIdInput) -> RestaurantOutput {
        restaurant_output(services(ctx).restaurants.restaurant(input.restaurant_id).await)
    }

    async fn search_restaurant(
        &self,
        ctx: &Context<'_>,
        input: SearchRestaurantInput,
    ) -> RestaurantsOutput {
        RestaurantsOutput::from_page(
            services(ctx)
                .restaurants
                .search_restaurants(&input.query, input.page)
                .await,
        )
    }
}

fn restaurant_output(res: Result<Restaurant, ServiceError>) -> RestaurantOutput {
    match res {
        Ok(r) => RestaurantOutput {
            ok: true,
            restaurant: Some(RestaurantObject(r)),
            ..Default::default()
        },
        Err(e) => RestaurantOutput {
            error: Some(failure(e)),
            ..Default::default()
        },
    }
}

// ---------------------------------------------------------------------------
// Mutations (owner only)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RestaurantMutation;

#[Object]
impl RestaurantMutation {
    #[graphql(guard = "RoleGuard::new(AllowedRole::Owner)")]
    async fn create_restaurant(
        &self,
        ctx: &Context<'_>,
        input: CreateRestaurantInput,
    ) -> Result<CreateRestaurantOutput> {
        let me = viewer(ctx)?;
        let res = services(ctx)
            .restaurants
            .create_restaurant(
                me,
                CreateRestaurant {
                    name: input.name,
                    cover_image: input.cover_image,
                    address: input.address,
                    category_name: input.category_name,
                },
            )
            .await;
        Ok(match res {
            Ok(r) => CreateRestaurantOutput {
                ok: true,
                restaurant_id: Some(r.id),
                ..Default::default()
            },
            Err(e) => CreateRestaurantOutput {
                error: Some(failure(e)),
                ..Default::default()
            },
        })
    }

    #[graphql(guard = "RoleGuard::new(AllowedRole::Owner)")]
    async fn edit_restaurant(
        &self,
        ctx: &Context<'_>,
        input: EditRestaurantInput,
    ) -> Result<CoreOutput> {
        let me = viewer(ctx)?;
        let edit = EditRestaurant {
            restaurant_id: input.restaurant_id,
            name: input.name,
            cover_image: input.cover_image,
            address: input.address,
            category_name: input.category_name,
        };
        Ok(CoreOutput::from_result(
            services(ctx).restaurants.edit_restaurant(me, edit).await,
        ))
    }

    #[graphql(guard = "RoleGuard::new(AllowedRole::Owner)")]
    async fn delete_restaurant(
        &self,
        ctx: &Context<'_>,
        input: RestaurantIdInput,
    ) -> Result<CoreOutput> {
        let me = viewer(ctx)?;
        Ok(CoreOutput::from_result(
            services(ctx)
                .restaurants
                .delete_restaurant(me, input.restaurant_id)
                .await,
        ))
    }

    #[graphql(guard = "RoleGuard::new(AllowedRole::Owner)")]
    async fn create_dish(&self, ctx: &Context<'_>, input: CreateDishInput) -> Result<CoreOutput> {
        let me = viewer(ctx)?;
        let dish = CreateDish {
            restaurant_id: input.restaurant_id,
            name: input.name,
            price: input.price,
            description: input.description,
            options: input.options,
            photo: input.photo,
        };
        Ok(CoreOutput::from_result(
            services(ctx).restaurants.create_dish(me, dish).await,
        ))
    }

    #[graphql(guard = "RoleGuard::new(AllowedRole::Owner)")]
    async fn edit_dish(&self, ctx: &Context<'_>, input: EditDishInput) -> Result<CoreOutput> {
        let me = viewer(ctx)?;
        let edit = EditDish {
            dish_id: input.dish_id,
            name: input.name,
            price: input.price,
            description: input.description,
            options: input.options,
            photo: input.photo,
        };
        Ok(CoreOutput::from_result(
            services(ctx).restaurants.edit_dish(me, edit).await,
        ))
    }

    #[graphql(guard = "RoleGuard::new(AllowedRole::Owner)")]
    async fn delete_dish(&self, ctx: &Context<'_>, input: DishIdInput) -> Result<CoreOutput> {
        let me = viewer(ctx)?;
        Ok(CoreOutput::from_result(
            services(ctx).restaurants.delete_dish(me, input.dish_id).await,
        ))
    }
}
