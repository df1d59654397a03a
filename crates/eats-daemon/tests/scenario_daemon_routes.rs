//! In-process scenario tests for eats-daemon.
//!
//! The router is driven with `tower::ServiceExt::oneshot` against the
//! in-memory store; no socket is bound. Subscriptions are exercised through
//! the schema directly.

use std::sync::Arc;
use std::time::Duration;

use async_graphql::Request as GqlRequest;
use axum::http::{Request, StatusCode};
use eats_auth::JwtService;
use eats_daemon::{graphql::Viewer, routes, state::AppState};
use eats_schemas::UserRole;
use eats_service::{RecordingMailer, Services};
use eats_testkit::{mem_store, seed_user, TEST_JWT_KEY};
use futures_util::StreamExt;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_state() -> Arc<AppState> {
    let services = Services::new(
        mem_store(),
        JwtService::new(TEST_JWT_KEY.as_bytes(), 3600),
        Arc::new(RecordingMailer::new()),
        7,
    );
    Arc::new(AppState::new(services, Some("test-hash".to_string())))
}

/// Drive the router with a single request and return (status, body_bytes).
async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

/// POST a GraphQL document, optionally with an `x-jwt` header.
async fn gql(st: &Arc<AppState>, token: Option<&str>, query: &str, variables: Value) -> Value {
    let mut req = Request::builder()
        .method("POST")
        .uri("/graphql")
        .header("content-type", "application/json");
    if let Some(t) = token {
        req = req.header("x-jwt", t);
    }
    let body = json!({ "query": query, "variables": variables }).to_string();
    let (status, bytes) = call(
        routes::build_router(Arc::clone(st)),
        req.body(axum::body::Body::from(body)).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    parse_json(bytes)
}

async fn sign_up(st: &Arc<AppState>, email: &str, role: &str) -> String {
    let created = gql(
        st,
        None,
        "mutation($i: CreateAccountInput!) { createAccount(input: $i) { ok error } }",
        json!({ "i": { "email": email, "password": "hunter2-hunter2", "role": role } }),
    )
    .await;
    assert_eq!(created["data"]["createAccount"]["ok"], true, "{created}");

    let login = gql(
        st,
        None,
        "mutation($i: LoginInput!) { login(input: $i) { ok error token } }",
        json!({ "i": { "email": email, "password": "hunter2-hunter2" } }),
    )
    .await;
    assert_eq!(login["data"]["login"]["ok"], true, "{login}");
    login["data"]["login"]["token"]
        .as_str()
        .expect("token")
        .to_string()
}

fn first_error(v: &Value) -> &str {
    v["errors"][0]["message"].as_str().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Plain HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let st = make_state();
    let req = Request::builder()
        .method("GET")
        .uri("/v1/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "eats-daemon");
    assert_eq!(json["config_hash"], "test-hash");
}

#[tokio::test]
async fn graphql_get_serves_playground_html() {
    let st = make_state();
    let req = Request::builder()
        .method("GET")
        .uri("/graphql")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = call(routes::build_router(st), req).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("/graphql/ws"));
}

// ---------------------------------------------------------------------------
// Accounts and guards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_token_resolves_me() {
    let st = make_state();
    let token = sign_up(&st, "owner@eats.test", "Owner").await;

    let me = gql(&st, Some(&token), "{ me { email role verified } }", json!({})).await;
    assert_eq!(me["data"]["me"]["email"], "owner@eats.test");
    assert_eq!(me["data"]["me"]["role"], "Owner");
    assert_eq!(me["data"]["me"]["verified"], false);
}

#[tokio::test]
async fn duplicate_email_is_an_error_output() {
    let st = make_state();
    sign_up(&st, "dup@eats.test", "Client").await;

    let again = gql(
        &st,
        None,
        "mutation($i: CreateAccountInput!) { createAccount(input: $i) { ok error } }",
        json!({ "i": { "email": "dup@eats.test", "password": "whatever-long", "role": "Client" } }),
    )
    .await;
    assert_eq!(again["data"]["createAccount"]["ok"], false);
    assert_eq!(
        again["data"]["createAccount"]["error"],
        "There is a user with that email already"
    );
}

#[tokio::test]
async fn guarded_fields_reject_missing_and_bad_tokens() {
    let st = make_state();

    let anon = gql(&st, None, "{ me { id } }", json!({})).await;
    assert_eq!(first_error(&anon), "Forbidden resource");

    let bogus = gql(&st, Some("not-a-jwt"), "{ me { id } }", json!({})).await;
    assert_eq!(first_error(&bogus), "Forbidden resource");
}

#[tokio::test]
async fn wrong_role_is_forbidden() {
    let st = make_state();
    let client = sign_up(&st, "client@eats.test", "Client").await;

    let res = gql(
        &st,
        Some(&client),
        "mutation($i: CreateRestaurantInput!) { createRestaurant(input: $i) { ok } }",
        json!({ "i": {
            "name": "Taco Palace", "coverImage": "c.png",
            "address": "2 Side St", "categoryName": "Mexican"
        } }),
    )
    .await;
    assert_eq!(first_error(&res), "Forbidden resource");
}

// ---------------------------------------------------------------------------
// Restaurant, order and payment flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn order_flow_over_graphql() {
    let st = make_state();
    let owner = sign_up(&st, "owner@eats.test", "Owner").await;
    let client = sign_up(&st, "client@eats.test", "Client").await;
    let driver = sign_up(&st, "driver@eats.test", "Delivery").await;

    let created = gql(
        &st,
        Some(&owner),
        "mutation($i: CreateRestaurantInput!) { createRestaurant(input: $i) { ok error restaurantId } }",
        json!({ "i": {
            "name": "Taco Palace", "coverImage": "c.png",
            "address": "2 Side St", "categoryName": "  Mexican  Food "
        } }),
    )
    .await;
    assert_eq!(created["data"]["createRestaurant"]["ok"], true, "{created}");
    let rid = created["data"]["createRestaurant"]["restaurantId"].as_i64().unwrap();

    let dish = gql(
        &st,
        Some(&owner),
        "mutation($i: CreateDishInput!) { createDish(input: $i) { ok error } }",
        json!({ "i": {
            "restaurantId": rid, "name": "Al Pastor", "price": 900,
            "description": "pork",
            "options": [{ "name": "Salsa", "choices": [
                { "name": "Mild" }, { "name": "Hot", "extra": 100 }
            ] }]
        } }),
    )
    .await;
    assert_eq!(dish["data"]["createDish"]["ok"], true, "{dish}");

    let menu = gql(
        &st,
        None,
        "query($i: RestaurantIdInput!) { restaurant(input: $i) { ok restaurant { category { slug } menu { id name } } } }",
        json!({ "i": { "restaurantId": rid } }),
    )
    .await;
    let r = &menu["data"]["restaurant"]["restaurant"];
    assert_eq!(r["category"]["slug"], "mexican-food");
    let dish_id = r["menu"][0]["id"].as_i64().unwrap();

    let order = gql(
        &st,
        Some(&client),
        "mutation($i: CreateOrderInput!) { createOrder(input: $i) { ok error orderId } }",
        json!({ "i": { "restaurantId": rid, "items": [
            { "dishId": dish_id, "options": [{ "name": "Salsa", "choice": "Hot" }] },
            { "dishId": dish_id }
        ] } }),
    )
    .await;
    assert_eq!(order["data"]["createOrder"]["ok"], true, "{order}");
    let oid = order["data"]["createOrder"]["orderId"].as_i64().unwrap();

    let seen = gql(
        &st,
        Some(&client),
        "query($i: OrderIdInput!) { getOrder(input: $i) { ok order { total status items { dish { name } } } } }",
        json!({ "i": { "id": oid } }),
    )
    .await;
    let o = &seen["data"]["getOrder"]["order"];
    assert_eq!(o["total"], 1900);
    assert_eq!(o["status"], "Pending");
    assert_eq!(o["items"][0]["dish"]["name"], "Al Pastor");

    // Drivers cannot see an order before taking it.
    let hidden = gql(
        &st,
        Some(&driver),
        "query($i: OrderIdInput!) { getOrder(input: $i) { ok error } }",
        json!({ "i": { "id": oid } }),
    )
    .await;
    assert_eq!(hidden["data"]["getOrder"]["error"], "You can't see that");

    let edit = "mutation($i: EditOrderInput!) { editOrder(input: $i) { ok error } }";
    let by_client = gql(&st, Some(&client), edit, json!({ "i": { "id": oid, "status": "Cooked" } })).await;
    assert_eq!(by_client["data"]["editOrder"]["ok"], false);

    let by_owner = gql(&st, Some(&owner), edit, json!({ "i": { "id": oid, "status": "Cooked" } })).await;
    assert_eq!(by_owner["data"]["editOrder"]["ok"], true, "{by_owner}");

    let take = "mutation($i: OrderIdInput!) { takeOrder(input: $i) { ok error } }";
    let taken = gql(&st, Some(&driver), take, json!({ "i": { "id": oid } })).await;
    assert_eq!(taken["data"]["takeOrder"]["ok"], true, "{taken}");
    let again = gql(&st, Some(&driver), take, json!({ "i": { "id": oid } })).await;
    assert_eq!(again["data"]["takeOrder"]["ok"], false);

    let picked = gql(&st, Some(&driver), edit, json!({ "i": { "id": oid, "status": "PickedUp" } })).await;
    assert_eq!(picked["data"]["editOrder"]["ok"], true, "{picked}");

    let listed = gql(
        &st,
        Some(&driver),
        "query($i: GetOrdersInput!) { getOrders(input: $i) { ok orders { id status } } }",
        json!({ "i": { "status": "PickedUp" } }),
    )
    .await;
    assert_eq!(listed["data"]["getOrders"]["orders"][0]["id"], oid);
}

#[tokio::test]
async fn payment_promotes_restaurant_to_first_page_head() {
    let st = make_state();
    let owner = sign_up(&st, "owner@eats.test", "Owner").await;

    let mut ids = Vec::new();
    for name in ["First Place", "Second Place"] {
        let res = gql(
            &st,
            Some(&owner),
            "mutation($i: CreateRestaurantInput!) { createRestaurant(input: $i) { restaurantId } }",
            json!({ "i": {
                "name": name, "coverImage": "c.png",
                "address": "3 Road", "categoryName": "Diner"
            } }),
        )
        .await;
        ids.push(res["data"]["createRestaurant"]["restaurantId"].as_i64().unwrap());
    }

    let paid = gql(
        &st,
        Some(&owner),
        "mutation($i: CreatePaymentInput!) { createPayment(input: $i) { ok error } }",
        json!({ "i": { "transactionId": "tx-1", "restaurantId": ids[1] } }),
    )
    .await;
    assert_eq!(paid["data"]["createPayment"]["ok"], true, "{paid}");

    let page = gql(
        &st,
        None,
        "query($i: PaginationInput!) { restaurants(input: $i) { ok totalPages totalResults results { id isPromoted } } }",
        json!({ "i": { "page": 1 } }),
    )
    .await;
    let out = &page["data"]["restaurants"];
    assert_eq!(out["totalResults"], 2);
    assert_eq!(out["totalPages"], 1);
    assert_eq!(out["results"][0]["id"], ids[1]);
    assert_eq!(out["results"][0]["isPromoted"], true);

    let payments = gql(&st, Some(&owner), "{ getPayments { ok payments { transactionId } } }", json!({})).await;
    assert_eq!(payments["data"]["getPayments"]["payments"][0]["transactionId"], "tx-1");
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cooked_orders_reach_delivery_subscribers() {
    let st = make_state();
    let store = st.services.store.clone();
    let owner = seed_user(store.as_ref(), "o@eats.test", UserRole::Owner).await.unwrap();
    let client = seed_user(store.as_ref(), "c@eats.test", UserRole::Client).await.unwrap();
    let driver = seed_user(store.as_ref(), "d@eats.test", UserRole::Delivery).await.unwrap();
    let r = eats_testkit::seed_restaurant(store.as_ref(), owner.id, "Grill House").await.unwrap();
    let d = eats_testkit::seed_dish(store.as_ref(), r.id, "Skewer", 500, vec![]).await.unwrap();

    let mut stream = st.schema.execute_stream(
        GqlRequest::new("subscription { cookedOrders { id status } }").data(Viewer(Some(driver))),
    );
    // First poll runs the resolver and subscribes to the bus.
    let _ = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;

    let order = st
        .services
        .orders
        .create_order(
            &client,
            r.id,
            vec![eats_service::CreateOrderItem {
                dish_id: d.id,
                options: vec![],
            }],
        )
        .await
        .unwrap();
    st.services
        .orders
        .edit_order(&owner, order.id, eats_schemas::OrderStatus::Cooked)
        .await
        .unwrap();

    let resp = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("no event")
        .expect("stream ended");
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["cookedOrders"]["id"], order.id);
    assert_eq!(data["cookedOrders"]["status"], "Cooked");
}

#[tokio::test]
async fn order_updates_reject_non_participants() {
    let st = make_state();
    let store = st.services.store.clone();
    let owner = seed_user(store.as_ref(), "o@eats.test", UserRole::Owner).await.unwrap();
    let client = seed_user(store.as_ref(), "c@eats.test", UserRole::Client).await.unwrap();
    let stranger = seed_user(store.as_ref(), "s@eats.test", UserRole::Client).await.unwrap();
    let r = eats_testkit::seed_restaurant(store.as_ref(), owner.id, "Grill House").await.unwrap();
    let d = eats_testkit::seed_dish(store.as_ref(), r.id, "Skewer", 500, vec![]).await.unwrap();
    let order = st
        .services
        .orders
        .create_order(
            &client,
            r.id,
            vec![eats_service::CreateOrderItem {
                dish_id: d.id,
                options: vec![],
            }],
        )
        .await
        .unwrap();

    let doc = format!("subscription {{ orderUpdates(input: {{ id: {} }}) {{ id status }} }}", order.id);
    let mut stream = st
        .schema
        .execute_stream(GqlRequest::new(doc).data(Viewer(Some(stranger))));
    let resp = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("no response")
        .expect("stream ended");
    assert_eq!(resp.errors[0].message, "You can't see that");
}

#[tokio::test]
async fn pending_orders_reach_only_the_owning_owner() {
    let st = make_state();
    let store = st.services.store.clone();
    let owner = seed_user(store.as_ref(), "o@eats.test", UserRole::Owner).await.unwrap();
    let rival = seed_user(store.as_ref(), "r@eats.test", UserRole::Owner).await.unwrap();
    let client = seed_user(store.as_ref(), "c@eats.test", UserRole::Client).await.unwrap();
    let mine = eats_testkit::seed_restaurant(store.as_ref(), owner.id, "Grill House").await.unwrap();
    let theirs = eats_testkit::seed_restaurant(store.as_ref(), rival.id, "Noodle Bar").await.unwrap();
    let skewer = eats_testkit::seed_dish(store.as_ref(), mine.id, "Skewer", 500, vec![]).await.unwrap();
    let ramen = eats_testkit::seed_dish(store.as_ref(), theirs.id, "Ramen", 900, vec![]).await.unwrap();

    let doc = "subscription { pendingOrders { id status total } }";
    let mut owner_stream = st
        .schema
        .execute_stream(GqlRequest::new(doc).data(Viewer(Some(owner))));
    let mut rival_stream = st
        .schema
        .execute_stream(GqlRequest::new(doc).data(Viewer(Some(rival))));
    let _ = tokio::time::timeout(Duration::from_millis(50), owner_stream.next()).await;
    let _ = tokio::time::timeout(Duration::from_millis(50), rival_stream.next()).await;

    let order = st
        .services
        .orders
        .create_order(
            &client,
            mine.id,
            vec![eats_service::CreateOrderItem {
                dish_id: skewer.id,
                options: vec![],
            }],
        )
        .await
        .unwrap();

    let resp = tokio::time::timeout(Duration::from_secs(1), owner_stream.next())
        .await
        .expect("no event")
        .expect("stream ended");
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["pendingOrders"]["id"], order.id);
    assert_eq!(data["pendingOrders"]["status"], "Pending");
    assert_eq!(data["pendingOrders"]["total"], 500);

    assert!(
        tokio::time::timeout(Duration::from_millis(100), rival_stream.next())
            .await
            .is_err(),
        "another owner's order leaked"
    );

    // The rival's stream is live; it only skipped the foreign order.
    let own = st
        .services
        .orders
        .create_order(
            &client,
            theirs.id,
            vec![eats_service::CreateOrderItem {
                dish_id: ramen.id,
                options: vec![],
            }],
        )
        .await
        .unwrap();
    let resp = tokio::time::timeout(Duration::from_secs(1), rival_stream.next())
        .await
        .expect("no event")
        .expect("stream ended");
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["pendingOrders"]["id"], own.id);
}

#[tokio::test]
async fn order_updates_follow_only_the_requested_order() {
    let st = make_state();
    let store = st.services.store.clone();
    let owner = seed_user(store.as_ref(), "o@eats.test", UserRole::Owner).await.unwrap();
    let client = seed_user(store.as_ref(), "c@eats.test", UserRole::Client).await.unwrap();
    let r = eats_testkit::seed_restaurant(store.as_ref(), owner.id, "Grill House").await.unwrap();
    let d = eats_testkit::seed_dish(store.as_ref(), r.id, "Skewer", 500, vec![]).await.unwrap();
    let line = || {
        vec![eats_service::CreateOrderItem {
            dish_id: d.id,
            options: vec![],
        }]
    };
    let watched = st.services.orders.create_order(&client, r.id, line()).await.unwrap();
    let other = st.services.orders.create_order(&client, r.id, line()).await.unwrap();

    let doc = format!("subscription {{ orderUpdates(input: {{ id: {} }}) {{ id status }} }}", watched.id);
    let mut stream = st
        .schema
        .execute_stream(GqlRequest::new(doc).data(Viewer(Some(client.clone()))));
    let _ = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;

    st.services
        .orders
        .edit_order(&owner, other.id, eats_schemas::OrderStatus::Cooking)
        .await
        .unwrap();
    st.services
        .orders
        .edit_order(&owner, watched.id, eats_schemas::OrderStatus::Cooking)
        .await
        .unwrap();

    let resp = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("no event")
        .expect("stream ended");
    assert!(resp.errors.is_empty(), "{:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["orderUpdates"]["id"], watched.id);
    assert_eq!(data["orderUpdates"]["status"], "Cooking");
}
