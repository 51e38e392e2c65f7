//! End-to-end catalog flows against a real database.
//!
//! Run with `EMPORIUM_TEST_DATABASE_URL` set and `-- --ignored`. Every test
//! creates uniquely named rows, so runs can share a database.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use emporium_core::Role;
use emporium_integration_tests::{TestApp, token, unique};
use rust_decimal::Decimal;
use serde_json::{Value, json};

fn id_of(body: &Value) -> i64 {
    body["id"]
        .as_i64()
        .unwrap_or_else(|| panic!("no id in {body}"))
}

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a decimal string: {value}"))
}

async fn create_category(app: &TestApp, editor: &str) -> i64 {
    create_child_category(app, editor, None).await
}

async fn create_child_category(app: &TestApp, editor: &str, parent: Option<i64>) -> i64 {
    let response = app
        .post_json(
            "/api/categories",
            Some(editor),
            &json!({ "name": unique("Category"), "parent_id": parent }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.json());
    id_of(&response.json())
}

async fn insert_image(app: &TestApp, product: i64) -> i64 {
    let product = i32::try_from(product).unwrap_or_else(|_| panic!("id out of range"));
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO catalog.product_image (product_id, path) VALUES ($1, $2) RETURNING id",
    )
    .bind(product)
    .bind(format!("products/{product}/front.jpg"))
    .fetch_one(app.state.pool())
    .await
    .unwrap_or_else(|e| panic!("image insert failed: {e}"));
    i64::from(id)
}

async fn create_product(app: &TestApp, editor: &str, category: i64, status: &str) -> Value {
    let sku = unique("SKU").replace(' ', "-");
    let response = app
        .post_json(
            "/api/products",
            Some(editor),
            &json!({
                "name": unique("Linen Shirt"),
                "status": status,
                "category_id": category,
                "variants": [
                    { "name": "S", "sku": format!("{sku}-S"), "price": "49.00", "cost": "20.00", "is_default": true },
                    { "name": "M", "sku": format!("{sku}-M"), "price": "52.00", "cost": "21.00" }
                ]
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.json());
    response.json()
}

#[tokio::test]
#[ignore = "Requires EMPORIUM_TEST_DATABASE_URL"]
async fn test_product_lifecycle() {
    let app = TestApp::with_database().await;
    let editor = token(Role::Editor);
    let category = create_category(&app, &editor).await;

    let product = create_product(&app, &editor, category, "draft").await;
    let id = id_of(&product);
    let slug = product["slug"].as_str().unwrap_or_default().to_string();
    assert_eq!(product["variants"].as_array().map(Vec::len), Some(2));
    assert_eq!(decimal(&product["price"]["amount"]), Decimal::new(49, 0));

    // Drafts are hidden from anonymous callers
    let hidden = app.get(&format!("/api/products/{id}")).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
    let visible = app.get_as(&format!("/api/products/{id}"), &editor).await;
    assert_eq!(visible.status, StatusCode::OK);

    let published = app
        .patch_json(
            &format!("/api/products/{id}"),
            &editor,
            &json!({ "status": "published" }),
        )
        .await;
    assert_eq!(published.status, StatusCode::OK);

    let by_slug = app.get(&format!("/api/products/slug/{slug}")).await;
    assert_eq!(by_slug.status, StatusCode::OK);
    assert_eq!(id_of(&by_slug.json()), id);

    let translated = app
        .put_json(
            &format!("/api/products/{id}/translations/de"),
            &editor,
            &json!({ "name": "Leinenhemd" }),
        )
        .await;
    assert!(translated.status.is_success());
    let german = app.get(&format!("/api/products/{id}?lang=de")).await;
    assert_eq!(german.json()["name"], "Leinenhemd");

    let deleted = app.delete(&format!("/api/products/{id}"), &editor).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let gone = app.get_as(&format!("/api/products/{id}"), &editor).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires EMPORIUM_TEST_DATABASE_URL"]
async fn test_category_with_products_is_protected() {
    let app = TestApp::with_database().await;
    let editor = token(Role::Editor);
    let category = create_category(&app, &editor).await;
    let product = create_product(&app, &editor, category, "draft").await;

    let blocked = app
        .delete(&format!("/api/categories/{category}"), &editor)
        .await;
    assert_eq!(blocked.status, StatusCode::CONFLICT);

    app.delete(&format!("/api/products/{}", id_of(&product)), &editor)
        .await;
    let removed = app
        .delete(&format!("/api/categories/{category}"), &editor)
        .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires EMPORIUM_TEST_DATABASE_URL"]
async fn test_duplicate_sku_is_field_error() {
    let app = TestApp::with_database().await;
    let editor = token(Role::Editor);
    let category = create_category(&app, &editor).await;
    let product = create_product(&app, &editor, category, "draft").await;
    let taken = product["variants"][0]["sku"].clone();

    let response = app
        .post_json(
            &format!("/api/products/{}/variants", id_of(&product)),
            Some(&editor),
            &json!({ "variants": [{ "name": "L", "sku": taken, "price": "55.00", "cost": "22.00" }] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"]["sku"].is_array());
}

#[tokio::test]
#[ignore = "Requires EMPORIUM_TEST_DATABASE_URL"]
async fn test_bulk_status_change() {
    let app = TestApp::with_database().await;
    let editor = token(Role::Editor);
    let category = create_category(&app, &editor).await;
    let first = id_of(&create_product(&app, &editor, category, "draft").await);
    let second = id_of(&create_product(&app, &editor, category, "draft").await);

    let response = app
        .post_json(
            "/api/products/bulk/status",
            Some(&token(Role::Manager)),
            &json!({ "ids": [first, second, first], "status": "published" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["requested"], 2);
    assert_eq!(body["affected"], 2);

    let listing = app
        .get(&format!("/api/products?category={category}"))
        .await
        .json();
    assert_eq!(listing["count"], 2);
}

#[tokio::test]
#[ignore = "Requires EMPORIUM_TEST_DATABASE_URL"]
async fn test_tax_lookup() {
    let app = TestApp::with_database().await;
    let manager = token(Role::Manager);

    let class = app
        .post_json("/api/tax-classes", Some(&manager), &json!({ "name": unique("Standard") }))
        .await;
    assert_eq!(class.status, StatusCode::CREATED);
    let class = id_of(&class.json());

    let rate = app
        .post_json(
            &format!("/api/tax-classes/{class}/rates"),
            Some(&manager),
            &json!({ "country": "de", "rate": "19.00" }),
        )
        .await;
    assert_eq!(rate.status, StatusCode::CREATED);

    let lookup = app
        .get(&format!("/api/tax-classes/{class}/lookup?country=DE&amount=100"))
        .await;
    assert_eq!(lookup.status, StatusCode::OK);
    let body = lookup.json();
    assert_eq!(decimal(&body["rate"]["rate"]), Decimal::new(19, 0));
    assert_eq!(decimal(&body["tax"]["amount"]), Decimal::new(19, 0));

    let missing = app
        .get(&format!("/api/tax-classes/{class}/lookup?country=FR"))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires EMPORIUM_TEST_DATABASE_URL"]
async fn test_graphql_lists_published_products() {
    let app = TestApp::with_database().await;
    let editor = token(Role::Editor);
    let category = create_category(&app, &editor).await;
    create_product(&app, &editor, category, "published").await;
    create_product(&app, &editor, category, "draft").await;

    let query = format!(
        "{{ products(first: 10, filter: {{ category: {category} }}) {{ totalCount edges {{ node {{ name status }} }} }} }}"
    );
    let anonymous = app.graphql(&query, None).await;
    assert_eq!(anonymous["data"]["products"]["totalCount"], 1, "{anonymous}");
    assert_eq!(anonymous["data"]["products"]["edges"][0]["node"]["status"], "PUBLISHED");

    let staff = app.graphql(&query, Some(&editor)).await;
    assert_eq!(staff["data"]["products"]["totalCount"], 2, "{staff}");
}

#[tokio::test]
#[ignore = "Requires EMPORIUM_TEST_DATABASE_URL"]
async fn test_default_variant_cannot_be_deleted() {
    let app = TestApp::with_database().await;
    let editor = token(Role::Editor);
    let category = create_category(&app, &editor).await;
    let product = create_product(&app, &editor, category, "draft").await;
    let default_id = id_of(&product["variants"][0]);
    let other_id = id_of(&product["variants"][1]);
    assert_eq!(product["variants"][0]["is_default"], true);

    let blocked = app.delete(&format!("/api/variants/{default_id}"), &editor).await;
    assert_eq!(blocked.status, StatusCode::BAD_REQUEST);
    assert!(blocked.json()["errors"]["non_field_errors"].is_array());

    let removed = app.delete(&format!("/api/variants/{other_id}"), &editor).await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires EMPORIUM_TEST_DATABASE_URL"]
async fn test_category_depth_is_capped_at_two() {
    let app = TestApp::with_database().await;
    let editor = token(Role::Editor);
    let root = create_category(&app, &editor).await;
    let child = create_child_category(&app, &editor, Some(root)).await;

    let grandchild = app
        .post_json(
            "/api/categories",
            Some(&editor),
            &json!({ "name": unique("Category"), "parent_id": child }),
        )
        .await;
    assert_eq!(grandchild.status, StatusCode::BAD_REQUEST);
    assert!(grandchild.json()["errors"]["parent"].is_array());

    create_child_category(&app, &editor, Some(root)).await;
}

#[tokio::test]
#[ignore = "Requires EMPORIUM_TEST_DATABASE_URL"]
async fn test_child_create_waits_for_parent_move() {
    let app = Arc::new(TestApp::with_database().await);
    let editor = token(Role::Editor);
    let root = create_category(&app, &editor).await;
    let moving = create_category(&app, &editor).await;

    // Uncommitted move of `moving` under `root`
    let mut tx = app
        .state
        .pool()
        .begin()
        .await
        .unwrap_or_else(|e| panic!("begin failed: {e}"));
    sqlx::query("UPDATE catalog.category SET parent_id = $1 WHERE id = $2")
        .bind(i32::try_from(root).unwrap_or_default())
        .bind(i32::try_from(moving).unwrap_or_default())
        .execute(&mut *tx)
        .await
        .unwrap_or_else(|e| panic!("move failed: {e}"));

    let pending = tokio::spawn({
        let app = Arc::clone(&app);
        let editor = editor.clone();
        async move {
            app.post_json(
                "/api/categories",
                Some(&editor),
                &json!({ "name": unique("Category"), "parent_id": moving }),
            )
            .await
        }
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!pending.is_finished(), "child create must wait for the parent row");

    tx.commit()
        .await
        .unwrap_or_else(|e| panic!("commit failed: {e}"));
    let response = pending
        .await
        .unwrap_or_else(|e| panic!("request task failed: {e}"));
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"]["parent"].is_array());
}

#[tokio::test]
#[ignore = "Requires EMPORIUM_TEST_DATABASE_URL"]
async fn test_variant_image_and_compare_at_price() {
    let app = TestApp::with_database().await;
    let editor = token(Role::Editor);
    let category = create_category(&app, &editor).await;
    let product = create_product(&app, &editor, category, "draft").await;
    let other = create_product(&app, &editor, category, "draft").await;
    let variant = id_of(&product["variants"][1]);
    let image = insert_image(&app, id_of(&product)).await;
    let foreign_image = insert_image(&app, id_of(&other)).await;
    let uri = format!("/api/variants/{variant}");

    let set = app
        .patch_json(&uri, &editor, &json!({ "image_id": image, "compare_at_price": "60.00" }))
        .await;
    assert_eq!(set.status, StatusCode::OK, "{}", set.json());
    assert_eq!(set.json()["image_id"], image);
    assert_eq!(decimal(&set.json()["compare_at_price"]), Decimal::new(60, 0));

    let foreign = app
        .patch_json(&uri, &editor, &json!({ "image_id": foreign_image }))
        .await;
    assert_eq!(foreign.status, StatusCode::BAD_REQUEST);
    assert!(foreign.json()["errors"]["image_id"].is_array());

    let untouched = app.patch_json(&uri, &editor, &json!({ "quantity": 4 })).await;
    assert_eq!(untouched.json()["image_id"], image);

    let cleared = app
        .patch_json(&uri, &editor, &json!({ "image_id": null, "compare_at_price": null }))
        .await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert!(cleared.json()["image_id"].is_null());
    assert!(cleared.json()["compare_at_price"].is_null());

    let added = app
        .post_json(
            &format!("/api/products/{}/variants", id_of(&product)),
            Some(&editor),
            &json!({ "variants": [
                { "name": "XL", "price": "58.00", "cost": "23.00", "image_id": foreign_image }
            ] }),
        )
        .await;
    assert_eq!(added.status, StatusCode::BAD_REQUEST);
    assert!(added.json()["errors"]["variants[0].image_id"].is_array());
}

#[tokio::test]
#[ignore = "Requires EMPORIUM_TEST_DATABASE_URL"]
async fn test_tax_lookup_out_of_range_amount() {
    let app = TestApp::with_database().await;
    let manager = token(Role::Manager);
    let class = app
        .post_json("/api/tax-classes", Some(&manager), &json!({ "name": unique("Standard") }))
        .await;
    let class = id_of(&class.json());
    app.post_json(
        &format!("/api/tax-classes/{class}/rates"),
        Some(&manager),
        &json!({ "country": "DE", "rate": "19.00" }),
    )
    .await;

    let response = app
        .get(&format!(
            "/api/tax-classes/{class}/lookup?country=DE&amount=10000000000000000000000000000"
        ))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"]["amount"].is_array());
}
