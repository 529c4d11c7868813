//! API documentation: OpenAPI description plus Swagger UI and ReDoc pages

use axum::{extract::State, response::Html, Json};
use serde_json::{json, Map, Value};

use crate::AppState;

/// Who may call an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Authenticated,
    Customer,
    Admin,
}

/// Request body of an operation
#[derive(Debug, Clone, Copy)]
enum Body {
    None,
    /// JSON body described by a component schema
    Json(&'static str),
    /// Multipart form with one file field (`true` when it repeats)
    Files(&'static str, bool),
}

/// Successful response payload
#[derive(Debug, Clone, Copy)]
enum Reply {
    Empty,
    One(&'static str),
    Many(&'static str),
}

struct Operation {
    method: &'static str,
    path: &'static str,
    tag: &'static str,
    summary: &'static str,
    access: Access,
    body: Body,
    reply: Reply,
    query: &'static [&'static str],
}

const fn op(
    method: &'static str,
    path: &'static str,
    tag: &'static str,
    summary: &'static str,
    access: Access,
    body: Body,
    reply: Reply,
) -> Operation {
    Operation {
        method,
        path,
        tag,
        summary,
        access,
        body,
        reply,
        query: &[],
    }
}

const fn with_query(op: Operation, query: &'static [&'static str]) -> Operation {
    Operation { query, ..op }
}

const PAGE: &[&str] = &["skip", "limit"];

use Access::{Admin, Authenticated, Customer, Public};
use Body::{Files, Json as JsonBody};
use Reply::{Empty, Many, One};

/// Every route under the API prefix
const OPERATIONS: &[Operation] = &[
    op("get", "/users/me", "Users", "Get the current user's profile", Authenticated, Body::None, One("User")),
    op("post", "/users/me", "Users", "Complete the current user's profile", Authenticated, JsonBody("CompleteProfileInput"), One("User")),
    op("patch", "/users/me", "Users", "Update the current user's name", Authenticated, JsonBody("UpdateProfileInput"), One("User")),
    with_query(op("get", "/users", "Users", "List users", Admin, Body::None, Many("User")), PAGE),
    op("get", "/users/{user_id}", "Users", "Get a user", Admin, Body::None, One("User")),
    op("patch", "/users/{user_id}/role", "Users", "Change a user's role", Admin, JsonBody("UpdateRoleInput"), One("User")),
    op("delete", "/users/{user_id}", "Users", "Delete a user", Admin, Body::None, Empty),
    with_query(
        op("get", "/products", "Products", "List products", Public, Body::None, Many("Product")),
        &["skip", "limit", "only_active"],
    ),
    op("post", "/products", "Products", "Create a product", Admin, JsonBody("CreateProductInput"), One("Product")),
    op("get", "/products/{product_id}", "Products", "Get a product", Public, Body::None, One("Product")),
    op("patch", "/products/{product_id}", "Products", "Update a product", Admin, JsonBody("UpdateProductInput"), One("Product")),
    op("delete", "/products/{product_id}", "Products", "Delete a product", Admin, Body::None, Empty),
    op("get", "/products/{product_id}/images", "Products", "List gallery images", Public, Body::None, Many("ProductImage")),
    op("post", "/products/{product_id}/hero-image", "Products", "Upload or replace the hero image", Admin, Files("file", false), One("Product")),
    op("post", "/products/{product_id}/gallery", "Products", "Upload gallery images", Admin, Files("files", true), Many("ProductImage")),
    op("delete", "/products/{product_id}/gallery/{image_id}", "Products", "Delete a gallery image", Admin, Body::None, One("MessageResponse")),
    op("get", "/cart", "Cart", "Get the cart summary", Customer, Body::None, One("CartSummary")),
    op("post", "/cart", "Cart", "Add a product to the cart", Customer, JsonBody("AddCartItemInput"), One("CartSummary")),
    op("delete", "/cart", "Cart", "Clear the cart", Customer, Body::None, One("CartSummary")),
    op("patch", "/cart/{product_id}", "Cart", "Change an item's quantity", Customer, JsonBody("UpdateCartItemInput"), One("CartSummary")),
    op("delete", "/cart/{product_id}", "Cart", "Remove an item", Customer, Body::None, One("CartSummary")),
    op("post", "/orders/checkout", "Orders", "Place an order from the cart", Customer, JsonBody("CheckoutInput"), One("OrderDetail")),
    with_query(op("get", "/orders/me", "Orders", "List my orders", Customer, Body::None, Many("Order")), PAGE),
    op("get", "/orders/me/{order_id}", "Orders", "Get one of my orders", Customer, Body::None, One("OrderDetail")),
    with_query(op("get", "/orders", "Orders", "List all orders", Admin, Body::None, Many("Order")), PAGE),
    op("get", "/orders/{order_id}", "Orders", "Get an order", Admin, Body::None, One("OrderDetail")),
    op("patch", "/orders/{order_id}/status", "Orders", "Update an order's status", Admin, JsonBody("UpdateStatusInput"), One("Order")),
    with_query(
        op("get", "/admin/stats", "Admin Stats", "Dashboard statistics", Admin, Body::None, One("AdminDashboardStats")),
        &["year", "month"],
    ),
];

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

fn string() -> Value {
    json!({ "type": "string" })
}

fn nullable_string() -> Value {
    json!({ "type": "string", "nullable": true })
}

fn uuid() -> Value {
    json!({ "type": "string", "format": "uuid" })
}

fn money() -> Value {
    json!({ "type": "string", "format": "decimal", "example": "185000.00" })
}

fn timestamp() -> Value {
    json!({ "type": "string", "format": "date-time" })
}

fn enumeration(values: &[&str]) -> Value {
    json!({ "type": "string", "enum": values })
}

fn object(required: &[&str], properties: Value) -> Value {
    if required.is_empty() {
        return json!({ "type": "object", "properties": properties });
    }
    json!({ "type": "object", "required": required, "properties": properties })
}

/// Component schemas for every request and response body
fn component_schemas() -> Value {
    let role = enumeration(&["user", "admin"]);
    let status = enumeration(&["pending", "confirmed", "shipped", "canceled"]);
    let window = enumeration(&["morning", "afternoon", "evening", "custom"]);

    let order_properties = json!({
        "id": uuid(),
        "user_id": uuid(),
        "receiver_name": nullable_string(),
        "phone_number": string(),
        "note": nullable_string(),
        "full_address": string(),
        "province": string(),
        "ward": string(),
        "delivery_date": { "type": "string", "format": "date" },
        "delivery_window": window,
        "status": status,
        "total_amount": money(),
        "created_at": timestamp(),
    });
    let order_required = [
        "id", "user_id", "phone_number", "full_address", "province", "ward", "delivery_date",
        "delivery_window", "status", "total_amount", "created_at",
    ];

    let mut order_detail_properties = order_properties.clone();
    if let Value::Object(props) = &mut order_detail_properties {
        props.insert(
            "items".into(),
            json!({
                "type": "array",
                "items": object(&["id", "order_id", "product_id", "quantity", "unit_price", "line_total"], json!({
                    "id": uuid(),
                    "order_id": uuid(),
                    "product_id": uuid(),
                    "quantity": { "type": "integer" },
                    "unit_price": money(),
                    "product_name": nullable_string(),
                    "product_hero_image_url": nullable_string(),
                    "line_total": money(),
                })),
            }),
        );
        props.insert("subtotal".into(), money());
        props.insert("tax_amount".into(), money());
    }

    json!({
        "User": object(&["id", "email", "name", "role", "created_at"], json!({
            "id": uuid(),
            "email": { "type": "string", "format": "email" },
            "name": { "type": "string", "maxLength": 50 },
            "role": role,
            "created_at": timestamp(),
        })),
        "CompleteProfileInput": object(&[], json!({
            "email": { "type": "string", "format": "email" },
            "name": { "type": "string", "maxLength": 50 },
        })),
        "UpdateProfileInput": object(&[], json!({ "name": { "type": "string", "maxLength": 50 } })),
        "UpdateRoleInput": object(&["role"], json!({ "role": role })),
        "Product": object(&["id", "name", "slug", "price", "stock_on_hand", "is_active", "category", "created_at"], json!({
            "id": uuid(),
            "name": string(),
            "slug": string(),
            "description": nullable_string(),
            "price": money(),
            "stock_on_hand": { "type": "integer" },
            "is_active": { "type": "boolean" },
            "hero_image_url": nullable_string(),
            "category": string(),
            "created_at": timestamp(),
        })),
        "CreateProductInput": object(&["name", "price", "category"], json!({
            "name": { "type": "string", "minLength": 3, "maxLength": 100 },
            "slug": string(),
            "description": string(),
            "price": money(),
            "stock_on_hand": { "type": "integer", "minimum": 0, "default": 0 },
            "is_active": { "type": "boolean", "default": true },
            "category": { "type": "string", "maxLength": 50 },
        })),
        "UpdateProductInput": object(&[], json!({
            "name": { "type": "string", "minLength": 3, "maxLength": 100 },
            "slug": string(),
            "description": string(),
            "price": money(),
            "stock_on_hand": { "type": "integer", "minimum": 0 },
            "is_active": { "type": "boolean" },
            "hero_image_url": string(),
            "category": { "type": "string", "maxLength": 50 },
        })),
        "ProductImage": object(&["id", "product_id", "image_url", "sort_order"], json!({
            "id": uuid(),
            "product_id": uuid(),
            "image_url": string(),
            "sort_order": { "type": "integer", "minimum": 0 },
        })),
        "AddCartItemInput": object(&["product_id", "quantity"], json!({
            "product_id": uuid(),
            "quantity": { "type": "integer", "minimum": 1 },
        })),
        "UpdateCartItemInput": object(&["quantity"], json!({ "quantity": { "type": "integer", "minimum": 1 } })),
        "CartSummary": object(&["items", "total_quantity", "total_price"], json!({
            "items": {
                "type": "array",
                "items": object(&["id", "product_id", "quantity", "snapshot_price", "line_total"], json!({
                    "id": uuid(),
                    "user_id": uuid(),
                    "product_id": uuid(),
                    "quantity": { "type": "integer" },
                    "snapshot_price": money(),
                    "product_name": nullable_string(),
                    "product_hero_image_url": nullable_string(),
                    "created_at": timestamp(),
                    "line_total": money(),
                })),
            },
            "total_quantity": { "type": "integer" },
            "total_price": money(),
        })),
        "CheckoutInput": object(
            &["phone_number", "full_address", "province", "ward", "delivery_date", "delivery_window"],
            json!({
                "receiver_name": string(),
                "phone_number": string(),
                "full_address": string(),
                "province": string(),
                "ward": string(),
                "delivery_date": { "type": "string", "format": "date" },
                "delivery_window": window,
                "note": string(),
            }),
        ),
        "UpdateStatusInput": object(&["status"], json!({ "status": status })),
        "Order": object(&order_required, order_properties),
        "OrderDetail": object(&order_required, order_detail_properties),
        "AdminDashboardStats": object(
            &["total_customers", "total_orders", "total_revenue", "daily_sales", "top_products", "latest_orders"],
            json!({
                "total_customers": { "type": "integer" },
                "total_orders": { "type": "integer" },
                "total_revenue": money(),
                "daily_sales": { "type": "array", "items": object(&["date", "total_revenue", "order_count"], json!({
                    "date": { "type": "string", "format": "date" },
                    "total_revenue": money(),
                    "order_count": { "type": "integer" },
                })) },
                "top_products": { "type": "array", "items": object(&["product_id", "name", "total_quantity", "total_revenue"], json!({
                    "product_id": uuid(),
                    "name": string(),
                    "total_quantity": { "type": "integer" },
                    "total_revenue": money(),
                })) },
                "latest_orders": { "type": "array", "items": object(&["id", "created_at", "user_id", "total_amount", "status"], json!({
                    "id": uuid(),
                    "created_at": timestamp(),
                    "user_id": uuid(),
                    "receiver_name": nullable_string(),
                    "total_amount": money(),
                    "status": status,
                })) },
            }),
        ),
        "MessageResponse": object(&["message"], json!({ "message": string() })),
        "ErrorResponse": object(&["error"], json!({
            "error": object(&["code", "message"], json!({
                "code": string(),
                "message": string(),
                "field": string(),
                "details": { "type": "object" },
            })),
        })),
    })
}

fn parameters(op: &Operation) -> Vec<Value> {
    let path = op
        .path
        .split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| {
            json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": uuid()
            })
        });

    let query = op.query.iter().map(|name| {
        let schema = match *name {
            "only_active" => json!({ "type": "boolean", "default": true }),
            "month" => json!({ "type": "integer", "minimum": 1, "maximum": 12 }),
            _ => json!({ "type": "integer", "minimum": 0 }),
        };
        json!({ "name": name, "in": "query", "required": false, "schema": schema })
    });

    path.chain(query).collect()
}

fn request_body(body: Body) -> Option<Value> {
    match body {
        Body::None => None,
        Body::Json(schema) => Some(json!({
            "required": true,
            "content": { "application/json": { "schema": schema_ref(schema) } }
        })),
        Body::Files(field, many) => {
            let file = json!({ "type": "string", "format": "binary" });
            let property = if many {
                json!({ "type": "array", "items": file })
            } else {
                file
            };
            Some(json!({
                "required": true,
                "content": {
                    "multipart/form-data": {
                        "schema": { "type": "object", "required": [field], "properties": { field: property } }
                    }
                }
            }))
        }
    }
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema_ref("ErrorResponse") } }
    })
}

fn operation_object(op: &Operation) -> Value {
    let mut responses = Map::new();
    let success = match (op.method, op.path) {
        ("post", "/products") => "201",
        ("delete", "/products/{product_id}") | ("delete", "/users/{user_id}") => "204",
        _ => "200",
    };
    let payload = match op.reply {
        Reply::Empty => None,
        Reply::One(name) => Some(schema_ref(name)),
        Reply::Many(name) => Some(json!({ "type": "array", "items": schema_ref(name) })),
    };
    let success_body = match payload {
        Some(schema) => json!({
            "description": "Successful response",
            "content": { "application/json": { "schema": schema } }
        }),
        None => json!({ "description": "Successful response" }),
    };
    responses.insert(success.to_string(), success_body);
    responses.insert("400".to_string(), error_response("Validation error"));

    let security = match op.access {
        Access::Public => Value::Array(Vec::new()),
        _ => {
            responses.insert("401".to_string(), error_response("Authentication required"));
            json!([{ "bearerAuth": [] }])
        }
    };
    if matches!(op.access, Access::Admin | Access::Customer) {
        responses.insert("403".to_string(), error_response("Insufficient role"));
    }

    let mut object = json!({
        "tags": [op.tag],
        "summary": op.summary,
        "parameters": parameters(op),
        "security": security,
        "responses": responses,
    });
    if let (Some(body), Value::Object(map)) = (request_body(op.body), &mut object) {
        map.insert("requestBody".into(), body);
    }
    object
}

/// Build the OpenAPI 3 document for the configured prefix
pub fn openapi_document(title: &str, api_prefix: &str) -> Value {
    let mut paths = Map::new();

    let root = [("/", "Service status"), ("/health", "Health check")];
    for (path, summary) in root {
        paths.insert(
            path.to_string(),
            json!({ "get": { "tags": ["Health"], "summary": summary, "responses": { "200": { "description": "OK" } } } }),
        );
    }

    for op in OPERATIONS {
        let entry = paths
            .entry(format!("{}{}", api_prefix, op.path))
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(op.method.to_string(), operation_object(op));
        }
    }

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": title,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": paths,
        "components": {
            "schemas": component_schemas(),
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            }
        }
    })
}

/// Swagger UI page pointing at `/openapi.json`
pub fn swagger_html(title: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html>
<head>
  <title>{title} - Swagger UI</title>
  <meta charset="utf-8"/>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({{ url: "/openapi.json", dom_id: "#swagger-ui" }});
  </script>
</body>
</html>"##,
        title = title
    )
}

/// ReDoc page pointing at `/openapi.json`
pub fn redoc_html(title: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html>
<head>
  <title>{title} - ReDoc</title>
  <meta charset="utf-8"/>
</head>
<body>
  <redoc spec-url="/openapi.json"></redoc>
  <script src="https://cdn.jsdelivr.net/npm/redoc@next/bundles/redoc.standalone.js"></script>
</body>
</html>"##,
        title = title
    )
}

pub async fn openapi_json(State(state): State<AppState>) -> Json<Value> {
    Json(openapi_document(&state.config.project_name, &state.config.api_v1_str))
}

pub async fn swagger_ui(State(state): State<AppState>) -> Html<String> {
    Html(swagger_html(&state.config.project_name))
}

pub async fn redoc(State(state): State<AppState>) -> Html<String> {
    Html(redoc_html(&state.config.project_name))
}
