//! Route definitions for the Amoura storefront API

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};

use crate::{handlers, AppState};

/// Multipart bodies may carry several images of up to 5 MiB each
const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

/// Create API routes, mounted under the configured prefix
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .route("/admin/stats", get(handlers::dashboard_stats))
}

/// Profile routes (authenticated) and user management (admin)
fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/me",
            get(handlers::get_me)
                .post(handlers::complete_me)
                .patch(handlers::update_me),
        )
        .route("/", get(handlers::list_users))
        .route("/:user_id", get(handlers::get_user).delete(handlers::delete_user))
        .route("/:user_id/role", patch(handlers::update_user_role))
}

/// Catalog routes: reads are public, writes need an admin
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .patch(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/images", get(handlers::list_product_images))
        .route("/:product_id/hero-image", post(handlers::upload_hero_image))
        .route("/:product_id/gallery", post(handlers::upload_gallery_images))
        .route(
            "/:product_id/gallery/:image_id",
            delete(handlers::delete_gallery_image),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

/// Cart routes (customers)
fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::get_cart)
                .post(handlers::add_to_cart)
                .delete(handlers::clear_cart),
        )
        .route(
            "/:product_id",
            patch(handlers::update_cart_item).delete(handlers::remove_cart_item),
        )
}

/// Checkout and order history (customers), fulfilment (admin)
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(handlers::checkout))
        .route("/me", get(handlers::list_my_orders))
        .route("/me/:order_id", get(handlers::get_my_order))
        .route("/", get(handlers::list_orders))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/status", patch(handlers::update_order_status))
}
