pub mod application;
pub mod cart;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod models;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use application::checkout_service::CheckoutService;
pub use cart::SessionCarts;
pub use db::{create_pool, DbPool};
pub use infrastructure::checkout_store::DieselCheckoutStore;

/// The checkout service as wired in production: diesel-backed storage.
pub type AppCheckoutService = CheckoutService<DieselCheckoutStore>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::cart::get_cart,
        handlers::cart::add_item,
        handlers::cart::set_quantity,
        handlers::cart::remove_item,
        handlers::cart::clear_cart,
        handlers::cart::checkout,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::list_products,
        handlers::products::update_product,
        handlers::products::adjust_stock,
        handlers::products::list_inventory_logs,
        handlers::suppliers::create_supplier,
        handlers::suppliers::get_supplier,
        handlers::suppliers::list_suppliers,
        handlers::suppliers::update_supplier,
        handlers::purchase_orders::create_purchase_order,
        handlers::purchase_orders::get_purchase_order,
        handlers::purchase_orders::list_purchase_orders,
        handlers::purchase_orders::receive_purchase_order,
        handlers::shipments::create_shipment,
        handlers::shipments::get_shipment,
        handlers::shipments::mark_delivered,
    ),
    tags(
        (name = "cart", description = "Session carts and checkout"),
        (name = "orders", description = "Placed orders"),
        (name = "products", description = "Catalog and inventory"),
        (name = "suppliers", description = "Supplier management"),
        (name = "purchase-orders", description = "Purchasing and stock receiving"),
        (name = "shipments", description = "Shipment tracking"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    // Shared across workers: carts live in process memory, and the
    // checkout service is stateless over the pool.
    let carts = web::Data::new(SessionCarts::new());
    let checkout = web::Data::new(CheckoutService::new(DieselCheckoutStore::new(pool.clone())));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(carts.clone())
            .app_data(checkout.clone())
            .wrap(Logger::default())
            .service(
                web::scope("/carts")
                    .route("/{session_id}", web::get().to(handlers::cart::get_cart))
                    .route("/{session_id}", web::delete().to(handlers::cart::clear_cart))
                    .route("/{session_id}/items", web::post().to(handlers::cart::add_item))
                    .route(
                        "/{session_id}/items/{product_id}",
                        web::put().to(handlers::cart::set_quantity),
                    )
                    .route(
                        "/{session_id}/items/{product_id}",
                        web::delete().to(handlers::cart::remove_item),
                    )
                    .route(
                        "/{session_id}/checkout",
                        web::post().to(handlers::cart::checkout),
                    ),
            )
            .service(
                web::scope("/orders")
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route(
                        "/{order_id}/shipment",
                        web::post().to(handlers::shipments::create_shipment),
                    )
                    .route(
                        "/{order_id}/shipment",
                        web::get().to(handlers::shipments::get_shipment),
                    ),
            )
            .service(
                web::scope("/products")
                    .route("", web::post().to(handlers::products::create_product))
                    .route("", web::get().to(handlers::products::list_products))
                    .route("/{id}", web::get().to(handlers::products::get_product))
                    .route("/{id}", web::put().to(handlers::products::update_product))
                    .route(
                        "/{id}/stock-adjustments",
                        web::post().to(handlers::products::adjust_stock),
                    )
                    .route(
                        "/{id}/inventory-logs",
                        web::get().to(handlers::products::list_inventory_logs),
                    ),
            )
            .service(
                web::scope("/suppliers")
                    .route("", web::post().to(handlers::suppliers::create_supplier))
                    .route("", web::get().to(handlers::suppliers::list_suppliers))
                    .route("/{id}", web::get().to(handlers::suppliers::get_supplier))
                    .route("/{id}", web::put().to(handlers::suppliers::update_supplier)),
            )
            .service(
                web::scope("/purchase-orders")
                    .route(
                        "",
                        web::post().to(handlers::purchase_orders::create_purchase_order),
                    )
                    .route(
                        "",
                        web::get().to(handlers::purchase_orders::list_purchase_orders),
                    )
                    .route(
                        "/{id}",
                        web::get().to(handlers::purchase_orders::get_purchase_order),
                    )
                    .route(
                        "/{id}/receive",
                        web::post().to(handlers::purchase_orders::receive_purchase_order),
                    ),
            )
            .service(
                web::scope("/shipments").route(
                    "/{id}/delivered",
                    web::post().to(handlers::shipments::mark_delivered),
                ),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
