//! # API Route Configuration

use actix_web::web;

use super::handlers;

/// Configure all API routes.
///
/// ## Route Structure
///
/// ```text
/// /
/// ├── /health                          GET  - Health check
/// ├── /vaults                          GET  - Vault balances
/// │   └── /initialize                  POST - Create both vaults (operator)
/// ├── /users                           POST - Prepare new_user
/// │   └── /{authority}                 GET  - User record
/// ├── /swaps                           POST - Prepare new_swap
/// │   ├── /initiate                    POST - Prepare initiate_swap
/// │   ├── /complete                    POST - Prepare complete_swap (operator)
/// │   ├── /{authority}                 GET  - List swaps
/// │   └── /{authority}/{index}         GET  - One swap
/// └── /transactions
///     └── /submit                      POST - Submit signed transaction
/// ```
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::api_info))
        .route("/health", web::get().to(handlers::health_check))
        .service(
            web::scope("/vaults")
                .route("", web::get().to(handlers::get_vaults))
                .route("/initialize", web::post().to(handlers::initialize_vaults)),
        )
        .service(
            web::scope("/users")
                .route("", web::post().to(handlers::register_user))
                .route("/{authority}", web::get().to(handlers::get_user)),
        )
        .service(
            web::scope("/swaps")
                .route("", web::post().to(handlers::open_swap))
                // Literal segments before the {authority} patterns.
                .route("/initiate", web::post().to(handlers::initiate_swap))
                .route("/complete", web::post().to(handlers::complete_swap))
                .route("/{authority}", web::get().to(handlers::list_swaps))
                .route("/{authority}/{sequence_index}", web::get().to(handlers::get_swap)),
        )
        .service(
            web::scope("/transactions")
                .route("/submit", web::post().to(handlers::submit_transaction)),
        );
}
