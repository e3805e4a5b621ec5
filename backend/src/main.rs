//! # Fiat Bridge Operator Service
//!
//! Off-chain side of the fiat bridge. The operator:
//!
//! - Prepares bridge transactions, co-signed by the admin key
//! - Submits them once the user has signed
//! - Indexes users and swaps in PostgreSQL
//! - Reconciles the index with the chain in the background
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        OPERATOR SERVICE                         │
//! │                                                                 │
//! │  ┌─────────────────────────┐    ┌─────────────────────────────┐ │
//! │  │  REST API (Actix)       │    │  Background                 │ │
//! │  │  /vaults  /users        │    │  • Swap Monitor             │ │
//! │  │  /swaps   /transactions │    │                             │ │
//! │  └─────────────────────────┘    └─────────────────────────────┘ │
//! │              │                                │                 │
//! │  ┌───────────┴────────────────────────────────┴──────────────┐  │
//! │  │                      SERVICE LAYER                        │  │
//! │  │  ┌─────────────┐ ┌──────────────┐ ┌────────────────────┐  │  │
//! │  │  │ SwapManager │ │ TxBuilder    │ │ TxSubmitter        │  │  │
//! │  │  └─────────────┘ └──────────────┘ └────────────────────┘  │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                            │                                    │
//! │         ┌──────────────────┴───────────────┐                    │
//! │  ┌──────┴──────┐                    ┌──────┴──────┐             │
//! │  │  PostgreSQL │                    │   Solana    │             │
//! │  │  Index      │                    │   RPC       │             │
//! │  └─────────────┘                    └─────────────┘             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! 1. Create the PostgreSQL database
//! 2. Copy `.env.example` to `.env` and fill in mints and the admin keypair
//! 3. Start the server: `cargo run` (migrations run on startup)
//! 4. `POST /vaults/initialize` once per deployment, with `X-Operator-Key`

use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use api::auth::OperatorKey;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod db;
mod models;
mod services;
mod solana;
mod utils;

use config::AppConfig;
use db::Database;
use services::{SwapManager, SwapMonitor, TransactionSubmitter};
use solana::SolanaClient;

/// Application state shared across all handlers.
pub struct AppState {
    /// Database connection pool for PostgreSQL
    pub db: Database,

    /// Solana RPC client for chain reads
    pub solana: SolanaClient,

    /// Vault, user and swap operations
    pub swap_manager: SwapManager,

    /// Application configuration
    pub config: AppConfig,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // =========================================
    // STEP 1: Initialize Logging
    // =========================================
    // RUST_LOG overrides the default filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fiat_bridge_backend=debug")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("🚀 Starting Fiat Bridge Operator Service");

    // =========================================
    // STEP 2: Load Configuration
    // =========================================
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().expect("Failed to load configuration");

    info!("📋 Configuration loaded");
    info!("   Solana RPC: {}", config.solana_rpc_url);
    info!("   Program ID: {}", config.bridge_program_id);
    info!("   USDC mint:  {}", config.usdc_mint);
    info!("   USDT mint:  {}", config.usdt_mint);

    // =========================================
    // STEP 3: Initialize Database
    // =========================================
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    info!("🗄️  Database connected");

    db.run_migrations().await.expect("Failed to run migrations");

    info!("📦 Database migrations complete");

    // =========================================
    // STEP 4: Initialize Solana Client and Admin Key
    // =========================================
    let solana = SolanaClient::new(&config).expect("Failed to create Solana client");
    let submitter = TransactionSubmitter::new(&config).expect("Failed to load admin keypair");

    info!("⛓️  Solana client initialized (admin {})", submitter.admin_pubkey());

    // =========================================
    // STEP 5: Create Application State
    // =========================================
    let swap_manager = SwapManager::new(db.clone(), solana.clone(), submitter);

    let app_state = Arc::new(AppState {
        db,
        solana,
        swap_manager,
        config: config.clone(),
    });

    // =========================================
    // STEP 6: Start Swap Monitor
    // =========================================
    let monitor = SwapMonitor::new(
        app_state.db.clone(),
        app_state.solana.clone(),
        app_state.config.clone(),
    );
    tokio::spawn(async move {
        monitor.start().await;
    });

    info!("👁️  Swap monitor started");

    // =========================================
    // STEP 7: Start HTTP Server
    // =========================================
    let server_host = config.server_host.clone();
    let server_port = config.server_port;
    let operator_key = web::Data::new(OperatorKey::new(config.operator_api_key.clone()));

    info!("🌐 Starting HTTP server on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(operator_key.clone())
            .wrap(middleware::Logger::default())
            .configure(api::configure_routes)
    })
    .bind(format!("{}:{}", server_host, server_port))?
    .run()
    .await
}
