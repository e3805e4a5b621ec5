//! # REST API Module
//!
//! HTTP endpoints of the fiat bridge operator service.
//!
//! ## Endpoint Overview
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/vaults` | Vault addresses and balances |
//! | POST | `/vaults/initialize` | Create both vaults (operator) |
//! | POST | `/users` | Prepare `new_user` |
//! | GET | `/users/{authority}` | User record |
//! | POST | `/swaps` | Prepare `new_swap` |
//! | POST | `/swaps/initiate` | Prepare `initiate_swap` |
//! | POST | `/swaps/complete` | Prepare `complete_swap` (operator) |
//! | GET | `/swaps/{authority}` | List swaps |
//! | GET | `/swaps/{authority}/{index}` | One swap |
//! | POST | `/transactions/submit` | Submit a signed transaction |
//! | GET | `/health` | Health check |
//!
//! "Prepare" endpoints return a transaction already signed by the admin.
//! The authority signs it and posts it to `/transactions/submit`.
//!
//! Endpoints marked (operator) need the `X-Operator-Key` header, see [`auth`].

pub mod auth;
pub mod handlers;
pub mod routes;

pub use routes::configure_routes;
