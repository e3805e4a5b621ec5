//! # Services Module
//!
//! Business logic of the operator service.
//!
//! ## Services Overview
//!
//! | Service | Responsibility |
//! |---------|---------------|
//! | `SwapManager` | Vaults, users and the swap lifecycle |
//! | `TransactionBuilder` | Bridge instructions and transactions |
//! | `TransactionSubmitter` | Admin co-signing and submission |
//! | `SwapMonitor` | Index reconciliation, stuck-swap warnings |
//!
//! ## Service Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SERVICES LAYER                           │
//! │                                                                 │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                     SwapManager                          │   │
//! │  │  • register_user()  • open_swap()  • initiate_swap()     │   │
//! │  │  • complete_swap()  • submit_transaction()               │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                              │                                  │
//! │         ┌────────────────────┼────────────────────┐             │
//! │         ▼                    ▼                    ▼             │
//! │  ┌────────────┐      ┌─────────────┐       ┌────────────┐       │
//! │  │Transaction │      │ Transaction │       │    Swap    │       │
//! │  │  Builder   │      │  Submitter  │       │  Monitor   │       │
//! │  └────────────┘      └─────────────┘       └────────────┘       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod swap_manager;
pub mod swap_monitor;
pub mod transaction_builder;
pub mod transaction_submitter;

pub use swap_manager::{SwapManager, SwapServiceError};
pub use swap_monitor::SwapMonitor;
pub use transaction_submitter::TransactionSubmitter;
