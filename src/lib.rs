//! Achievement Ledger Library
//!
//! Core of the achievement service: records which badges users have earned
//! and answers per-user and aggregate queries. The binary (`main.rs`) wires
//! these modules into an HTTP server.
//!
//! ## Architecture Modules
//! - **`ledger`**: The badge ledger. One interface (`LedgerBackend`) with a
//!   file-backed and a table-backed strategy, selected once at startup and
//!   exposed through the `Ledger` facade.
//! - **`storage`**: A partitioned table store abstraction with an in-memory
//!   implementation and an Azure Table Storage REST client.
//! - **`api`**: Axum handlers for creating badges, listing a user's badges
//!   and reporting service status.
//! - **`config`**: Startup configuration from environment and flags.

pub mod api;
pub mod config;
pub mod ledger;
pub mod storage;
