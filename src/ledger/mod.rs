//! Badge Ledger Module
//!
//! Records which badges each user has earned and answers per-user and global
//! queries, on top of whichever storage strategy was configured at startup.
//!
//! ## Guarantees
//! - **Uniqueness**: a user holds a given badge at most once; the challenge id
//!   does not take part in the key.
//! - **Idempotence**: recording an existing badge is a normal `AlreadyExists`
//!   outcome, never an error, and writes nothing.
//! - **Consistent stats**: totals come from one read of the store.
//!
//! ## Submodules
//! - **`backend`**: The `LedgerBackend` trait every strategy implements.
//! - **`file`**: Whole-collection JSON file, serialized by an async mutex.
//! - **`table`**: Partitioned table store, uniqueness enforced through derived row keys.
//! - **`service`**: `Ledger`, the facade handed to the HTTP layer.
//! - **`types`**: Badge record and operation results.

pub mod backend;
pub mod file;
pub mod service;
pub mod table;
pub mod types;

pub use backend::LedgerBackend;
pub use file::FileLedger;
pub use service::Ledger;
pub use table::TableLedger;
pub use types::{Badge, LedgerStats, RecordOutcome, StorageKind};
