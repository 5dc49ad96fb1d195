// Application layer - per-account locking and ledger use cases.

pub mod error;
pub mod lock;
pub mod service;

pub use error::*;
pub use lock::*;
pub use service::*;
