//! Infrastructure layer: storage backends, engines, change feed, config.
//!
//! The domain rules live in `linenroom-supplies`; this crate decides where the
//! data is kept and how each operation becomes one atomic unit of work.

pub mod change_feed;
pub mod config;
pub mod engine;
pub mod reporting;
pub mod store;


pub use change_feed::ChangeFeed;
pub use config::{ConfigError, LinenConfig, StorageConfig};
pub use engine::{
    ClearReceipt, EngineError, FulfillmentEngine, RequestEngine, RequestReceipt, SupplyReceipt,
};
pub use reporting::Reporting;
pub use store::{InMemoryLinenStore, LinenStore, PostgresLinenStore, StoreError, TotalsFilter};
