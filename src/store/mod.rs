/// Data store: typed records over the storage layer plus the change bus
///
/// Every screen and service reads and writes hydration data through
/// `DataStore`; none of them touch the storage backend directly.

pub mod events;
pub mod data_store;

pub use events::{EventBus, StoreEvent, Subscription, Topic};
pub use data_store::{local_today, DataStore, Record};
