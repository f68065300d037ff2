pub mod app;
pub mod cli;
pub mod config;
pub mod identity;
pub mod order;
pub mod reminder;
pub mod reorder;
pub mod store;
pub mod sync;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use store::{Item, ItemId, ItemStore, Namespace};
pub use sync::{ListSynchronizer, SyncError};
