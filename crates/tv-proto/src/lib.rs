//! Live-TV catalog core: playlist parsing, concurrent catalog loading, the
//! filtered catalog store and the zapping cursor, plus the wire protocol the
//! daemon speaks to front ends.

pub mod catalog;
pub mod config;
pub mod fetch;
pub mod health;
pub mod navigation;
pub mod platform;
pub mod playlist;
pub mod protocol;
pub mod registry;
pub mod state;

pub use catalog::{CatalogStore, ALL_CATEGORIES};
pub use fetch::{CatalogFetcher, Partition};
pub use navigation::Navigator;
pub use playlist::parse_playlist;
pub use protocol::{Channel, TvState};
pub use state::{LoadTicket, StateManager};
