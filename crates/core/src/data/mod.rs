pub mod caches;
pub mod loader;
pub mod resolver;

pub use caches::{CacheKind, DataCaches, PlatformLayout, StationTable, TravelTimeTable};
pub use loader::{load_data_dir, LoadedData};
pub use resolver::{DataResolver, DataTier, LookupKey, Resolved, TravelKey};
