pub mod error;
pub mod record;
pub mod region;
pub mod store;

pub use error::{Result, StoreError};
pub use record::{NewRecord, Record};
pub use region::Region;
pub use store::{RegionStore, StoreId, StoreSet};
