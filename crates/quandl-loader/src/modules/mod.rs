//! 데이터셋 적재 모듈.

pub mod load;
pub mod provision;
pub mod registry;
pub mod resolve;
pub mod sync;

pub use load::{DatasetLoader, TableCatalog};
pub use provision::ensure_table;
pub use registry::{credentials_api_key, fetch_dataset_spec, resolve_api_key};
pub use resolve::resolve_codes;
pub use sync::{fetch_all, fetch_incremental, rows_to_items};
