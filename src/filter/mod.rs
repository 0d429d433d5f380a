pub mod types;
pub mod filter;
pub mod filter_where;
pub mod filter_order;
pub mod params;
pub mod error;

pub use error::FilterError;
pub use filter::Filter;
pub use params::QueryRequest;
pub use types::*;
