pub mod cache;
pub mod core;
pub mod outcome;

pub use cache::LoadCache;
pub use self::core::ResourceLoader;
pub use outcome::{LoadReceipt, LoadResult, LoadStatus};
