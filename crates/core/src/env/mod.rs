pub mod recording;
pub mod snapshot;
pub mod traits;

pub use recording::{Injection, RecordingDocument};
pub use snapshot::{ElementSnapshot, EnvironmentSnapshot};
pub use traits::{Document, ElementInfo, Environment, Location, StorageScope};
