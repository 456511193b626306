pub mod descriptor;
pub mod primitives;

pub use descriptor::*;
pub use primitives::*;
