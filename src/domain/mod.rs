pub mod scenario;
pub mod types;

pub use scenario::*;
pub use types::*;
