pub mod eia;
pub mod store;

pub use eia::*;
pub use store::*;
