pub mod model;
pub mod result;
pub mod solver;
pub mod sweep;

pub use model::*;
pub use result::*;
pub use solver::*;
pub use sweep::*;
