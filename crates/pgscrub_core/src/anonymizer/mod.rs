pub mod generator;
pub mod memo;
pub mod rules;
pub mod transform;

pub use generator::*;
pub use memo::*;
pub use rules::*;
pub use transform::*;
