pub mod index;
pub mod search;

pub use index::*;
pub use search::*;
