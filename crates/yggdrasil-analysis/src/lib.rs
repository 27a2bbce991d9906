pub mod analyzer;
pub mod centrality;
pub mod community;
pub mod consensus;

pub use analyzer::*;
pub use centrality::*;
pub use community::*;
pub use consensus::*;
