pub mod config;
pub mod error;
pub mod record;
pub mod store;
pub mod traits;
pub mod types;
pub mod validation;

pub use config::*;
pub use error::*;
pub use record::*;
pub use store::*;
pub use traits::*;
pub use types::*;
pub use validation::*;

/// External cancellation signal, polled between independent work units.
pub use tokio_util::sync::CancellationToken;
