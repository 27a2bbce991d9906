use crate::record::EntityRecord;
use crate::Result;
use async_trait::async_trait;

/// The entity store collaborator. The core reads a complete record set
/// through this seam and never writes back; rate limiting, retries and
/// caching all live behind the implementation.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn load_records(&self) -> Result<Vec<EntityRecord>>;
}
