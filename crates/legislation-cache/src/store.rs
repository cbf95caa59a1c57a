//! Key-value interface over cache storage

use crate::error::Result;
use crate::types::SweepReport;
use async_trait::async_trait;
use serde_json::Value;

/// Storage keyed by `(item_type, item_id)`.
///
/// `get` never fails: anything unreadable is a miss.
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn get(&self, item_type: &str, item_id: &str) -> Option<Value>;

    async fn put(&self, item_type: &str, item_id: &str, payload: &Value) -> Result<()>;

    async fn delete(&self, item_type: &str, item_id: &str) -> Result<()>;

    async fn sweep(&self) -> Result<SweepReport>;
}
