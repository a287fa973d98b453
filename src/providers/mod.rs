pub mod eurostat;
pub mod nbp;
pub mod util;
pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;

/// Source of the raw housing workbook bytes. The production implementation
/// downloads from NBP; tests feed fixture bytes through the same seam.
#[async_trait]
pub trait WorkbookSource: Send + Sync {
    async fn fetch_workbook(&self) -> Result<Vec<u8>>;
}
