//! Confirms that a work item exists in Azure DevOps.

use tracing::info;

use crate::devops::{self, OrgConnection, WorkItem};
use crate::error::Result;

/// Fetch the work item by numeric id and confirm it exists.
///
/// Connection problems, a missing item, and any other fetch failure come
/// back as distinct error kinds; callers report them and decide the exit
/// status, nothing is retried here.
pub async fn validate_work_item(org: &OrgConnection, id: u64) -> Result<WorkItem> {
    info!(work_item_id = id, "validating work item exists");

    let client = devops::connect(org).await?;
    let item = client.work_item(id).await?;

    info!(work_item_id = item.id, "work item exists");
    Ok(item)
}
