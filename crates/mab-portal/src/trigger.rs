//! Recomputation trigger

use crate::error::PortalError;
use crate::locate;
use crate::page::PortalPage;
use tracing::{info, warn};

/// Click the recompute control exactly once
///
/// Returns `false` when the page has no such control; the caller marks
/// the result as possibly stale instead of retrying.
///
/// # Errors
/// Driver errors while clicking.
pub async fn trigger_recompute<P: PortalPage + ?Sized>(page: &P) -> Result<bool, PortalError> {
    let controls = page.controls().await?;
    let Some(control) = locate::find_recompute_control(&controls) else {
        warn!("No recomputation control on the page; results may be cached");
        return Ok(false);
    };
    let element = control.element.clone();
    info!(control = %control.text, play_icon = control.has_play_icon, "Triggering recomputation");

    page.scroll_into_view(&element).await?;
    page.click(&element).await?;
    page.wait_for_idle().await?;
    Ok(true)
}
