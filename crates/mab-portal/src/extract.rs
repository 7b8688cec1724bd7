//! Lender extraction from the live page

use crate::error::PortalError;
use crate::page::PortalPage;
use mab_core::{extract_from_table, extract_from_text, Extraction, LenderPanel, ResultsTable};
use tracing::{info, warn};

/// Reveal the results and extract lender amounts
///
/// Uses the results table when one is present and falls back to the
/// page text otherwise; the source is recorded on the extraction.
///
/// # Errors
/// Driver errors while reading the page.
pub async fn extract_results<P: PortalPage + ?Sized>(
    page: &P,
    panel: &LenderPanel,
) -> Result<Extraction, PortalError> {
    page.scroll_to_bottom().await?;
    page.wait_for_idle().await?;

    let tables: Vec<ResultsTable> = page.tables().await?.into_iter().map(|s| s.table).collect();
    let from_table = mab_core::find_results_table(&tables).and_then(|t| extract_from_table(panel, t));

    let extraction = match from_table {
        Some(extraction) => extraction,
        None => {
            warn!(tables = tables.len(), "No results table; parsing page text");
            extract_from_text(panel, &page.page_text().await?)
        }
    };

    info!(
        source = ?extraction.source,
        lenders = extraction.lender_count(),
        rows = extraction.rows_seen,
        unmatched = extraction.rows_unmatched,
        rejected = extraction.rows_rejected,
        "Extraction complete"
    );
    Ok(extraction)
}
