//! Field writer
//!
//! The Portal keeps pre-populated values and silently ignores partial
//! overwrites, so a numeric field is cleared several different ways
//! before typing and verified afterwards:
//!
//! 1. focus
//! 2. select-all + delete, three times
//! 3. up to 20 backspaces
//! 4. native clear
//! 5. 10 more backspaces
//! 6. read back; if anything survived, native clear + 30 backspaces
//! 7. type the literal with a per-keystroke delay
//! 8. blur with Tab
//! 9. read back and compare (display formatting ignored)
//!
//! A mismatch repeats the whole sequence once before failing.

use crate::error::PortalError;
use crate::locate::normalise_display_value;
use crate::page::{ElementRef, Key, PortalPage};
use std::time::Duration;
use tracing::{debug, warn};

const SELECT_DELETE_PASSES: usize = 3;
const INITIAL_BACKSPACES: usize = 20;
const FOLLOW_UP_BACKSPACES: usize = 10;
const RESCUE_BACKSPACES: usize = 30;

/// Field writer settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWriterConfig {
    /// Pause after each typed character
    pub keystroke_delay: Duration,
    /// Full clear-write-verify attempts
    pub attempts: u32,
}

impl Default for FieldWriterConfig {
    fn default() -> Self {
        Self {
            keystroke_delay: Duration::from_millis(50),
            attempts: 2,
        }
    }
}

/// Clear-and-type writer with post-write verification
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldWriter {
    config: FieldWriterConfig,
}

impl FieldWriter {
    #[must_use]
    pub fn new(config: FieldWriterConfig) -> Self {
        Self { config }
    }

    /// Write `amount` into a numeric input and verify it stuck
    ///
    /// Returns the verified (normalised) value.
    ///
    /// # Errors
    /// `PortalError::FieldWriteMismatch` after every attempt read back
    /// something else; driver errors pass through.
    pub async fn write_number<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        element: &ElementRef,
        field: &str,
        amount: u64,
    ) -> Result<String, PortalError> {
        let intended = amount.to_string();
        let attempts = self.config.attempts.max(1);
        let mut last_observed = String::new();

        for attempt in 1..=attempts {
            let observed = self.clear_and_type(page, element, &intended).await?;
            if normalise_display_value(&observed) == intended {
                debug!(field, value = %intended, attempt, "Field verified");
                return Ok(intended);
            }
            warn!(
                field,
                intended = %intended,
                observed = %observed,
                attempt,
                "Field read-back mismatch"
            );
            last_observed = observed;
        }

        Err(PortalError::FieldWriteMismatch {
            field: field.to_string(),
            intended,
            observed: last_observed,
        })
    }

    async fn clear_and_type<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        element: &ElementRef,
        literal: &str,
    ) -> Result<String, PortalError> {
        page.scroll_into_view(element).await?;
        page.focus(element).await?;

        for _ in 0..SELECT_DELETE_PASSES {
            page.select_all(element).await?;
            page.press_key(element, Key::Delete).await?;
        }

        for _ in 0..INITIAL_BACKSPACES {
            if page.read_value(element).await?.is_empty() {
                break;
            }
            page.press_key(element, Key::Backspace).await?;
        }

        page.native_clear(element).await?;
        backspaces(page, element, FOLLOW_UP_BACKSPACES).await?;

        if !page.read_value(element).await?.is_empty() {
            page.native_clear(element).await?;
            backspaces(page, element, RESCUE_BACKSPACES).await?;
        }

        for ch in literal.chars() {
            page.type_char(element, ch).await?;
            if !self.config.keystroke_delay.is_zero() {
                tokio::time::sleep(self.config.keystroke_delay).await;
            }
        }
        page.press_key(element, Key::Tab).await?;

        page.read_value(element).await
    }
}

async fn backspaces<P: PortalPage + ?Sized>(
    page: &P,
    element: &ElementRef,
    count: usize,
) -> Result<(), PortalError> {
    for _ in 0..count {
        page.press_key(element, Key::Backspace).await?;
    }
    Ok(())
}
