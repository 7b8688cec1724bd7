//! MAB Portal - driving the broker Portal
//!
//! Everything that touches the Portal sits behind the [`PortalPage`] trait:
//! - Browser session lifecycle and headless detection
//! - Sign-in, case lookup and the walk to the income section
//! - The clear-write-verify field writer
//! - Income and unsecured-loan field writing
//! - Recomputation trigger, results waiter and extraction
//! - Waypoint screenshots
//!
//! Text heuristics for finding elements live in [`locate`]; the
//! Chromium implementation of the seam lives in [`chromium`].

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod browser;
pub mod chromium;
pub mod error;
pub mod extract;
pub mod income;
pub mod locate;
pub mod navigator;
pub mod page;
pub mod screenshots;
pub mod trigger;
pub mod waiter;
pub mod writer;

pub use browser::{detect_headless, parse_flag, BrowserSession, BrowserSettings};
pub use chromium::ChromiumPage;
pub use error::PortalError;
pub use extract::extract_results;
pub use income::{write_credit, write_income, WrittenField};
pub use navigator::{Credentials, NavigatorConfig, PortalNavigator};
pub use page::{ControlDescriptor, ControlKind, ElementRef, InputDescriptor, Key, PortalPage, TableSnapshot};
pub use screenshots::{ScreenshotSink, Waypoint};
pub use trigger::trigger_recompute;
pub use waiter::wait_for_results;
pub use writer::{FieldWriter, FieldWriterConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
