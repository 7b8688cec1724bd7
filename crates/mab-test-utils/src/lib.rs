//! Testing utilities for the MAB workspace
//!
//! A scripted Portal (`FakePortal`) plus scenario and results fixtures.

#![allow(missing_docs)]

pub mod fixtures;
pub mod portal;

pub use fixtures::{case_ref, expected_amount, panel_rows, scenario};
pub use portal::{
    FakeCase, FakePortal, FakePortalConfig, FakeResults, FakeRow, BASE_URL, PASSWORD, USERNAME,
};

use mab_portal::{Credentials, NavigatorConfig};

/// Navigator settings pointing at the fake Portal
#[must_use]
pub fn navigator_config() -> NavigatorConfig {
    NavigatorConfig::new(BASE_URL)
}

/// Credentials the fake Portal accepts
#[must_use]
pub fn credentials() -> Credentials {
    Credentials::new(USERNAME, PASSWORD.to_string().into())
}
