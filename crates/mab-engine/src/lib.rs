//! MAB Engine - scenario execution and batch orchestration
//!
//! Ties the pure core, the Portal automation and the run store together:
//! - Layered configuration (defaults, TOML file, environment, CLI flags)
//! - The per-scenario executor driving the state machine
//! - The batch runner (one sign-in per batch, sequential scenarios,
//!   per-scenario persistence, a summary on every exit path)
//! - Plain-text reporting and tracing set-up for the `mab-bench` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use mab_engine::prelude::*;
//!
//! let config = EngineConfig::load(None)?;
//! let scenarios = select_scenarios(&config)?;
//! let store = Arc::new(JsonlRunStore::open(&config.store.dir).await?);
//! let runner = BatchRunner::new(
//!     ChromiumLauncher::new(config.browser_settings()),
//!     store,
//!     executor_settings(&config),
//!     config.credentials()?.clone(),
//! );
//! let outcome = runner.run(&scenarios, cancel_rx).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod batch;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod report;
pub mod retry;

pub use batch::{
    executor_settings, select_scenarios, BatchEnd, BatchOutcome, BatchRunner, ChromiumLauncher,
    PortalContext, PortalLauncher,
};
pub use config::{BatchSection, BrowserSection, EngineConfig, PortalSection, RuntimeEnv, StoreSection};
pub use error::{ConfigError, EngineError};
pub use executor::{ExecutorSettings, ScenarioAbort, ScenarioExecutor};
pub use logging::LogFormat;
pub use report::{render_records, render_summary};
pub use retry::with_retries;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running batches
    pub use crate::{
        executor_settings, select_scenarios, BatchOutcome, BatchRunner, ChromiumLauncher,
        EngineConfig, EngineError,
    };
    pub use mab_store::{JsonlRunStore, RunStore};
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
