//! Transit Trip-Planner E2E Checks
//!
//! A scripted browser check against the public Transit trip-planner page:
//! drives a headless Chromium over the DevTools Protocol through a fixed
//! itinerary-search workflow, asserts observable page state, and records a
//! URL log line plus a full-page screenshot per run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CheckRunner                             │
//! │    ├── preflight()        target reachability probe         │
//! │    ├── run(scenarios)     sequential, one page each         │
//! │    └── write_summary()    test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (fixed)                                           │
//! │    ├── HappyPath    ≥1 itinerary + walking-only option      │
//! │    ├── ArriveBy     tomorrow 12:00 PM, ≥N transit rows      │
//! │    └── OutOfRange   exact "You're going too far!" banner    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TripPlannerPage    locators + interaction sequences        │
//! │  PageHandle         condition-based waits over the CDP      │
//! │  ArtifactWriter     daily URL log + per-scenario screenshot │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The subject is an external, uncontrolled site, so the live scenarios run
//! only behind the `TRANSIT_E2E=1` gate; everything below the session layer
//! is unit-tested offline.

pub mod artifacts;
pub mod browser;
pub mod config;
pub mod error;
pub mod pages;
pub mod runner;
pub mod scenarios;

pub use config::CheckConfig;
pub use error::{E2eError, E2eResult};
pub use runner::CheckRunner;
pub use scenarios::Scenario;
