//! Sports Fixture Reconciliation
//!
//! Merges two independently scraped football schedules, one in Arabic and
//! one in Latin script, into a single list with canonical broadcaster
//! channels per fixture.

pub mod cache;
pub mod config;
pub mod logging;
pub mod reconcile;
pub mod retry;
