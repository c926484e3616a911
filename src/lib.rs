//! Overtime Compliance and Calculation Engine
//!
//! This crate resolves the jurisdiction policy that applies to a shift,
//! turns worked time into auditable overtime lines under that policy's
//! premium ladder and stacking strategy, gates scheduling on rest and
//! fatigue limits, and charges approved overtime against budget caps.
//!
//! [`service::OvertimeService`] is the entry point; [`api`] exposes it over
//! JSON/HTTP.

#![warn(missing_docs)]

pub mod api;
pub mod budget;
pub mod calculation;
pub mod config;
pub mod error;
pub mod fatigue;
pub mod models;
pub mod observability;
pub mod policy;
pub mod repository;
pub mod service;
