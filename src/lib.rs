//! Threatgraph
//!
//! A rule engine for architecture threat models: it resolves a model of
//! technical assets, data and trust boundaries into a queryable graph, runs
//! a catalog of risk rules over it and reconciles the findings with the
//! reviewers' recorded decisions.

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod explain;
pub mod exporter;
pub mod graph;
pub mod identity;
pub mod models;
pub mod raa;
pub mod rules;
pub mod severity;
pub mod statistics;
pub mod tracking;
pub mod ui;

pub use engine::{AnalysisReport, ThreatAnalyzer};
pub use errors::{ThreatGraphError, ThreatGraphResult};
