//! riskfeed-core: transaction risk enrichment and reporting.
//!
//! Data flow:
//!   raw CSV snapshot → ingest (validate/coerce) → pipeline (join, dedup,
//!   classify) → sink (atomic CSV publish or SQLite load) → consumers
//!   (store queries, charts, dashboard).

pub mod aggregate;
pub mod cache;
pub mod charts;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod generator;
pub mod ingest;
pub mod model;
pub mod parse;
pub mod pipeline;
pub mod risk;
pub mod rng;
pub mod sink;
pub mod store;
pub mod table;
pub mod types;
