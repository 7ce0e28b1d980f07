//! Scan orchestration and lead post-processing for LeadMatrix.
//!
//! This crate ties geolocation, the extraction engine, and the response
//! parser into one scan (`pipeline::execute_scan`), and owns the
//! derived views of a lead set: fidelity scores and CSV export.

pub mod export;
pub mod fidelity;
pub mod geo;
pub mod pipeline;
