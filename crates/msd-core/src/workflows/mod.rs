//! # Workflows Module
//!
//! Complete sampling procedures built on the [`engine`](crate::engine).
//!
//! ## Architecture
//!
//! - **Simulation Workflow** ([`simulate`]) - Batched runs with optional
//!   temperature and field ramps, pausing at every checkpoint so the caller can
//!   report progress or cancel.

pub mod simulate;
