//! # Transform Rules
//!
//! The submodules contain the per-column rules applied by the preprocessing step.

pub mod categorical_encoding;
pub mod discretization;
pub mod imputation;
pub mod label;
pub mod scaling;
