//! Python bindings for the dynamic stock model.
//!
//! The engine lives in `dsm-core`; this crate only converts between numpy
//! arrays and the core types.

pub mod python;
