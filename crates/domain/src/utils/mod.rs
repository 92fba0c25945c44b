//! Pure utility functions with no I/O dependencies

pub mod geo;
