//! Launch an interpreter script selected by a logical identifier and relay its
//! output line by line.

pub mod api;
pub mod config;
pub mod error;
pub mod runner;
