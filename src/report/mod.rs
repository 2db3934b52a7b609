//! Report generation modules.

pub mod generator;
pub mod writer;

pub use generator::*;
pub use writer::*;
