pub mod comm;
pub mod config;
pub mod topo;
pub mod tuning;

pub use tuning::TuningError;
