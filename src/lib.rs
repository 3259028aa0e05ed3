
mod data_processing;

pub mod logging;
pub mod model;
pub mod report;
pub mod tools;
pub mod training;

pub use data_processing::*;
