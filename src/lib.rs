pub mod brands;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod error;
pub mod generator;
pub mod logging;
pub mod probe;
pub mod report;
pub mod similarity;

pub use error::{Error, Result};
