pub mod aggregate;
pub mod config;
pub mod date;
pub mod discovery;
pub mod error;
pub mod parser;
pub mod render;
pub mod report;
pub mod runner;
pub mod source;

pub use error::{Error, Result};
