pub mod config;
pub mod error;
pub mod manipulation;
pub mod pipeline;
pub mod shapes;

pub use error::{Error, Result};
