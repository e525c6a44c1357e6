pub mod column;
pub mod config;
pub mod task;

pub use column::*;
pub use config::*;
pub use task::*;
