//! Application state module

mod app_state;
mod forms;
mod workflow;

pub use app_state::*;
pub use forms::*;
pub use workflow::*;
