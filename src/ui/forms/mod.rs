//! Form rendering module
//!
//! - `field_renderer`: field and key-value row rendering
//! - `kv_panel`: the four editable report panels
//! - `submit_form`: bound forms with their submit button and status line

mod field_renderer;
mod kv_panel;
mod submit_form;

pub use field_renderer::draw_field;
pub use kv_panel::draw_kv_panel;
pub use submit_form::draw_submit_form;
