//! UI module - text console rendering of the sensor grid

mod console;

pub use console::{render_grid, status_color};
