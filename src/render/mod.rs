//! Human-readable text rendering of query results.
//!
//! - [`format_table`] - aligned columns for tabular results
//! - [`render_text`] - indented narrative for arbitrary JSON
//! - [`render_plan`] - operator tree for Cypher query plans

mod plan;
mod table;
mod text;

pub use plan::{render_plan, PlanNode};
pub use table::{cell_text, format_table, rows_from_objects};
pub use text::{render_text, EMPTY_ARRAY, EMPTY_OBJECT};
