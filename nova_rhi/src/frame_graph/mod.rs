/// Frame graph module - pass DAG and executable compilation

// Module declarations
pub mod pass;
pub mod graph;

// Re-exports
pub use pass::*;
pub use graph::*;
