/// SQL expression tree and compiler shared by the SQL dialects.
///
/// ```text
/// DialectAdapter
///       ↓
/// Expression / OrderByExpr / SelectItem   (types.rs)
///       ↓
/// SQL text + bound values                 (compiler.rs)
/// ```
pub mod compiler;
pub mod types;

// Re-export key types for convenience
pub use compiler::{compile_expression, compile_select, CompiledQuery, PlaceholderStyle};
pub use types::*;
