/* 📖 # Why have routebook_base as a separate crate?
routebook_base holds the pieces every other crate needs: the error type, tracing setup and the
HTTP primitives that route handlers consume and produce. The engine and the CLI depend on it,
never the other way round.
*/

pub mod error;
pub mod http;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, ResultExt, RoutebookError, RoutebookResult};
