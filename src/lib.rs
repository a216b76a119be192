pub mod error;
pub mod extract;
pub mod load;
pub mod structs;
pub mod transform;

// Re-export public API
pub use error::{PipelineError, Result};
pub use extract::{extract, extract_from_reader};
pub use load::{is_safe_identifier, load};
pub use structs::{EventSink, Frame, LogSink, SimpleLogger, StepEvent, TransformConfig, Value};
pub use transform::transform;
