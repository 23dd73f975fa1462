//! Result extension trait for logging errors with context.
//!
//! Used where an error is reported and then dropped, such as background run
//! tasks and event routing.

use std::fmt::Display;
use tracing::error;

/// Extension trait for logging errors with context.
pub trait ResultExt<T, E> {
    /// Log the error with context and caller location if this is an `Err`.
    ///
    /// Returns the original `Result` unchanged.
    ///
    /// ```ignore
    /// use bss_workflow_engine::result_ext::ResultExt;
    ///
    /// let _ = controller.run(execution_id).await.log("running execution");
    /// ```
    fn log<S: ToString>(self, context: S) -> Result<T, E>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn log<S: ToString>(self, context: S) -> Result<T, E> {
        if let Err(ref e) = self {
            let caller_location = std::panic::Location::caller();
            error!(
                target: "bss_workflow_engine",
                error = %e,
                file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                context = %context.to_string(),
                "Operation failed"
            );
        }
        self
    }
}
