/// Type alias for Result with anyhow::Error as the error type.
/// Infrastructure and glue code use this; the audit core returns `AuditError`.
pub type Result<T> = std::result::Result<T, anyhow::Error>;
