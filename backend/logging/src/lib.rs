//! Structured logging for the cvgate service.
//!
//! Handles subscriber setup (console + rolling NDJSON file) and redaction of
//! credentials and applicant phone numbers before strings reach the logs.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_sensitive_data;
