//! HTTP gateway for CV intake.
//!
//! Exposes the upload endpoint, routes each payload through the risk
//! scanner, and persists it into the safe or unsafe container.

pub mod health_api;
pub mod intake;
pub mod processor;
pub mod server;
pub mod uploads;

pub use intake::IntakeService;
pub use processor::{RescanJob, RescanProcessor};
pub use server::{build_router, start_server, AppState};
