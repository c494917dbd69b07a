//! HTTP service hosting the lead intake endpoint.

pub mod api;
pub mod cli;
pub mod pipeline;
pub mod server;
pub mod telemetry;

pub use api::AppState;
pub use pipeline::{LeadIntake, LeadIntakeBuilder, Outcome};
pub use server::{create_router, run_server};
