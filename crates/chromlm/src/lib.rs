//! Request orchestration and the command-line surface for chromlm.
//!
//! [`context::AppContext`] owns configuration, settings and the history
//! ledger; [`orchestrator::Orchestrator`] sequences analysis requests per
//! surface; [`messaging`] and [`cli`] are the two ways in.

pub mod cli;
pub mod context;
pub mod messaging;
pub mod orchestrator;
pub mod render;
pub mod tracing_setup;
pub mod user_config;

pub use context::AppContext;
pub use messaging::{Message, MessageResponse, dispatch};
pub use orchestrator::{Orchestrator, Phase, RequestOutcome, Surface};
pub use user_config::UserConfig;
