//! PathForge Client - Roadmap Generation and Progress Tracking
//!
//! The engine behind the PathForge UI:
//! - Webhook-triggered roadmap generation with a bounded polling loop
//! - Tolerant normalization of externally-written task rows
//! - Optimistic task-status toggles with write-through to the record store
//! - A view-state machine (`idle → submitting → polling → completed | error`)
//!   that a UI layer observes to decide what to render
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Coordinator                │
//! │  (state machine, cached roadmap,        │
//! │   session persistence)                  │
//! └───────┬─────────────────┬───────────────┘
//!         │                 │
//!         ▼                 ▼
//! ┌──────────────┐   ┌──────────────┐
//! │   Planner    │   │ RoadmapStore │
//! │  (webhook    │   │  (Airtable   │
//! │   trigger)   │   │   records)   │
//! └──────────────┘   └──────┬───────┘
//!                           │
//!                    ┌──────▼───────┐
//!                    │ PollRegistry │
//!                    │ (one session │
//!                    │  per user)   │
//!                    └──────────────┘
//! ```
//!
//! Data flows one way per generation cycle: form fields go out through the
//! planner webhook, the external automation writes task rows out of band, the
//! poller reads them back, and the coordinator caches the projection. Task
//! toggles flow the opposite direction as direct record patches.

pub mod classify;
pub mod config;
pub mod coordinator;
pub mod planner;
pub mod poll;
pub mod request;
pub mod roadmap;
pub mod session;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use classify::{classify, ErrorCategory};
pub use config::{AirtableConfig, Config, ConfigError, PlannerConfig, SessionConfig};
pub use coordinator::{Coordinator, CoordinatorError, GenerationState, GenerationStatus};
pub use planner::{MockPlanner, Planner, PlannerError, SubmissionReceipt, WebhookPlanner};
pub use poll::{CancelHandle, PollConfig, PollError, PollHandle, PollProgress, PollRegistry};
pub use request::{generate_user_id, RoadmapRequest, ValidationError};
pub use session::{FileSessionStore, MemorySessionStore, SessionState, SessionStore};
pub use store::{AirtableStore, MockStore, RoadmapStore, StoreError};
pub use types::*;
