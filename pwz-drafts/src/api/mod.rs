//! HTTP API handlers for pwz-drafts

pub mod drafts;
pub mod error;
pub mod events;
pub mod health;
pub mod steps;

pub use drafts::{create_draft, get_draft, list_drafts, publish_draft, save_section};
pub use error::{ApiError, ApiResult};
pub use events::event_stream;
pub use health::health_routes;
pub use steps::list_steps;
