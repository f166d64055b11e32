//! Match lifecycle notifications

pub mod publisher;

pub use publisher::{event_name, EventPublisher, RecordingEventPublisher, TracingEventPublisher};
