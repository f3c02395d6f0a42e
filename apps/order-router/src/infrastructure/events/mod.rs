//! Audit event publishers.

mod recording;
mod tracing_publisher;

pub use recording::RecordingEventPublisher;
pub use tracing_publisher::TracingEventPublisher;
