//! Event emission for observability.
//!
//! The executor emits one [`PipelineEvent::StepAttempted`] per attempt and the
//! orchestrator emits run lifecycle events. Any number of [`EventSink`]s can
//! consume them; the metrics sink is one of them.

mod event;
mod sink;

pub use event::PipelineEvent;
pub use sink::{CollectingEventSink, EventSink, FanoutEventSink, LoggingEventSink, NoOpEventSink};
