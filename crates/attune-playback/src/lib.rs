pub mod device;
pub mod engine;
pub mod ledger;
pub mod sink;

pub use device::CpalSink;
pub use engine::{PlaybackEngine, PlaybackEvent};
pub use ledger::PlayedLedger;
pub use sink::{AudioSink, MemorySink, PlayOutcome, SinkError};
