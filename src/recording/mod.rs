//! Recording data: schema, persistence boundary and the load pipeline

pub mod fetch;
pub mod loader;
pub mod schema;
pub mod store;

pub use fetch::{HttpLogFetcher, LogFetcher, NoopLogFetcher};
pub use loader::{DataAvailability, FamilySource, LoadedRecording, RecordingLoader};
pub use schema::{
    ConsoleLevel, ConsoleLogEntry, NetworkLogEntry, Recording, RecordingMetadata, ReplayEvent,
    Timestamped,
};
pub use store::{BundleRecordingStore, MemoryRecordingStore, RecordingStore};
