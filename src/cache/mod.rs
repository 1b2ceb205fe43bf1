pub mod store;

pub use store::{InsertOutcome, SeaOrmTrackStore, TrackStore};
