pub mod outcome_recorder;

pub use outcome_recorder::{InMemoryOutcomeRecorder, OutcomeRecorder, RecordStatus, RecordedPayment};
