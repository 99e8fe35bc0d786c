use derive_more::{Constructor, Display};
use serde::{Deserialize, Serialize};

/// Request to halt the venue's active trading phase on every listing.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct HaltPhaseRequest {
    /// Whether order cancellations remain allowed while halted.
    pub allow_cancels: bool,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum HaltPhaseResult {
    Halted,
    AlreadyHaltedByRequest,
    NoActivePhase,
    UnableToHalt,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct HaltPhaseReply {
    pub result: HaltPhaseResult,
}

/// Request to terminate a previously requested halt.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct ResumePhaseRequest;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum ResumePhaseResult {
    Resumed,
    NoRequestedHalt,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct ResumePhaseReply {
    pub result: ResumePhaseResult,
}

/// Request to persist the matching-engine state of every listing.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct StoreMarketStateRequest;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum StoreMarketStateResult {
    Stored,
    PersistenceDisabled,
    PersistenceFilePathIsEmpty,
    PersistenceFilePathIsUnreachable,
    ErrorWhenOpeningPersistenceFile,
    ErrorWhenWritingToPersistenceFile,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct StoreMarketStateReply {
    pub result: StoreMarketStateResult,
}

/// Request to re-hydrate the matching-engine state from the persistence file.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct RecoverMarketStateRequest;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum RecoverMarketStateResult {
    Recovered,
    PersistenceDisabled,
    PersistenceFilePathIsEmpty,
    PersistenceFilePathIsUnreachable,
    ErrorWhenOpeningPersistenceFile,
    PersistenceFileIsMalformed,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct RecoverMarketStateReply {
    pub result: RecoverMarketStateResult,
    /// Human-readable detail accompanying `PersistenceFileIsMalformed`.
    pub error_message: Option<String>,
}

/// Request for the synthetic-flow generator's current state.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct GenerationStatusRequest;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum GenerationStatus {
    Running,
    Stopped,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct GenerationStatusReply {
    pub status: GenerationStatus,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct StartGenerationRequest;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct StartGenerationReply {
    pub status: GenerationStatus,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct StopGenerationRequest;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct StopGenerationReply {
    pub status: GenerationStatus,
}
