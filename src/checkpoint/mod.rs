//! Checkpoint and resume for machine instances.
//!
//! A questionnaire can span sessions; a checkpoint captures an instance's
//! state, context and history so it can be resumed later against the same
//! definition. Effect bindings and subscribers are not captured - the
//! resuming host supplies them again.
//!
//! # Example
//!
//! ```rust
//! use waypoint::builder::{DefinitionBuilder, StateBuilder};
//! use waypoint::checkpoint::Checkpoint;
//! use waypoint::core::{Context, Event};
//! use waypoint::effects::{EffectTable, MachineInstance};
//!
//! let definition = DefinitionBuilder::new("door")
//!     .initial("closed")
//!     .state(StateBuilder::new("closed").goto("OPEN", "open"))
//!     .state(StateBuilder::new("open").goto("CLOSE", "closed"))
//!     .build()
//!     .unwrap();
//!
//! let mut door = MachineInstance::new(definition.clone(), &EffectTable::new(), Context::new()).unwrap();
//! door.start();
//! door.dispatch(Event::new("OPEN")).unwrap();
//!
//! let bytes = door.checkpoint().unwrap().to_bytes().unwrap();
//! let restored = Checkpoint::from_bytes(&bytes).unwrap();
//! let door = MachineInstance::resume(definition, &EffectTable::new(), &restored).unwrap();
//! assert_eq!(door.current_state(), "open");
//! ```

use crate::core::{Context, StateHistory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable capture of one machine instance.
///
/// The context is kept in its JSON encoding so the checkpoint can also be
/// written with a non-self-describing format such as bincode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: String,

    /// When checkpoint was created
    pub timestamp: DateTime<Utc>,

    /// Id of the definition the instance was running
    pub machine: String,

    /// Current state id
    pub state: String,

    /// JSON-encoded context
    pub context: String,

    /// Whether the instance had terminated
    pub done: bool,

    /// Complete transition history
    pub history: StateHistory,
}

impl Checkpoint {
    /// Decode the captured context.
    pub fn context(&self) -> Result<Context, CheckpointError> {
        serde_json::from_str(&self.context)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))
    }

    /// Reject checkpoints written by an unsupported format version.
    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: Self = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }
}
