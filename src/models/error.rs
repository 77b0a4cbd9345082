use std::fmt;

use super::vehicle::VehicleId;

/// Storage operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOp {
    Load,
    Decode,
    Save,
}

impl fmt::Display for PersistOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PersistOp::Load => "load",
            PersistOp::Decode => "decode",
            PersistOp::Save => "save",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Required fields are blank: {}", .fields.join(", "))]
    Validation { fields: Vec<&'static str> },

    #[error("No vehicle at position {position} (registry holds {len})")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("No parked vehicle with id {0}")]
    UnknownVehicle(VehicleId),

    #[error("No vehicle ids left to assign")]
    IdsExhausted,

    #[error("Failed to {op} registry snapshot: {reason}")]
    Persistence { op: PersistOp, reason: String },
}

impl RegistryError {
    /// True for the "vehicle not found" family (stale position or unknown id)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::PositionOutOfRange { .. } | RegistryError::UnknownVehicle(_)
        )
    }

    pub(crate) fn persistence(op: PersistOp, err: impl fmt::Display) -> Self {
        RegistryError::Persistence {
            op,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RegistryError::Validation {
            fields: vec!["plate", "color"],
        };
        assert_eq!(err.to_string(), "Required fields are blank: plate, color");

        let err = RegistryError::PositionOutOfRange { position: 3, len: 2 };
        assert_eq!(err.to_string(), "No vehicle at position 3 (registry holds 2)");
        assert!(err.is_not_found());

        let err = RegistryError::persistence(PersistOp::Save, "disk full");
        assert_eq!(err.to_string(), "Failed to save registry snapshot: disk full");
        assert!(!err.is_not_found());
    }
}
