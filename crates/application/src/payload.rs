//! Payload contracts.
//!
//! External validated payloads reach the service layer through two narrow
//! dump operations: a creation payload dumps every field, an update payload
//! dumps only the fields the caller explicitly set, so an untouched optional
//! never overwrites stored data.

use stratum_common::FieldMap;

/// A validated creation payload.
pub trait CreatePayload: Send + Sync {
    /// Every field of the payload as a change set.
    fn dump(&self) -> FieldMap;
}

/// A validated update payload.
pub trait UpdatePayload: Send + Sync {
    /// Only the explicitly-set fields as a change set.
    fn dump_set(&self) -> FieldMap;
}
