//! Domain layer for the terrograph record service.
//!
//! Three concerns live here, shared by the API-contract and server crates:
//!
//! - [`types`]: the graph node structures the service records, plus the
//!   edge-relation and node-label vocabularies used by storage backends.
//! - [`validation`]: aggregating constraint validation ([`Validate`],
//!   [`ConstraintViolations`]) used by the write representations.
//! - [`patch`]: generic application of RFC 6902 JSON-Patch and RFC 7386
//!   JSON-Merge-Patch documents to typed entities.

pub mod patch;
pub mod types;
pub mod validation;

pub use patch::{apply_merge_patch, apply_patch, PatchError};
pub use types::{
    new_id, City, Country, Event, Group, Label, Province, Region, Relation, Role, Target, User,
    Victim,
};
pub use validation::{ConstraintViolation, ConstraintViolations, Validate, Violations};
