//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod aggregator;
pub mod classifier;
pub mod entities;
pub mod error;
pub mod extract;
pub mod navigator;
pub mod repair;
pub mod synthetic;
pub mod validator;

pub use aggregator::{
    collect_all, compute_max_depth, generic_procedures, related_procedures, summarize,
    ProcedureSummary, MAX_DEPTH_CEILING,
};
pub use classifier::{classify, is_likely_administrative, Classification};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use extract::{extract_object, parse_payload};
pub use navigator::{navigate, Navigation};
pub use repair::{validate_and_fix, validate_and_fix_node, RepairOutcome};
pub use synthetic::synthetic_tree;
pub use validator::{validate_structure, ValidationReport};
