//! Source patching of the upstream build configurator.
//!
//! [`plan`] decides which substitutions a configuration needs; [`edit`]
//! applies a plan to a file on disk.

pub mod edit;
pub mod plan;

pub use edit::{apply_to_file, preview_file, PatchError, PatchPolicy, PatchReport};
pub use plan::{
    build_patch_plan, PatchPlan, PatchStep, PatchedSource, Substitution, SubstitutionOutcome,
};
