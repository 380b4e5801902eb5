//! Data model shared by the loader, the listener and the submitter

mod requests;
mod snapshot;

pub use requests::{FamilyCreateRequest, PersonCreateRequest};
pub use snapshot::{Counts, PersonSummary, StateFragment, StateSnapshot, Version};
