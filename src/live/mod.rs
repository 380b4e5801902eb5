//! Live state reconciliation
//!
//! Three producers feed one renderer: full snapshot pulls, server-push
//! fragments and user mutations.

mod listener;
mod loader;
mod page;
mod submitter;

#[cfg(test)]
pub(crate) mod testing;

pub use listener::{Clock, ListenerState, ListenerStats, LiveUpdateListener, ReconnectPolicy};
pub use loader::SnapshotLoader;
pub use page::{LiveView, ViewOptions};
pub use submitter::{
    optional_field, parse_edad, split_list, FamilyForm, Mutation, MutationSubmitter, PersonForm,
};
