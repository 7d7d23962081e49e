//! # fleetreport-scopes
//!
//! Scope types for fleet performance reports and the data store they query.
//!
//! This crate provides:
//! - The [`FleetStore`] query trait and its JSON snapshot implementation
//! - [`HolderScope`]: one report row per vehicle
//! - [`ContactScope`]: one report row per driver
//! - [`scope_source`]: picks the scope type for a run
//!
//! ## Example
//!
//! ```rust
//! use fleetreport_core::ScopeKind;
//! use fleetreport_scopes::{scope_source, JsonFleetStore};
//!
//! let store = JsonFleetStore::from_json(r#"{"holders": []}"#).unwrap();
//! let scope = scope_source(ScopeKind::Holder, &store);
//!
//! assert!(scope.field_providers().supports("travelDistance"));
//! ```

pub mod contact;
pub mod holder;
mod shared;
pub mod store;

pub use contact::ContactScope;
pub use holder::HolderScope;
pub use store::{
    Contact, EventKind, EventReport, FleetStore, Holder, JsonFleetStore, Metric, MetricRow,
    Snapshot, Timezone,
};

use fleetreport_core::{ScopeKind, ScopeSource};

/// The scope type serving `kind`
pub fn scope_source<'s>(kind: ScopeKind, store: &'s dyn FleetStore) -> Box<dyn ScopeSource + 's> {
    match kind {
        ScopeKind::Holder => Box::new(HolderScope::new(store)),
        ScopeKind::Contact => Box::new(ContactScope::new(store)),
    }
}
