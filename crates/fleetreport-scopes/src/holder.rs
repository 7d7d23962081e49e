//! Holder (vehicle) scope

use fleetreport_core::{
    FieldProviderRegistry, FieldValues, Options, Result, ScopeDataSet, ScopeKind, ScopeRecord,
    ScopeSource, Value,
};
use std::collections::HashMap;
use tracing::debug;

use crate::shared::{metric_field, ralenti_field};
use crate::store::{FleetStore, Metric};

/// Fields every holder record may carry
pub const HOLDER_FIELDS: &[&str] = &["domain", "name", "fleetId", "driverId"];

/// One row per holder of the client (or fleet)
///
/// Intrinsic fields: `domain`, `name`, `fleetId`, `driverId`.
/// Derived fields: `driver`, `travelDistance`, `travelTime`, `ralentiTime`.
pub struct HolderScope<'s> {
    store: &'s dyn FleetStore,
}

impl<'s> HolderScope<'s> {
    pub fn new(store: &'s dyn FleetStore) -> Self {
        Self { store }
    }

    /// Full name of each holder's assigned driver
    fn drivers(&self, data: &ScopeDataSet) -> Result<FieldValues> {
        let assignments: Vec<(u64, u64)> = data
            .iter()
            .filter_map(|(id, record)| match record.get("driverId") {
                Some(Value::Integer(driver)) => u64::try_from(*driver).ok().map(|d| (id, d)),
                _ => None,
            })
            .collect();
        if assignments.is_empty() {
            return Ok(FieldValues::new());
        }

        let mut driver_ids: Vec<u64> = assignments.iter().map(|(_, d)| *d).collect();
        driver_ids.sort_unstable();
        driver_ids.dedup();

        let names: HashMap<u64, String> = self
            .store
            .contacts_by_id(&driver_ids)?
            .into_iter()
            .map(|c| (c.contact_id, c.full_name()))
            .collect();
        debug!(drivers = driver_ids.len(), found = names.len(), "looked up drivers");

        Ok(assignments
            .into_iter()
            .filter_map(|(id, driver)| names.get(&driver).map(|n| (id, Value::from(n.as_str()))))
            .collect())
    }
}

impl ScopeSource for HolderScope<'_> {
    fn kind(&self) -> ScopeKind {
        ScopeKind::Holder
    }

    fn fetch_scope_data(&self, options: &Options) -> Result<ScopeDataSet> {
        let holders = self.store.holders(&options.client_id, options.fleet_id)?;
        Ok(holders
            .into_iter()
            .map(|holder| {
                let mut record = ScopeRecord::new().with("domain", holder.domain);
                if let Some(name) = holder.name {
                    record.set("name", name);
                }
                if let Some(fleet) = holder.fleet_id {
                    record.set("fleetId", fleet as i64);
                }
                if let Some(driver) = holder.driver_id {
                    record.set("driverId", driver as i64);
                }
                (holder.holder_id, record)
            })
            .collect())
    }

    fn intrinsic_fields(&self) -> &'static [&'static str] {
        HOLDER_FIELDS
    }

    fn field_providers(&self) -> FieldProviderRegistry<'_> {
        let store = self.store;
        FieldProviderRegistry::new()
            .with("driver", move |_, data| self.drivers(data))
            .with("travelDistance", move |options, data| {
                metric_field(store, Metric::Distance, ScopeKind::Holder, options, data)
            })
            .with("travelTime", move |options, data| {
                metric_field(store, Metric::TravelTime, ScopeKind::Holder, options, data)
            })
            .with("ralentiTime", move |options, data| {
                ralenti_field(store, ScopeKind::Holder, options, data)
            })
    }
}
