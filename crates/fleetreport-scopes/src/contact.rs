//! Contact (driver) scope

use fleetreport_core::{
    FieldProviderRegistry, FieldValues, Options, Result, ScopeDataSet, ScopeKind, ScopeRecord,
    ScopeSource, Value,
};

use crate::shared::{metric_field, ralenti_field};
use crate::store::{FleetStore, Metric};

/// Fields every contact record may carry
pub const CONTACT_FIELDS: &[&str] = &["name", "lastname", "email"];

/// One row per contact of the client (or fleet)
///
/// Intrinsic fields: `name`, `lastname`, `email`.
/// Derived fields: `holder`, `travelDistance`, `travelTime`, `ralentiTime`.
pub struct ContactScope<'s> {
    store: &'s dyn FleetStore,
}

impl<'s> ContactScope<'s> {
    pub fn new(store: &'s dyn FleetStore) -> Self {
        Self { store }
    }

    /// Domain of the holder each contact drives, among the holders of the
    /// report's client and fleet; the lowest holder id wins when a contact
    /// is assigned to several
    fn holders(&self, options: &Options, data: &ScopeDataSet) -> Result<FieldValues> {
        let mut values = FieldValues::new();
        let holders =
            self.store
                .holders_by_driver(&options.client_id, options.fleet_id, &data.ids())?;
        for holder in holders {
            if let Some(driver) = holder.driver_id {
                values.entry(driver).or_insert_with(|| Value::from(holder.domain));
            }
        }
        Ok(values)
    }
}

impl ScopeSource for ContactScope<'_> {
    fn kind(&self) -> ScopeKind {
        ScopeKind::Contact
    }

    fn fetch_scope_data(&self, options: &Options) -> Result<ScopeDataSet> {
        let contacts = self.store.contacts(&options.client_id, options.fleet_id)?;
        Ok(contacts
            .into_iter()
            .map(|contact| {
                let mut record = ScopeRecord::new().with("name", contact.name);
                if let Some(lastname) = contact.lastname {
                    record.set("lastname", lastname);
                }
                if let Some(email) = contact.email {
                    record.set("email", email);
                }
                (contact.contact_id, record)
            })
            .collect())
    }

    fn intrinsic_fields(&self) -> &'static [&'static str] {
        CONTACT_FIELDS
    }

    fn field_providers(&self) -> FieldProviderRegistry<'_> {
        let store = self.store;
        FieldProviderRegistry::new()
            .with("holder", move |options, data| self.holders(options, data))
            .with("travelDistance", move |options, data| {
                metric_field(store, Metric::Distance, ScopeKind::Contact, options, data)
            })
            .with("travelTime", move |options, data| {
                metric_field(store, Metric::TravelTime, ScopeKind::Contact, options, data)
            })
            .with("ralentiTime", move |options, data| {
                ralenti_field(store, ScopeKind::Contact, options, data)
            })
    }
}
