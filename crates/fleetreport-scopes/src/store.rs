//! Fleet data store
//!
//! Batch queries the scope types run against the fleet database. Every
//! query takes the full id list of a run, so one provider call maps to
//! one query.
//!
//! [`JsonFleetStore`] answers the queries from a snapshot file:
//!
//! ```json
//! {
//!   "timezones": [{ "id": 3, "offsetMinutes": -180 }],
//!   "holders":   [{ "holderId": 1, "clientId": "16229", "domain": "AB123CD", "driverId": 100 }],
//!   "contacts":  [{ "contactId": 100, "clientId": "16229", "name": "Ana", "lastname": "Souza" }],
//!   "metrics":   [{ "metric": "distance", "scope": "holder", "scopeId": 1,
//!                   "dateFrom": "2024-05-01T03:00:00Z", "dateTo": "2024-05-02T02:59:59Z",
//!                   "value": 120.5 }],
//!   "events":    [{ "event": "end_of_ralenti", "holderId": 1, "contactId": 100,
//!                   "reportDate": "2024-05-01T12:00:00Z", "unmovingWorkingEngineTime": 300 }]
//! }
//! ```

use chrono::{DateTime, FixedOffset, Utc};
use fleetreport_core::{Period, ReportError, Result, ScopeId, ScopeKind, TimezoneDirectory};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, warn};

/// Upper bound on event rows returned by one query
pub const MAX_EVENT_ROWS: usize = 100_000;

// ============================================================================
// Snapshot Records
// ============================================================================

/// Time zone row
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timezone {
    pub id: u32,
    /// Offset from UTC in minutes, negative west of Greenwich
    pub offset_minutes: i32,
    #[serde(default)]
    pub name: Option<String>,
}

/// Tracked asset (vehicle)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holder {
    pub holder_id: ScopeId,
    pub client_id: String,
    #[serde(default)]
    pub fleet_id: Option<u64>,
    pub domain: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Contact currently assigned as driver
    #[serde(default)]
    pub driver_id: Option<ScopeId>,
}

/// Person (driver)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub contact_id: ScopeId,
    pub client_id: String,
    #[serde(default)]
    pub fleet_id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Contact {
    /// `"<name> <lastname>"`, or just the name when there is no last name
    pub fn full_name(&self) -> String {
        match self.lastname.as_deref().map(str::trim) {
            Some(lastname) if !lastname.is_empty() => format!("{} {lastname}", self.name),
            _ => self.name.clone(),
        }
    }
}

/// Aggregated metric kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Kilometers traveled
    Distance,
    /// Seconds with the engine on and moving
    TravelTime,
}

/// One pre-aggregated metric row covering `[date_from, date_to]`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRow {
    pub metric: Metric,
    pub scope: ScopeKind,
    pub scope_id: ScopeId,
    pub date_from: DateTime<Utc>,
    pub date_to: DateTime<Utc>,
    pub value: f64,
}

/// Device event kinds the reports use
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Engine stopped idling; carries the idle duration
    EndOfRalenti,
    #[serde(other)]
    Other,
}

/// Event report sent by a tracking device
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventReport {
    pub event: EventKind,
    #[serde(default)]
    pub holder_id: Option<ScopeId>,
    /// Driver at report time
    #[serde(default)]
    pub contact_id: Option<ScopeId>,
    pub report_date: DateTime<Utc>,
    /// Seconds spent stopped with the engine running
    #[serde(default)]
    pub unmoving_working_engine_time: Option<i64>,
}

impl EventReport {
    /// The scope entity the event is attributed to
    pub fn scope_id(&self, scope: ScopeKind) -> Option<ScopeId> {
        match scope {
            ScopeKind::Holder => self.holder_id,
            ScopeKind::Contact => self.contact_id,
        }
    }
}

/// Full store contents
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub timezones: Vec<Timezone>,
    #[serde(default)]
    pub holders: Vec<Holder>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub metrics: Vec<MetricRow>,
    #[serde(default)]
    pub events: Vec<EventReport>,
}

// ============================================================================
// Store Trait
// ============================================================================

/// Fleet database queries
pub trait FleetStore {
    /// Holders of a client, optionally restricted to one fleet, by id
    fn holders(&self, client_id: &str, fleet_id: Option<u64>) -> Result<Vec<Holder>>;

    /// Contacts of a client, optionally restricted to one fleet, by id
    fn contacts(&self, client_id: &str, fleet_id: Option<u64>) -> Result<Vec<Contact>>;

    fn contacts_by_id(&self, ids: &[ScopeId]) -> Result<Vec<Contact>>;

    /// Holders of a client (and fleet, when given) whose assigned driver is
    /// one of `driver_ids`, by holder id
    fn holders_by_driver(
        &self,
        client_id: &str,
        fleet_id: Option<u64>,
        driver_ids: &[ScopeId],
    ) -> Result<Vec<Holder>>;

    /// Sum of `metric` per scope id over rows lying inside `period`
    fn metric_totals(
        &self,
        metric: Metric,
        scope: ScopeKind,
        ids: &[ScopeId],
        period: &Period,
    ) -> Result<HashMap<ScopeId, f64>>;

    /// Events strictly inside `(from, to)`, oldest first, at most
    /// [`MAX_EVENT_ROWS`]
    fn events(
        &self,
        event: EventKind,
        scope: ScopeKind,
        ids: &[ScopeId],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EventReport>>;

    fn timezone_offset(&self, timezone_id: u32) -> Result<Option<FixedOffset>>;
}

// ============================================================================
// JSON Snapshot Store
// ============================================================================

/// Store backed by an in-memory [`Snapshot`]
#[derive(Clone, Debug, Default)]
pub struct JsonFleetStore {
    snapshot: Snapshot,
}

impl JsonFleetStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReportError::Store(format!("Cannot read snapshot {}: {e}", path.display()))
        })?;
        let store = Self::from_json(&content)
            .map_err(|e| ReportError::Store(format!("{}: {e}", path.display())))?;
        debug!(
            path = %path.display(),
            holders = store.snapshot.holders.len(),
            contacts = store.snapshot.contacts.len(),
            events = store.snapshot.events.len(),
            "loaded fleet snapshot"
        );
        Ok(store)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| ReportError::Store(format!("Invalid snapshot: {e}")))?;
        Ok(Self::new(snapshot))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

fn in_client(client: &str, fleet: Option<u64>, row_client: &str, row_fleet: Option<u64>) -> bool {
    row_client == client && fleet.map_or(true, |f| row_fleet == Some(f))
}

impl FleetStore for JsonFleetStore {
    fn holders(&self, client_id: &str, fleet_id: Option<u64>) -> Result<Vec<Holder>> {
        let mut holders: Vec<Holder> = self
            .snapshot
            .holders
            .iter()
            .filter(|h| in_client(client_id, fleet_id, &h.client_id, h.fleet_id))
            .cloned()
            .collect();
        holders.sort_by_key(|h| h.holder_id);
        Ok(holders)
    }

    fn contacts(&self, client_id: &str, fleet_id: Option<u64>) -> Result<Vec<Contact>> {
        let mut contacts: Vec<Contact> = self
            .snapshot
            .contacts
            .iter()
            .filter(|c| in_client(client_id, fleet_id, &c.client_id, c.fleet_id))
            .cloned()
            .collect();
        contacts.sort_by_key(|c| c.contact_id);
        Ok(contacts)
    }

    fn contacts_by_id(&self, ids: &[ScopeId]) -> Result<Vec<Contact>> {
        let wanted: BTreeSet<ScopeId> = ids.iter().copied().collect();
        let mut contacts: Vec<Contact> = self
            .snapshot
            .contacts
            .iter()
            .filter(|c| wanted.contains(&c.contact_id))
            .cloned()
            .collect();
        contacts.sort_by_key(|c| c.contact_id);
        Ok(contacts)
    }

    fn holders_by_driver(
        &self,
        client_id: &str,
        fleet_id: Option<u64>,
        driver_ids: &[ScopeId],
    ) -> Result<Vec<Holder>> {
        let wanted: BTreeSet<ScopeId> = driver_ids.iter().copied().collect();
        let mut holders: Vec<Holder> = self
            .snapshot
            .holders
            .iter()
            .filter(|h| in_client(client_id, fleet_id, &h.client_id, h.fleet_id))
            .filter(|h| h.driver_id.is_some_and(|d| wanted.contains(&d)))
            .cloned()
            .collect();
        holders.sort_by_key(|h| h.holder_id);
        Ok(holders)
    }

    fn metric_totals(
        &self,
        metric: Metric,
        scope: ScopeKind,
        ids: &[ScopeId],
        period: &Period,
    ) -> Result<HashMap<ScopeId, f64>> {
        let wanted: BTreeSet<ScopeId> = ids.iter().copied().collect();
        let mut totals: HashMap<ScopeId, f64> = HashMap::new();
        for row in &self.snapshot.metrics {
            if row.metric == metric
                && row.scope == scope
                && wanted.contains(&row.scope_id)
                && period.covers(row.date_from, row.date_to)
            {
                *totals.entry(row.scope_id).or_insert(0.0) += row.value;
            }
        }
        Ok(totals)
    }

    fn events(
        &self,
        event: EventKind,
        scope: ScopeKind,
        ids: &[ScopeId],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EventReport>> {
        let wanted: BTreeSet<ScopeId> = ids.iter().copied().collect();
        let mut reports: Vec<EventReport> = self
            .snapshot
            .events
            .iter()
            .filter(|r| {
                r.event == event
                    && r.scope_id(scope).is_some_and(|id| wanted.contains(&id))
                    && r.report_date > from
                    && r.report_date < to
            })
            .cloned()
            .collect();
        reports.sort_by_key(|r| r.report_date);
        if reports.len() > MAX_EVENT_ROWS {
            warn!(found = reports.len(), limit = MAX_EVENT_ROWS, "event query truncated");
            reports.truncate(MAX_EVENT_ROWS);
        }
        Ok(reports)
    }

    fn timezone_offset(&self, timezone_id: u32) -> Result<Option<FixedOffset>> {
        let Some(zone) = self.snapshot.timezones.iter().find(|z| z.id == timezone_id) else {
            return Ok(None);
        };
        FixedOffset::east_opt(zone.offset_minutes * 60)
            .map(Some)
            .ok_or_else(|| {
                ReportError::Store(format!(
                    "Timezone {} has an invalid offset of {} minutes",
                    zone.id, zone.offset_minutes
                ))
            })
    }
}

impl TimezoneDirectory for JsonFleetStore {
    fn offset(&self, timezone_id: u32) -> Result<Option<FixedOffset>> {
        self.timezone_offset(timezone_id)
    }
}
