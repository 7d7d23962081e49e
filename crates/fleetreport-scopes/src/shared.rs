//! Providers common to every scope type

use fleetreport_core::{FieldValues, Options, Result, ScopeDataSet, ScopeKind, Value};
use std::collections::HashMap;

use crate::store::{EventKind, FleetStore, Metric};

/// Metric totals over the report period for every scope in `data`
pub(crate) fn metric_field(
    store: &dyn FleetStore,
    metric: Metric,
    scope: ScopeKind,
    options: &Options,
    data: &ScopeDataSet,
) -> Result<FieldValues> {
    let totals = store.metric_totals(metric, scope, &data.ids(), &options.period)?;
    Ok(totals
        .into_iter()
        .map(|(id, total)| (id, numeric_value(total)))
        .collect())
}

/// Seconds idling with the engine on, summed over end-of-idle events.
///
/// Scopes without a positive idle time get no entry.
pub(crate) fn ralenti_field(
    store: &dyn FleetStore,
    scope: ScopeKind,
    options: &Options,
    data: &ScopeDataSet,
) -> Result<FieldValues> {
    let events = store.events(
        EventKind::EndOfRalenti,
        scope,
        &data.ids(),
        options.period.from_utc(),
        options.period.to_utc(),
    )?;

    let mut totals: HashMap<_, i64> = HashMap::new();
    for event in &events {
        let (Some(id), Some(secs)) = (event.scope_id(scope), event.unmoving_working_engine_time)
        else {
            continue;
        };
        if secs > 0 {
            *totals.entry(id).or_insert(0) += secs;
        }
    }
    Ok(totals.into_iter().map(|(id, secs)| (id, Value::from(secs))).collect())
}

/// Whole totals become integers, anything else stays decimal
pub(crate) fn numeric_value(total: f64) -> Value {
    if total.fract() == 0.0 && total.abs() < 9.0e15 {
        Value::Integer(total as i64)
    } else {
        Value::Decimal(total)
    }
}
