//! Shared fixtures for unit tests

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::collections::HashMap;

use crate::{ColumnDescriptor, FormatterRegistry, Options, RawOptions, Result, TimezoneDirectory};

/// Timezone table: id 3 is UTC-3, id 0 is UTC
pub struct Zones(HashMap<u32, FixedOffset>);

impl Default for Zones {
    fn default() -> Self {
        Self(HashMap::from([
            (0, FixedOffset::east_opt(0).unwrap()),
            (3, FixedOffset::west_opt(3 * 3600).unwrap()),
        ]))
    }
}

impl TimezoneDirectory for Zones {
    fn offset(&self, timezone_id: u32) -> Result<Option<FixedOffset>> {
        Ok(self.0.get(&timezone_id).copied())
    }
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 15, 2, 0, 0).unwrap()
}

pub fn raw_options() -> RawOptions {
    RawOptions {
        timezone: Some("3".into()),
        frequency: Some("monthly".into()),
        client_id: Some("16229".into()),
        recipients: Some("ops@example.com, fleet@example.com".into()),
        columns: Some(r#"["domain"]"#.into()),
        ..RawOptions::default()
    }
}

pub fn options_with(columns: Vec<ColumnDescriptor>) -> Options {
    let mut options = raw_options()
        .build(&Zones::default(), &FormatterRegistry::new(), now())
        .unwrap();
    options.columns = columns;
    options
}
