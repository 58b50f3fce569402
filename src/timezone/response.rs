use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Raw body returned by the Time Zone API.
///
/// Every field is optional: the provider omits the zone fields on failures
/// (`{"status": "ZERO_RESULTS"}`), and an incomplete payload is still usable.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimezonePayload {
    /// Provider status code, "OK" on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Daylight saving adjustment in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_offset: Option<i64>,
    /// Standard-time offset from UTC in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_offset: Option<i64>,
    /// IANA identifier, e.g. "America/Los_Angeles"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone_id: Option<String>,
    /// Long name, e.g. "Pacific Daylight Time"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone_name: Option<String>,
    /// Explanation sent along with some non-OK statuses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Read-only view over a [`TimezonePayload`] with derived values.
///
/// Nothing is computed up front; every accessor derives its value from the
/// payload on each call and returns `None` instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct TimezoneResponse {
    payload: TimezonePayload,
}

impl TimezoneResponse {
    pub fn new(payload: TimezonePayload) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &TimezonePayload {
        &self.payload
    }

    pub fn into_payload(self) -> TimezonePayload {
        self.payload
    }

    pub fn timezone_id(&self) -> Option<&str> {
        self.payload.time_zone_id.as_deref()
    }

    pub fn timezone_name(&self) -> Option<&str> {
        self.payload.time_zone_name.as_deref()
    }

    pub fn raw_offset(&self) -> Option<i64> {
        self.payload.raw_offset
    }

    pub fn dst_offset(&self) -> Option<i64> {
        self.payload.dst_offset
    }

    /// Raw plus DST offset, or `None` if either is missing or the sum overflows.
    pub fn total_offset(&self) -> Option<i64> {
        self.raw_offset()?.checked_add(self.dst_offset()?)
    }

    pub fn is_dst(&self) -> bool {
        self.dst_offset().unwrap_or(0) > 0
    }

    /// Offset as `±HH:MM`, using the total offset or only the raw one.
    pub fn formatted_offset(&self, include_dst: bool) -> Option<String> {
        let offset = if include_dst {
            self.total_offset()?
        } else {
            self.raw_offset()?
        };
        Some(format_offset(offset))
    }

    /// The given instant (or now) in this zone. `None` when the zone id is
    /// missing or unknown to the bundled tz database.
    pub fn local_date_time(&self, timestamp: Option<i64>) -> Option<DateTime<Tz>> {
        let tz: Tz = self.timezone_id()?.parse().ok()?;
        let instant = match timestamp {
            Some(seconds) => DateTime::<Utc>::from_timestamp(seconds, 0)?,
            None => Utc::now(),
        };
        Some(instant.with_timezone(&tz))
    }

    /// True when the zone id and both offsets are present.
    pub fn is_valid(&self) -> bool {
        self.payload.time_zone_id.is_some()
            && self.payload.raw_offset.is_some()
            && self.payload.dst_offset.is_some()
    }

    /// Current short zone label such as "PST", taken from the tz database.
    /// Zones without a letter abbreviation yield a numeric one like "+0530".
    pub fn abbreviated_name(&self) -> Option<String> {
        self.local_date_time(None)
            .map(|local| local.format("%Z").to_string())
    }

    pub fn to_map(&self, include_date_time: bool) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("timezone_id".into(), json!(self.timezone_id()));
        map.insert("timezone_name".into(), json!(self.timezone_name()));
        map.insert("raw_offset".into(), json!(self.raw_offset()));
        map.insert("dst_offset".into(), json!(self.dst_offset()));
        map.insert("total_offset".into(), json!(self.total_offset()));
        map.insert("formatted_offset".into(), json!(self.formatted_offset(true)));
        map.insert("is_dst".into(), json!(self.is_dst()));
        map.insert("abbreviation".into(), json!(self.abbreviated_name()));
        map.insert("is_valid".into(), json!(self.is_valid()));

        if include_date_time {
            if let Some(local) = self.local_date_time(None) {
                map.insert(
                    "current_time".into(),
                    json!(local.format("%H:%M:%S").to_string()),
                );
                map.insert(
                    "current_date".into(),
                    json!(local.format("%Y-%m-%d").to_string()),
                );
            }
        }

        map
    }
}

impl From<TimezonePayload> for TimezoneResponse {
    fn from(payload: TimezonePayload) -> Self {
        Self::new(payload)
    }
}

fn format_offset(offset: i64) -> String {
    let sign = if offset < 0 { '-' } else { '+' };
    let seconds = offset.unsigned_abs();
    format!("{}{:02}:{:02}", sign, seconds / 3600, (seconds % 3600) / 60)
}
