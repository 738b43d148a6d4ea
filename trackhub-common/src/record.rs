//! Tracker record model and decoding
//!
//! Clients publish small JSON documents discriminated by a `_type` field.
//! The closed set of kinds this server understands is [`TrackerRecord`];
//! anything else is rejected as [`Error::UnsupportedRecordKind`] without
//! being persisted.
//!
//! Well-known fields are typed and optional; decoding never requires a
//! field to be present. Requirement checks (coordinates, timestamp) happen
//! downstream where the field is actually needed, each with its own error.
//! Every field the server does not recognize passes through the `extra`
//! bag unchanged, so a stored record re-encodes byte-for-byte equivalent
//! to what the client sent plus the enrichment stamps.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A decoded tracker payload, discriminated by the `_type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum TrackerRecord {
    /// A location update from a tracking client
    #[serde(rename = "location")]
    Location(LocationRecord),
}

impl TrackerRecord {
    /// Decode an untrusted byte payload.
    ///
    /// Unknown or missing `_type` → [`Error::UnsupportedRecordKind`].
    /// Anything undecodable (bad JSON, well-known field of the wrong
    /// type) → [`Error::MalformedPayload`].
    pub fn decode(raw: &[u8]) -> Result<TrackerRecord> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| Error::MalformedPayload(e.to_string()))?;
        let kind = value
            .get("_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match kind.as_str() {
            "location" => serde_json::from_value(value)
                .map_err(|e| Error::MalformedPayload(e.to_string())),
            _ => Err(Error::UnsupportedRecordKind(kind)),
        }
    }

    /// Encode for persistence (includes the `_type` discriminator).
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Internal(e.to_string()))
    }
}

/// A location update.
///
/// Raw fields follow the OwnTracks wire names (`lat`, `lon`, `acc`, `t`,
/// `tst`, `topic`); the remainder are stamped by the enrichment pipeline
/// before persistence and are absent on a freshly decoded record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Latitude in decimal degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Longitude in decimal degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    /// Accuracy of the reported location in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc: Option<i64>,
    /// Trigger code for the report (`p` ping, `c` region, `u` manual, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    /// Epoch seconds at which the fix was taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tst: Option<i64>,
    /// MQTT-style topic the client would have published to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    /// 7-character geohash of the coordinates (enrichment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ghash: Option<String>,
    /// 12-digit open location code of the coordinates (enrichment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pluscode: Option<String>,
    /// Resolved IANA zone name, when the fix falls inside one (enrichment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tzname: Option<String>,
    /// RFC 3339 timestamp in the resolved zone (enrichment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolocal: Option<String>,
    /// RFC 3339 timestamp in UTC (enrichment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isotst: Option<String>,
    /// Fixed-format UTC display string (enrichment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disptst: Option<String>,
    /// Authenticated user the record was ingested for (enrichment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Device the record was ingested for (enrichment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Transport marker: record arrived over HTTP (enrichment)
    #[serde(rename = "_http", default, skip_serializing_if = "Option::is_none")]
    pub http: Option<bool>,

    /// Unrecognized fields, preserved verbatim across decode and re-encode
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LocationRecord {
    /// Coordinate pair, present only when both halves are.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Fix timestamp as an instant, when `tst` is present and in range.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.tst.and_then(|tst| Utc.timestamp_opt(tst, 0).single())
    }

    /// Reported accuracy in meters.
    pub fn accuracy(&self) -> Option<i64> {
        self.acc
    }

    /// Trigger code for the report.
    pub fn trigger(&self) -> Option<&str> {
        self.t.as_deref()
    }

    /// Topic the client claims it would publish to.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }
}
