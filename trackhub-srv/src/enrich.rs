//! Enrichment pipeline
//!
//! Normalizes a freshly decoded location record before it is persisted or
//! broadcast: derives the geocode strings, resolves the time zone under
//! the fix, renders localized timestamps, and stamps the authenticated
//! identity. Steps run in order and short-circuit on the first failure;
//! nothing is persisted when any step fails.
//!
//! Runs exactly once per ingest. Re-applying it to an already enriched
//! record is not supported.

use chrono::SecondsFormat;
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use tracing::warn;
use trackhub_common::{Error, LocationRecord, Result};
use tzf_rs::DefaultFinder;

use crate::geo;

/// Geohash cell size stored on every record
const GEOHASH_PRECISION: usize = 7;
/// Plus code digit count stored on every record
const PLUSCODE_LENGTH: usize = 12;
/// Topic namespace clients are expected to publish under
const TOPIC_NAMESPACE: &str = "owntracks";
/// Fixed display rendering of the UTC fix time
const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %I:%M:%S";

// Polygon lookup tables are large; build them once per process
static TZ_FINDER: Lazy<DefaultFinder> = Lazy::new(DefaultFinder::new);

/// Enrich a decoded location record for (user, device).
pub fn enrich_location(record: &mut LocationRecord, user: &str, device: &str) -> Result<()> {
    let (lat, lon) = record.coordinates().ok_or(Error::MissingCoordinates)?;

    record.ghash = Some(geo::geohash_cell(lat, lon, GEOHASH_PRECISION)?);
    record.pluscode = Some(geo::pluscode(lat, lon, PLUSCODE_LENGTH));

    apply_zone(record, lookup_zone(lat, lon))?;

    record.username = Some(user.to_string());
    record.device = Some(device.to_string());
    record.http = Some(true);

    if let Some(topic) = record.topic() {
        let expected = format!("{TOPIC_NAMESPACE}/{user}/{}", device.to_uppercase());
        if topic != expected {
            warn!(input_topic = topic, "unexpected topic");
        }
    }

    Ok(())
}

/// IANA zone containing the coordinate, if any. First match wins.
fn lookup_zone(lat: f64, lon: f64) -> Option<String> {
    // tzf takes (lng, lat)
    TZ_FINDER
        .get_tz_names(lon, lat)
        .first()
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
}

/// Stamp the localized timestamp fields for a resolved zone.
///
/// No zone is not an error: the record simply carries no localized
/// timestamps. With a zone, a missing fix timestamp is a client error.
fn apply_zone(record: &mut LocationRecord, zone: Option<String>) -> Result<()> {
    let Some(zone) = zone else {
        return Ok(());
    };

    let tz: Tz = zone
        .parse()
        .map_err(|_| Error::TimezoneResolution(format!("unknown zone {zone:?}")))?;
    let tst = record.timestamp().ok_or(Error::MissingTimestamp)?;

    record.tzname = Some(zone);
    record.isolocal = Some(
        tst.with_timezone(&tz)
            .to_rfc3339_opts(SecondsFormat::Secs, false),
    );
    record.disptst = Some(tst.format(DISPLAY_TIME_FORMAT).to_string());
    record.isotst = Some(tst.to_rfc3339_opts(SecondsFormat::Secs, true));

    Ok(())
}
