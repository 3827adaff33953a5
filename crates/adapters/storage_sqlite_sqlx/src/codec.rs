//! Column encoding shared by the repositories.
//!
//! Ids are stored as hyphenated UUID text, timestamps as RFC 3339 UTC with
//! a fixed microsecond precision, structured fields as JSON text.

use chrono::SecondsFormat;
use orderflow_domain::time::Timestamp;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use uuid::fmt::Hyphenated;

pub(crate) fn encode_uuid(value: Uuid) -> Hyphenated {
    value.hyphenated()
}

pub(crate) fn timestamp(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_error(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

pub(crate) fn parse_timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(decode_error)
}

pub(crate) fn parse_json<T: DeserializeOwned>(value: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(value).map_err(decode_error)
}
