//! Display helpers for CLI output.
//!
//! Timestamps from the API are RFC 3339 and are rendered in UTC. Values that
//! fail to parse are echoed back unchanged rather than hidden.

use time::{OffsetDateTime, UtcOffset};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::types::PetShopCategory;

/// `RM 12.34` from an amount in sen.
#[must_use]
pub fn format_myr(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("RM {sign}{}.{:02}", abs / 100, abs % 100)
}

fn parse(date: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(date.trim(), &Rfc3339)
        .ok()
        .map(|d| d.to_offset(UtcOffset::UTC))
}

/// `2 Jan 2026`.
#[must_use]
pub fn format_date(date: &str) -> String {
    let Some(parsed) = parse(date) else {
        return date.to_owned();
    };
    parsed
        .format(format_description!("[day padding:none] [month repr:short] [year]"))
        .unwrap_or_else(|_| date.to_owned())
}

/// `2 Jan 2026, 03:04`.
#[must_use]
pub fn format_date_time(date: &str) -> String {
    let Some(parsed) = parse(date) else {
        return date.to_owned();
    };
    parsed
        .format(format_description!("[day padding:none] [month repr:short] [year], [hour]:[minute]"))
        .unwrap_or_else(|_| date.to_owned())
}

/// Age of `date` relative to `now`: `Just now`, `5m ago`, `3h ago`, `2d ago`,
/// then the plain date from a week on. Future timestamps read as `Just now`.
#[must_use]
pub fn format_relative_time(date: &str, now: OffsetDateTime) -> String {
    let Some(parsed) = parse(date) else {
        return date.to_owned();
    };
    let minutes = (now - parsed).whole_minutes();
    if minutes < 1 {
        return "Just now".to_owned();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = hours / 24;
    if days < 7 {
        return format!("{days}d ago");
    }
    format_date(date)
}

#[must_use]
pub fn category_label(category: PetShopCategory) -> &'static str {
    match category {
        PetShopCategory::Grooming => "Grooming",
        PetShopCategory::Vet => "Veterinary",
        PetShopCategory::Boarding => "Boarding",
        PetShopCategory::PetStore => "Pet Store",
    }
}

#[cfg(test)]
#[path = "format_test.rs"]
mod tests;
