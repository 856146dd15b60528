//! chrono conversions for the cached time snapshot.
//!
//! The chips keep a two-digit year; this module maps it onto 2000-2099.
//! Day of week is stored as Sunday = 1 .. Saturday = 7.
//!
//! Conversion errors are reported via [`DateTimeError`].

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::registers::TimeRepresentation;
use crate::state::{split_hour, ClockSnapshot};

/// Errors that can occur during date/time conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DateTimeError {
    /// The cached fields do not form a valid calendar date/time
    InvalidDateTime,
    /// The year is outside 2000-2099
    YearOutOfRange,
}

/// Builds a `NaiveDateTime` from the cached snapshot.
pub(crate) fn snapshot_to_datetime(
    snapshot: &ClockSnapshot,
) -> Result<NaiveDateTime, DateTimeError> {
    let year = 2000 + i32::from(snapshot.year);
    NaiveDate::from_ymd_opt(year, u32::from(snapshot.month), u32::from(snapshot.day))
        .and_then(|date| {
            date.and_hms_opt(
                u32::from(snapshot.hour_24()),
                u32::from(snapshot.minute),
                u32::from(snapshot.second),
            )
        })
        .ok_or(DateTimeError::InvalidDateTime)
}

/// Splits `datetime` into snapshot time fields for the given hours format.
///
/// Temperature and flags are left at their defaults.
pub(crate) fn datetime_to_snapshot(
    datetime: &NaiveDateTime,
    time_representation: TimeRepresentation,
) -> Result<ClockSnapshot, DateTimeError> {
    let year = datetime.year();
    if !(2000..=2099).contains(&year) {
        warn!("year {} is outside 2000-2099", year);
        return Err(DateTimeError::YearOutOfRange);
    }
    let narrow = |v: u32| u8::try_from(v).map_err(|_| DateTimeError::InvalidDateTime);

    let (hour, pm) = split_hour(narrow(datetime.hour())?, time_representation);
    let snapshot = ClockSnapshot {
        second: narrow(datetime.second())?,
        minute: narrow(datetime.minute())?,
        hour,
        time_representation,
        pm,
        day_of_week: narrow(datetime.weekday().number_from_sunday())?,
        day: narrow(datetime.day())?,
        month: narrow(datetime.month())?,
        year: u8::try_from(year - 2000).map_err(|_| DateTimeError::YearOutOfRange)?,
        ..ClockSnapshot::default()
    };
    debug!(
        "datetime fields: {}-{}-{} {}:{}:{} dow={}",
        snapshot.year,
        snapshot.month,
        snapshot.day,
        snapshot.hour,
        snapshot.minute,
        snapshot.second,
        snapshot.day_of_week
    );
    Ok(snapshot)
}
