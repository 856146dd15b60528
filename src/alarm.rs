//! Alarm modes and cached alarm state for the DS3231/DS3232.
//!
//! Both alarms share the same register shape: Alarm 1 at 0x07-0x0A (seconds,
//! minutes, hours, day/date) and Alarm 2 at 0x0B-0x0D (no seconds). Each
//! register carries a mask bit in bit 7 and the day/date register carries the
//! DY/DT select in bit 6. Which combinations of masks are legal is fixed by
//! the datasheet and captured by [`Alarm1Mode`] and [`Alarm2Mode`].
//!
//! # Alarm 1 modes
//! - `EverySecond` - all masks set
//! - `FixedSecond` - seconds match
//! - `FixedMinuteSecond` - minutes and seconds match
//! - `FixedHourMinuteSecond` - hours, minutes and seconds match (daily)
//! - `FixedDateHourMinuteSecond` - time and date of month match
//! - `FixedWeekdayHourMinuteSecond` - time and day of week match
//!
//! # Alarm 2 modes
//! Same as Alarm 1 without the seconds field; Alarm 2 always fires at 00
//! seconds.

use crate::registers::{DayDateSelect, RegAddr};

/// One of the two hardware alarms.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alarm {
    /// Alarm 1 (seconds resolution)
    Alarm1,
    /// Alarm 2 (minutes resolution)
    Alarm2,
}

impl Alarm {
    /// First register of the alarm block.
    pub(crate) fn first_register(self) -> u8 {
        match self {
            Alarm::Alarm1 => RegAddr::Alarm1Seconds as u8,
            Alarm::Alarm2 => RegAddr::Alarm2Minutes as u8,
        }
    }

    /// Bit shared by the AxIE control bit and the AxF status flag.
    pub(crate) fn bit(self) -> u8 {
        match self {
            Alarm::Alarm1 => 0b01,
            Alarm::Alarm2 => 0b10,
        }
    }
}

/// Selects which alarm flag [`alarm_triggered`](crate::ClockDevice::alarm_triggered) looks at.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmSelector {
    /// Alarm 1 only
    Alarm1,
    /// Alarm 2 only
    Alarm2,
    /// Either alarm
    Any,
}

impl From<Alarm> for AlarmSelector {
    fn from(alarm: Alarm) -> Self {
        match alarm {
            Alarm::Alarm1 => AlarmSelector::Alarm1,
            Alarm::Alarm2 => AlarmSelector::Alarm2,
        }
    }
}

/// Match modes of Alarm 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alarm1Mode {
    /// Once per second
    EverySecond,
    /// When seconds match
    FixedSecond,
    /// When minutes and seconds match
    FixedMinuteSecond,
    /// When hours, minutes and seconds match
    FixedHourMinuteSecond,
    /// When date, hours, minutes and seconds match
    FixedDateHourMinuteSecond,
    /// When day of week, hours, minutes and seconds match
    FixedWeekdayHourMinuteSecond,
}

/// Match modes of Alarm 2.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alarm2Mode {
    /// Once per minute (at 00 seconds)
    EveryMinute,
    /// When minutes match
    FixedMinute,
    /// When hours and minutes match
    FixedHourMinute,
    /// When date, hours and minutes match
    FixedDateHourMinute,
    /// When day of week, hours and minutes match
    FixedWeekdayHourMinute,
}

/// Mode of an alarm, including whether it is armed at all.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmMode {
    /// Interrupt disabled, or the INT/SQW pin is producing a square wave
    #[default]
    Disabled,
    /// An Alarm 1 mode
    Alarm1(Alarm1Mode),
    /// An Alarm 2 mode
    Alarm2(Alarm2Mode),
}

impl AlarmMode {
    /// Whether this mode can be programmed into `alarm`.
    ///
    /// `Disabled` fits both alarms.
    #[must_use]
    pub fn fits(self, alarm: Alarm) -> bool {
        matches!(
            (self, alarm),
            (AlarmMode::Disabled, _)
                | (AlarmMode::Alarm1(_), Alarm::Alarm1)
                | (AlarmMode::Alarm2(_), Alarm::Alarm2)
        )
    }

    /// Whether the alarm is armed.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self != AlarmMode::Disabled
    }

    /// DY/DT select implied by the mode.
    #[must_use]
    pub fn day_date_select(self) -> DayDateSelect {
        match self {
            AlarmMode::Alarm1(Alarm1Mode::FixedWeekdayHourMinuteSecond)
            | AlarmMode::Alarm2(Alarm2Mode::FixedWeekdayHourMinute) => DayDateSelect::Day,
            _ => DayDateSelect::Date,
        }
    }
}

/// Cached state of one alarm, as seen at the last refresh or write.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmState {
    /// Current mode: `Disabled` unless the interrupt is enabled and routed
    /// to the INT/SQW pin
    pub mode: AlarmMode,
    /// Match mode held in the mask registers, kept while the interrupt is
    /// off so it can come back when INTCN and AxIE are set again
    pub programmed: AlarmMode,
    /// Seconds (Alarm 1 only, always 0 for Alarm 2)
    pub second: u8,
    /// Minutes (0-59)
    pub minute: u8,
    /// Hours (0-23)
    pub hour: u8,
    /// Date of month (1-31) or day of week (1-7)
    pub day_dow: u8,
    /// Whether `day_dow` is a date or a day of week
    pub day_date_select: DayDateSelect,
    /// Alarm flag (AxF) from the status register
    pub triggered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_fits_alarm() {
        let a1 = AlarmMode::Alarm1(Alarm1Mode::FixedSecond);
        let a2 = AlarmMode::Alarm2(Alarm2Mode::FixedMinute);
        assert!(a1.fits(Alarm::Alarm1));
        assert!(!a1.fits(Alarm::Alarm2));
        assert!(a2.fits(Alarm::Alarm2));
        assert!(!a2.fits(Alarm::Alarm1));
        assert!(AlarmMode::Disabled.fits(Alarm::Alarm1));
        assert!(AlarmMode::Disabled.fits(Alarm::Alarm2));
    }

    #[test]
    fn test_day_date_select() {
        assert_eq!(
            AlarmMode::Alarm1(Alarm1Mode::FixedWeekdayHourMinuteSecond).day_date_select(),
            DayDateSelect::Day
        );
        assert_eq!(
            AlarmMode::Alarm2(Alarm2Mode::FixedDateHourMinute).day_date_select(),
            DayDateSelect::Date
        );
        assert_eq!(AlarmMode::Disabled.day_date_select(), DayDateSelect::Date);
    }

    #[test]
    fn test_alarm_register_bits() {
        assert_eq!(Alarm::Alarm1.first_register(), 0x07);
        assert_eq!(Alarm::Alarm2.first_register(), 0x0B);
        assert_eq!(Alarm::Alarm1.bit(), 0b01);
        assert_eq!(Alarm::Alarm2.bit(), 0b10);
        assert_eq!(AlarmSelector::from(Alarm::Alarm2), AlarmSelector::Alarm2);
    }

    #[test]
    fn test_default_state_is_disabled() {
        let state = AlarmState::default();
        assert!(!state.mode.is_enabled());
        assert!(!state.programmed.is_enabled());
        assert!(!state.triggered);
    }
}
