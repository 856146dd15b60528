//! Decoded device state.
//!
//! A refresh reads the register file into a buffer indexed by register
//! address and [`decode`] turns it into a [`DeviceState`] in one pass. The
//! driver only commits the result when decoding succeeded, so a failed or
//! corrupt read never leaves a half-updated state behind.
//!
//! The encode helpers here build the byte sequences written by `set` and
//! `alarm_set`; they never touch the bus.

use crate::alarm::{Alarm, AlarmMode, AlarmState};
use crate::codec::{
    bcd_to_dec, dec_to_bcd, decode_aging, decode_sqwg, decode_temperature, is_bcd,
    pack_alarm1_mode, pack_alarm2_mode, unpack_alarm1_mode, unpack_alarm2_mode, ALARM_DY_DT,
    ALARM_M1, ALARM_M2, ALARM_M3, ALARM_M4, TEMPERATURE_UNSUPPORTED,
};
use crate::model::{ControlLayout, Model, SquareWaveMode};
use crate::registers::{
    AlarmDayDate, AlarmHours, AlarmMinutes, AlarmSeconds, Control, DayDateSelect, Hours,
    InterruptControl, Month, RegAddr, Seconds, Status, TimeRepresentation, DS323X_BURST_LEN,
    TIME_BURST_LEN,
};

/// Size of the refresh buffer, indexed by register address.
pub(crate) const REGISTER_FILE_LEN: usize = DS323X_BURST_LEN;

/// Time fields and flags from the last refresh.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSnapshot {
    /// Seconds (0-59)
    pub second: u8,
    /// Minutes (0-59)
    pub minute: u8,
    /// Hours as stored: 0-23, or 1-12 in 12-hour mode
    pub hour: u8,
    /// Hours register format
    pub time_representation: TimeRepresentation,
    /// PM flag (12-hour mode only)
    pub pm: bool,
    /// Day of week (1-7, Sunday = 1)
    pub day_of_week: u8,
    /// Date of month (1-31)
    pub day: u8,
    /// Month (1-12)
    pub month: u8,
    /// Year within the century (0-99)
    pub year: u8,
    /// Temperature in hundredths of a degree Celsius, or
    /// [`TEMPERATURE_UNSUPPORTED`]
    pub temperature: i16,
    /// Oscillator stop flag (OSF) or clock halt (CH) seen
    pub lost_power: bool,
}

impl Default for ClockSnapshot {
    fn default() -> Self {
        Self {
            second: 0,
            minute: 0,
            hour: 0,
            time_representation: TimeRepresentation::TwentyFourHour,
            pm: false,
            day_of_week: 0,
            day: 0,
            month: 0,
            year: 0,
            temperature: TEMPERATURE_UNSUPPORTED,
            lost_power: false,
        }
    }
}

impl ClockSnapshot {
    /// Hour of the day (0-23) regardless of the stored representation.
    #[must_use]
    pub fn hour_24(&self) -> u8 {
        join_hour(self.hour, self.time_representation, self.pm)
    }
}

/// Everything one refresh decodes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
    /// Time and flags
    pub snapshot: ClockSnapshot,
    /// Alarm 1
    pub alarm1: AlarmState,
    /// Alarm 2
    pub alarm2: AlarmState,
    /// Square-wave generator mode
    pub sqwg: SquareWaveMode,
    /// 32kHz output enabled (EN32kHz, or SQWG at 32.768kHz on the DS1307)
    pub out_32k: bool,
    /// Aging offset
    pub aging: i8,
}

impl DeviceState {
    /// Cached state of `alarm`.
    #[must_use]
    pub fn alarm(&self, alarm: Alarm) -> &AlarmState {
        match alarm {
            Alarm::Alarm1 => &self.alarm1,
            Alarm::Alarm2 => &self.alarm2,
        }
    }

    pub(crate) fn alarm_mut(&mut self, alarm: Alarm) -> &mut AlarmState {
        match alarm {
            Alarm::Alarm1 => &mut self.alarm1,
            Alarm::Alarm2 => &mut self.alarm2,
        }
    }

    /// Mirrors a control register write into the cached state.
    ///
    /// `control` is the value now in the chip. On the DS3231/DS3232 each
    /// alarm is reported with its programmed mode while INTCN and its AxIE
    /// bit are both set, and `Disabled` otherwise.
    pub(crate) fn apply_control(&mut self, layout: ControlLayout, control: u8) {
        self.sqwg = decode_sqwg(layout, control);
        match layout {
            ControlLayout::Ds1307 => self.out_32k = self.sqwg == SquareWaveMode::Hz32768,
            ControlLayout::Ds323x => {
                let control = Control::from(control);
                let interrupts = control.interrupt_control() == InterruptControl::Interrupt;
                for (alarm, enabled) in [
                    (Alarm::Alarm1, control.alarm1_interrupt_enable()),
                    (Alarm::Alarm2, control.alarm2_interrupt_enable()),
                ] {
                    let state = self.alarm_mut(alarm);
                    state.mode = if interrupts && enabled {
                        state.programmed
                    } else {
                        AlarmMode::Disabled
                    };
                }
            }
        }
    }
}

/// A refresh returned a time register that does not hold valid BCD.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct CorruptRegister(pub u8);

fn bcd_field(regs: &[u8], register: RegAddr, mask: u8) -> Result<u8, CorruptRegister> {
    let raw = regs[register as usize] & mask;
    if is_bcd(raw) {
        Ok(bcd_to_dec(raw))
    } else {
        Err(CorruptRegister(register as u8))
    }
}

/// Splits an hour of the day (0-23) into its stored form and PM flag.
pub(crate) fn split_hour(hour: u8, representation: TimeRepresentation) -> (u8, bool) {
    match representation {
        TimeRepresentation::TwentyFourHour => (hour, false),
        TimeRepresentation::TwelveHour => match hour {
            0 => (12, false),
            1..=11 => (hour, false),
            12 => (12, true),
            _ => (hour.wrapping_sub(12), true),
        },
    }
}

/// Inverse of [`split_hour`].
pub(crate) fn join_hour(hour: u8, representation: TimeRepresentation, pm: bool) -> u8 {
    match representation {
        TimeRepresentation::TwentyFourHour => hour,
        TimeRepresentation::TwelveHour => match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h.wrapping_add(12),
        },
    }
}

/// Builds an hours register from the stored hour and PM flag.
pub(crate) fn encode_hours(hour: u8, representation: TimeRepresentation, pm: bool) -> u8 {
    let bcd = dec_to_bcd(hour);
    let mut value = Hours::default();
    value.set_time_representation(representation);
    value.set_hours(bcd & 0x0F);
    match representation {
        TimeRepresentation::TwentyFourHour => {
            value.set_ten_hours((bcd >> 4) & 0b01);
            value.set_pm_or_twenty_hours((bcd >> 5) & 0b01);
        }
        TimeRepresentation::TwelveHour => {
            value.set_ten_hours((bcd >> 4) & 0b01);
            value.set_pm_or_twenty_hours(u8::from(pm));
        }
    }
    value.into()
}

/// Decodes an hours register into (stored hour, representation, PM flag).
///
/// Returns `None` if the hour digits are not valid BCD.
pub(crate) fn decode_hours(raw: u8) -> Option<(u8, TimeRepresentation, bool)> {
    let hours = Hours::from(raw & 0x7F);
    let representation = hours.time_representation();
    let (bcd, pm) = match representation {
        TimeRepresentation::TwentyFourHour => (raw & 0x3F, false),
        TimeRepresentation::TwelveHour => (raw & 0x1F, hours.pm_or_twenty_hours() == 1),
    };
    is_bcd(bcd).then_some((bcd_to_dec(bcd), representation, pm))
}

/// Builds the 7-byte time burst (prefixed by register 0) for `snapshot`.
///
/// The month byte always carries bit 7.
pub(crate) fn encode_time(snapshot: &ClockSnapshot) -> [u8; TIME_BURST_LEN + 1] {
    let mut seconds = Seconds::from(dec_to_bcd(snapshot.second));
    seconds.set_clock_halt(false);
    let mut month = Month::from(dec_to_bcd(snapshot.month));
    month.set_century(true);
    [
        RegAddr::Seconds as u8,
        seconds.into(),
        dec_to_bcd(snapshot.minute),
        encode_hours(
            snapshot.hour,
            snapshot.time_representation,
            snapshot.pm,
        ),
        dec_to_bcd(snapshot.day_of_week),
        dec_to_bcd(snapshot.day),
        month.into(),
        dec_to_bcd(snapshot.year),
    ]
}

/// Builds the alarm register write (prefixed by its first register).
///
/// Returns the buffer and the number of bytes to send: 5 for Alarm 1, 4 for
/// Alarm 2. `state.hour` is 0-23 and is written in `representation`.
pub(crate) fn encode_alarm(
    alarm: Alarm,
    state: &AlarmState,
    representation: TimeRepresentation,
) -> ([u8; 5], usize) {
    let pattern = match state.programmed {
        AlarmMode::Alarm1(mode) => pack_alarm1_mode(mode),
        AlarmMode::Alarm2(mode) => pack_alarm2_mode(mode),
        AlarmMode::Disabled => 0,
    };

    let mut seconds = AlarmSeconds::default();
    seconds.set_bcd_seconds(dec_to_bcd(state.second));
    seconds.set_alarm_mask1(pattern & ALARM_M1 != 0);

    let mut minutes = AlarmMinutes::default();
    minutes.set_bcd_minutes(dec_to_bcd(state.minute));
    minutes.set_alarm_mask2(pattern & ALARM_M2 != 0);

    let (hour, pm) = split_hour(state.hour, representation);
    let mut hours = AlarmHours::default();
    hours.set_hours(encode_hours(hour, representation, pm));
    hours.set_alarm_mask3(pattern & ALARM_M3 != 0);

    let mut day_date = AlarmDayDate::default();
    day_date.set_bcd_day_date(dec_to_bcd(state.day_dow));
    day_date.set_day_date_select(state.day_date_select);
    day_date.set_alarm_mask4(pattern & ALARM_M4 != 0);

    let first = alarm.first_register();
    match alarm {
        Alarm::Alarm1 => (
            [
                first,
                seconds.into(),
                minutes.into(),
                hours.into(),
                day_date.into(),
            ],
            5,
        ),
        Alarm::Alarm2 => (
            [first, minutes.into(), hours.into(), day_date.into(), 0],
            4,
        ),
    }
}

fn decode_alarm(alarm: Alarm, regs: &[u8], enabled: bool, triggered: bool) -> AlarmState {
    let first = usize::from(alarm.first_register());
    let (seconds, rest) = match alarm {
        Alarm::Alarm1 => (AlarmSeconds::from(regs[first]), &regs[first + 1..first + 4]),
        Alarm::Alarm2 => {
            let mut masked = AlarmSeconds::default();
            masked.set_alarm_mask1(true);
            (masked, &regs[first..first + 3])
        }
    };
    let minutes = AlarmMinutes::from(rest[0]);
    let hours = AlarmHours::from(rest[1]);
    let day_date = AlarmDayDate::from(rest[2]);

    let pattern = u8::from(seconds.alarm_mask1())
        | u8::from(minutes.alarm_mask2()) << 1
        | u8::from(hours.alarm_mask3()) << 2
        | u8::from(day_date.alarm_mask4()) << 3
        | u8::from(day_date.day_date_select()) << 4;

    let programmed = match alarm {
        Alarm::Alarm1 => unpack_alarm1_mode(pattern).map(AlarmMode::Alarm1),
        Alarm::Alarm2 => unpack_alarm2_mode(pattern).map(AlarmMode::Alarm2),
    };
    if enabled && programmed.is_none() {
        warn!("{:?}: mask pattern {} not defined, reporting disabled", alarm, pattern);
    }
    let programmed = programmed.unwrap_or_default();
    let mode = if enabled { programmed } else { AlarmMode::Disabled };

    let hour = match decode_hours(hours.hours()) {
        Some((hour, representation, pm)) => join_hour(hour, representation, pm),
        None => bcd_to_dec(hours.hours() & 0x3F),
    };

    AlarmState {
        mode,
        programmed,
        second: match alarm {
            Alarm::Alarm1 => bcd_to_dec(seconds.bcd_seconds()),
            Alarm::Alarm2 => 0,
        },
        minute: bcd_to_dec(minutes.bcd_minutes()),
        hour,
        day_dow: bcd_to_dec(day_date.bcd_day_date()),
        day_date_select: if pattern & ALARM_DY_DT != 0 {
            DayDateSelect::Day
        } else {
            DayDateSelect::Date
        },
        triggered,
    }
}

/// Decodes a register file read by a refresh.
///
/// `regs` is indexed by register address. On the DS1307 only the time
/// registers and the control register at 0x07 are looked at.
pub(crate) fn decode(
    model: Model,
    regs: &[u8; REGISTER_FILE_LEN],
) -> Result<DeviceState, CorruptRegister> {
    let map = model.register_map();

    let second = bcd_field(regs, RegAddr::Seconds, 0x7F)?;
    let minute = bcd_field(regs, RegAddr::Minutes, 0x7F)?;
    let (hour, time_representation, pm) =
        decode_hours(regs[RegAddr::Hours as usize]).ok_or(CorruptRegister(RegAddr::Hours as u8))?;

    let mut snapshot = ClockSnapshot {
        second,
        minute,
        hour,
        time_representation,
        pm,
        day_of_week: bcd_field(regs, RegAddr::Day, 0x07)?,
        day: bcd_field(regs, RegAddr::Date, 0x3F)?,
        month: bcd_field(regs, RegAddr::Month, 0x1F)?,
        year: bcd_field(regs, RegAddr::Year, 0xFF)?,
        temperature: TEMPERATURE_UNSUPPORTED,
        lost_power: false,
    };

    let control = regs[usize::from(map.control)];
    let sqwg = decode_sqwg(map.layout, control);
    let mut state = DeviceState {
        sqwg,
        ..DeviceState::default()
    };

    match map.layout {
        ControlLayout::Ds1307 => {
            let (register, mask) = map.lost_power;
            snapshot.lost_power = regs[usize::from(register)] & mask != 0;
            state.out_32k = sqwg == SquareWaveMode::Hz32768;
        }
        ControlLayout::Ds323x => {
            let control = Control::from(control);
            let status = Status::from(regs[RegAddr::ControlStatus as usize]);
            let interrupts = control.interrupt_control() == InterruptControl::Interrupt;

            snapshot.lost_power = status.oscillator_stop_flag();
            if map.temperature {
                snapshot.temperature = decode_temperature(
                    regs[RegAddr::MSBTemp as usize],
                    regs[RegAddr::LSBTemp as usize],
                );
            }
            state.out_32k = status.enable_32khz_output();
            state.aging = decode_aging(regs[RegAddr::AgingOffset as usize]);
            state.alarm1 = decode_alarm(
                Alarm::Alarm1,
                regs,
                interrupts && control.alarm1_interrupt_enable(),
                status.alarm1_flag(),
            );
            state.alarm2 = decode_alarm(
                Alarm::Alarm2,
                regs,
                interrupts && control.alarm2_interrupt_enable(),
                status.alarm2_flag(),
            );
        }
    }

    state.snapshot = snapshot;
    Ok(state)
}
