//! # dsrtc
//!
//! A platform-agnostic, `no_std` register-level driver for the DS1307,
//! DS3231 and DS3232 real-time clocks using the `embedded-hal` I2C traits.
//!
//! The driver keeps a decoded copy of the chip's registers. [`ClockDevice::refresh`]
//! reads them in one burst (7 bytes on the DS1307, 19 on the DS3231/DS3232)
//! and every getter afterwards is a plain read of that cached state. Setters
//! write the chip and update the cache so getters reflect the written value
//! without another refresh.
//!
//! ## Features
//! - Time and date (BCD, 12/24-hour) with chrono conversions
//! - Both DS3231/DS3232 alarms, interrupt enables and flags
//! - Square-wave generator on every model
//! - Oscillator-stop / clock-halt detection and battery switch-over
//! - Battery-backed RAM (DS1307, DS3232)
//! - Aging offset, temperature and 32kHz output (DS3231/DS3232)
//! - Optional async front-end (feature `async`)
//! - Logging through `log` or `defmt` (features `log` / `defmt`)
//!
//! Requests a model cannot serve are not errors: they return `Ok(false)`,
//! or `0xFF` for RAM reads outside the window, without touching the bus.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dsrtc::{Alarm, Alarm1Mode, AlarmMode, ClockDevice, Model};
//!
//! let mut rtc = ClockDevice::new(i2c, Model::Ds3231);
//! rtc.set(30, 15, 10, 3, 15, 6, 23)?;
//! rtc.refresh()?;
//! assert_eq!(rtc.minute(), 15);
//!
//! rtc.alarm_set(
//!     Alarm::Alarm1,
//!     AlarmMode::Alarm1(Alarm1Mode::FixedHourMinuteSecond),
//!     0, 30, 7, 1,
//! )?;
//! ```
//!
//! A `ClockDevice` owns its bus handle and is not meant to be shared between
//! threads; wrap the bus in one of the `embedded-hal-bus` sharing types to put
//! several devices on one bus.

#![no_std]

#[macro_use]
mod fmt;

// Cached accessors shared by the blocking and async front-ends. None of them
// touches the bus.
macro_rules! impl_cached_accessors {
    () => {
        /// I2C address used for every transaction.
        pub fn address(&self) -> u8 {
            self.address
        }

        /// Selected chip model.
        pub fn model(&self) -> $crate::Model {
            self.model
        }

        /// Everything decoded by the last refresh, plus later writes.
        pub fn state(&self) -> &$crate::DeviceState {
            &self.state
        }

        /// Time fields and flags from the last refresh.
        pub fn snapshot(&self) -> &$crate::ClockSnapshot {
            &self.state.snapshot
        }

        /// Seconds (0-59).
        pub fn second(&self) -> u8 {
            self.state.snapshot.second
        }

        /// Minutes (0-59).
        pub fn minute(&self) -> u8 {
            self.state.snapshot.minute
        }

        /// Hours as stored by the chip: 0-23, or 1-12 in 12-hour mode (see [`Self::is_pm`]).
        pub fn hour(&self) -> u8 {
            self.state.snapshot.hour
        }

        /// Date of month (1-31).
        pub fn day(&self) -> u8 {
            self.state.snapshot.day
        }

        /// Month (1-12).
        pub fn month(&self) -> u8 {
            self.state.snapshot.month
        }

        /// Year within the century (0-99, 2000 implied).
        pub fn year(&self) -> u8 {
            self.state.snapshot.year
        }

        /// Day of week (1-7, Sunday = 1).
        pub fn day_of_week(&self) -> u8 {
            self.state.snapshot.day_of_week
        }

        /// Temperature in hundredths of a degree Celsius.
        ///
        /// Models without a sensor report
        /// [`TEMPERATURE_UNSUPPORTED`](crate::TEMPERATURE_UNSUPPORTED).
        pub fn temp(&self) -> i16 {
            self.state.snapshot.temperature
        }

        /// Temperature in degrees Celsius, `None` on models without a sensor.
        #[cfg(feature = "temperature_f32")]
        pub fn temp_f32(&self) -> Option<f32> {
            let temperature = self.state.snapshot.temperature;
            (temperature != $crate::TEMPERATURE_UNSUPPORTED).then(|| f32::from(temperature) / 100.0)
        }

        /// Hours register format seen at the last refresh or write.
        pub fn time_representation(&self) -> $crate::TimeRepresentation {
            self.state.snapshot.time_representation
        }

        /// PM flag, only meaningful in 12-hour mode.
        pub fn is_pm(&self) -> bool {
            self.state.snapshot.pm
        }

        /// Cached time as a `NaiveDateTime`.
        ///
        /// # Errors
        /// `DateTimeError::InvalidDateTime` if the cached fields are not a
        /// valid date, for example before the first refresh.
        pub fn datetime(&self) -> Result<chrono::NaiveDateTime, $crate::DateTimeError> {
            $crate::datetime::snapshot_to_datetime(&self.state.snapshot)
        }

        /// Whether the oscillator stopped (OSF) or the clock was halted (CH, DS1307).
        pub fn lost_power(&self) -> bool {
            self.state.snapshot.lost_power
        }

        /// Cached state of `alarm`.
        pub fn alarm(&self, alarm: $crate::Alarm) -> &$crate::AlarmState {
            self.state.alarm(alarm)
        }

        /// Mode of `alarm`, `Disabled` when its interrupt is off.
        pub fn alarm_mode(&self, alarm: $crate::Alarm) -> $crate::AlarmMode {
            self.state.alarm(alarm).mode
        }

        /// Alarm seconds (always 0 for Alarm 2).
        pub fn alarm_second(&self, alarm: $crate::Alarm) -> u8 {
            self.state.alarm(alarm).second
        }

        /// Alarm minutes.
        pub fn alarm_minute(&self, alarm: $crate::Alarm) -> u8 {
            self.state.alarm(alarm).minute
        }

        /// Alarm hours (0-23).
        pub fn alarm_hour(&self, alarm: $crate::Alarm) -> u8 {
            self.state.alarm(alarm).hour
        }

        /// Alarm date of month or day of week, depending on the mode.
        pub fn alarm_day_dow(&self, alarm: $crate::Alarm) -> u8 {
            self.state.alarm(alarm).day_dow
        }

        /// Whether the selected alarm flag was set at the last refresh.
        pub fn alarm_triggered(&self, selector: $crate::AlarmSelector) -> bool {
            match selector {
                $crate::AlarmSelector::Alarm1 => self.state.alarm1.triggered,
                $crate::AlarmSelector::Alarm2 => self.state.alarm2.triggered,
                $crate::AlarmSelector::Any => {
                    self.state.alarm1.triggered || self.state.alarm2.triggered
                }
            }
        }

        /// Square-wave generator mode.
        pub fn sqwg_mode(&self) -> $crate::SquareWaveMode {
            self.state.sqwg
        }

        /// Whether the 32kHz output is enabled.
        pub fn status_32k_out(&self) -> bool {
            self.state.out_32k
        }
    };
}

pub mod alarm;
#[cfg(feature = "async")]
pub mod asynch;
pub mod codec;
pub mod datetime;
pub mod model;
pub mod registers;
pub mod state;
#[cfg(test)]
mod testing;

use chrono::NaiveDateTime;
use embedded_hal::i2c::I2c;

pub use crate::alarm::{Alarm, Alarm1Mode, Alarm2Mode, AlarmMode, AlarmSelector, AlarmState};
pub use crate::codec::TEMPERATURE_UNSUPPORTED;
pub use crate::datetime::DateTimeError;
pub use crate::model::{ControlLayout, Model, RamWindow, RegisterMap, SquareWaveMode};
pub use crate::registers::{DayDateSelect, TimeRepresentation};
pub use crate::state::{ClockSnapshot, DeviceState};

use crate::codec::{decode_aging, encode_aging, sqwg_masks};
use crate::registers::{RegAddr, CONTROL_CONV, CONTROL_EOSC, CONTROL_INTCN, STATUS_EN32KHZ};
use crate::state::{
    decode_hours, encode_alarm, encode_hours, encode_time, join_hour, split_hour,
    CorruptRegister, REGISTER_FILE_LEN,
};

/// I2C address shared by the whole family.
pub const DEFAULT_ADDRESS: u8 = 0x68;

/// Errors returned by the driver.
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// I2C bus error
    I2c(E),
    /// A refresh read a time register that is not valid BCD; cached state was kept
    CorruptRead {
        /// Address of the first bad register
        register: u8,
    },
    /// Date/time conversion error
    DateTime(DateTimeError),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::I2c(e)
    }
}

impl<E> Error<E> {
    pub(crate) fn corrupt(CorruptRegister(register): CorruptRegister) -> Self {
        warn!("register {:#x} does not hold valid BCD, keeping cached state", register);
        Error::CorruptRead { register }
    }
}

/// Builds the snapshot written by `set`, keeping the flags that a time write
/// does not touch.
pub(crate) fn time_write_snapshot(
    model: Model,
    current: &ClockSnapshot,
    time: ClockSnapshot,
) -> ClockSnapshot {
    let (lost_power_register, _) = model.register_map().lost_power;
    ClockSnapshot {
        temperature: current.temperature,
        // Rewriting the seconds register clears CH on the DS1307.
        lost_power: current.lost_power && lost_power_register != RegAddr::Seconds as u8,
        ..time
    }
}

/// Blocking driver for a DS1307, DS3231 or DS3232.
///
/// See the crate documentation for the caching model.
pub struct ClockDevice<I2C: I2c> {
    i2c: I2C,
    address: u8,
    model: Model,
    state: DeviceState,
    yield_hook: Option<fn()>,
}

impl<I2C: I2c> ClockDevice<I2C> {
    /// Creates a driver for `model` at [`DEFAULT_ADDRESS`].
    ///
    /// Nothing is sent on the bus; call [`refresh`](Self::refresh) to load the state.
    pub fn new(i2c: I2C, model: Model) -> Self {
        Self::with_address(i2c, model, DEFAULT_ADDRESS)
    }

    /// Creates a driver for `model` at `address`.
    pub fn with_address(i2c: I2C, model: Model, address: u8) -> Self {
        Self {
            i2c,
            address,
            model,
            state: DeviceState::default(),
            yield_hook: None,
        }
    }

    /// Installs a hook called between the bus steps of multi-transaction operations.
    ///
    /// The hook must not touch the device; it exists for platforms whose
    /// network stack needs servicing during long blocking calls.
    #[must_use]
    pub fn with_yield_hook(mut self, hook: fn()) -> Self {
        self.yield_hook = Some(hook);
        self
    }

    /// Consumes the driver and returns the I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Changes the I2C address used for later transactions.
    pub fn set_rtc_address(&mut self, address: u8) {
        self.address = address;
    }

    /// Changes the chip model.
    ///
    /// The cached state belongs to the previous model and is reset.
    pub fn set_model(&mut self, model: Model) {
        self.model = model;
        self.state = DeviceState::default();
    }

    impl_cached_accessors!();

    fn pause(&self) {
        if let Some(hook) = self.yield_hook {
            hook();
        }
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Error<I2C::Error>> {
        let mut data = [0];
        self.i2c.write_read(self.address, &[register], &mut data)?;
        Ok(data[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c.write(self.address, &[register, value])?;
        Ok(())
    }

    /// Read-modify-write: `new = (old & and) | or`.
    fn update_register(&mut self, register: u8, and: u8, or: u8) -> Result<u8, Error<I2C::Error>> {
        let old = self.read_register(register)?;
        let new = (old & and) | or;
        debug!("register {:#x}: {:#x} -> {:#x}", register, old, new);
        self.pause();
        self.write_register(register, new)?;
        Ok(new)
    }

    /// Reads the register file and replaces the cached state.
    ///
    /// # Errors
    /// On a bus error, or when a time register does not hold valid BCD
    /// (`Error::CorruptRead`), the cached state is left untouched.
    pub fn refresh(&mut self) -> Result<(), Error<I2C::Error>> {
        let map = self.model.register_map();
        let mut regs = [0u8; REGISTER_FILE_LEN];
        self.i2c.write_read(
            self.address,
            &[RegAddr::Seconds as u8],
            &mut regs[..map.burst_len],
        )?;
        if map.layout == ControlLayout::Ds1307 {
            self.pause();
            regs[usize::from(map.control)] = self.read_register(map.control)?;
        }
        let state = state::decode(self.model, &regs).map_err(Error::corrupt)?;
        debug!("refresh: {:?}", state.snapshot);
        self.state = state;
        Ok(())
    }

    /// Writes the time registers in one burst.
    ///
    /// `hour` is 0-23 and is written in the representation last seen (24-hour
    /// until a refresh says otherwise). Fields are not range-checked. The
    /// month byte always has bit 7 set. On the DS1307 this also clears CH.
    #[allow(clippy::too_many_arguments)]
    pub fn set(
        &mut self,
        second: u8,
        minute: u8,
        hour: u8,
        day_of_week: u8,
        day: u8,
        month: u8,
        year: u8,
    ) -> Result<(), Error<I2C::Error>> {
        let time_representation = self.state.snapshot.time_representation;
        let (hour, pm) = split_hour(hour, time_representation);
        self.write_time(ClockSnapshot {
            second,
            minute,
            hour,
            time_representation,
            pm,
            day_of_week,
            day,
            month,
            year,
            ..ClockSnapshot::default()
        })
    }

    /// Writes the time registers from a `NaiveDateTime`.
    ///
    /// # Errors
    /// `Error::DateTime(DateTimeError::YearOutOfRange)` outside 2000-2099.
    pub fn set_datetime(&mut self, datetime: &NaiveDateTime) -> Result<(), Error<I2C::Error>> {
        let time = datetime::datetime_to_snapshot(datetime, self.state.snapshot.time_representation)
            .map_err(Error::DateTime)?;
        self.write_time(time)
    }

    fn write_time(&mut self, time: ClockSnapshot) -> Result<(), Error<I2C::Error>> {
        let snapshot = time_write_snapshot(self.model, &self.state.snapshot, time);
        self.i2c.write(self.address, &encode_time(&snapshot))?;
        self.state.snapshot = snapshot;
        Ok(())
    }

    /// Switches the hours register between 12- and 24-hour format, keeping the hour.
    pub fn set_time_representation(
        &mut self,
        time_representation: TimeRepresentation,
    ) -> Result<(), Error<I2C::Error>> {
        let register = RegAddr::Hours as u8;
        let raw = self.read_register(register)?;
        let (hour, current, pm) =
            decode_hours(raw).ok_or_else(|| Error::corrupt(CorruptRegister(register)))?;
        let (hour, pm) = split_hour(join_hour(hour, current, pm), time_representation);
        self.pause();
        self.write_register(register, encode_hours(hour, time_representation, pm))?;

        let snapshot = &mut self.state.snapshot;
        snapshot.hour = hour;
        snapshot.pm = pm;
        snapshot.time_representation = time_representation;
        Ok(())
    }

    /// Clears the lost-power flag: OSF on the DS3231/DS3232, CH on the DS1307
    /// (which restarts the clock, keeping the seconds).
    pub fn lost_power_clear(&mut self) -> Result<(), Error<I2C::Error>> {
        let (register, mask) = self.model.register_map().lost_power;
        self.update_register(register, !mask, 0)?;
        self.state.snapshot.lost_power = false;
        Ok(())
    }

    /// Keeps the oscillator running on battery (clears EOSC).
    ///
    /// Always `Ok(true)` on the DS1307, which has no such switch.
    pub fn enable_battery(&mut self) -> Result<bool, Error<I2C::Error>> {
        self.oscillator_on_battery(true)
    }

    /// Stops the oscillator when running on battery (sets EOSC).
    ///
    /// Always `Ok(true)` on the DS1307, which has no such switch.
    pub fn disable_battery(&mut self) -> Result<bool, Error<I2C::Error>> {
        self.oscillator_on_battery(false)
    }

    fn oscillator_on_battery(&mut self, enable: bool) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        if !map.oscillator_switch {
            return Ok(true);
        }
        if enable {
            self.update_register(map.control, !CONTROL_EOSC, 0)?;
        } else {
            self.update_register(map.control, 0xFF, CONTROL_EOSC)?;
        }
        Ok(true)
    }

    /// Programs and arms an alarm.
    ///
    /// Writes the alarm registers, then raises the alarm's interrupt enable
    /// together with INTCN, which takes the INT/SQW pin away from the square
    /// wave. `AlarmMode::Disabled` only clears the enable bit.
    ///
    /// # Arguments
    /// * `alarm` - Alarm to program
    /// * `mode` - Match mode; must belong to `alarm`
    /// * `second` - Seconds (ignored by Alarm 2)
    /// * `minute` - Minutes
    /// * `hour` - Hours, 0-23
    /// * `day_dow` - Date of month, or day of week for the weekday modes
    ///
    /// # Returns
    /// * `Ok(false)` on models without alarms or when `mode` is for the other alarm
    pub fn alarm_set(
        &mut self,
        alarm: Alarm,
        mode: AlarmMode,
        second: u8,
        minute: u8,
        hour: u8,
        day_dow: u8,
    ) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        if !map.alarms || !mode.fits(alarm) {
            return Ok(false);
        }
        if mode == AlarmMode::Disabled {
            return self.alarm_disable(alarm);
        }

        let state = AlarmState {
            mode,
            programmed: mode,
            second: if alarm == Alarm::Alarm1 { second } else { 0 },
            minute,
            hour,
            day_dow,
            day_date_select: mode.day_date_select(),
            triggered: self.state.alarm(alarm).triggered,
        };
        let (data, len) = encode_alarm(alarm, &state, self.state.snapshot.time_representation);
        debug!("{:?}: writing {:?}", alarm, &data[..len]);
        self.i2c.write(self.address, &data[..len])?;
        self.pause();
        let control = self.update_register(map.control, 0xFF, alarm.bit() | CONTROL_INTCN)?;

        *self.state.alarm_mut(alarm) = state;
        self.state.apply_control(map.layout, control);
        Ok(true)
    }

    /// Clears only the alarm's interrupt enable bit.
    ///
    /// `Ok(false)` on models without alarms.
    pub fn alarm_disable(&mut self, alarm: Alarm) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        if !map.alarms {
            return Ok(false);
        }
        let control = self.update_register(map.control, !alarm.bit(), 0)?;
        self.state.apply_control(map.layout, control);
        Ok(true)
    }

    /// Clears only the alarm's flag in the status register.
    ///
    /// `Ok(false)` on models without alarms.
    pub fn alarm_clear_flag(&mut self, alarm: Alarm) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        let Some(status) = map.status.filter(|_| map.alarms) else {
            return Ok(false);
        };
        self.update_register(status, !alarm.bit(), 0)?;
        self.state.alarm_mut(alarm).triggered = false;
        Ok(true)
    }

    /// Sets the square-wave generator mode.
    ///
    /// On the DS3231/DS3232 an active frequency hands the INT/SQW pin to the
    /// square wave and both alarms are reported disabled. Going back to
    /// `OffHigh` reports every alarm whose enable bit is still set as armed
    /// again.
    ///
    /// `Ok(false)` if the model cannot produce `mode`.
    pub fn sqwg_set_mode(&mut self, mode: SquareWaveMode) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        if !map.supports_sqwg(mode) {
            return Ok(false);
        }
        let Some((and, or)) = sqwg_masks(map.layout, mode) else {
            return Ok(false);
        };
        let control = self.update_register(map.control, and, or)?;
        self.state.apply_control(map.layout, control);
        Ok(true)
    }

    /// Reads one byte of battery-backed RAM.
    ///
    /// Returns `0xFF` without touching the bus when `address` is outside the
    /// model's RAM window (DS1307: 0-55, DS3232: 0-235, DS3231: none).
    pub fn ram_read(&mut self, address: u8) -> Result<u8, Error<I2C::Error>> {
        match self.model.register_map().ram.and_then(|ram| ram.register(address)) {
            Some(register) => self.read_register(register),
            None => Ok(0xFF),
        }
    }

    /// Writes one byte of battery-backed RAM.
    ///
    /// `Ok(false)` without touching the bus when `address` is outside the window.
    pub fn ram_write(&mut self, address: u8, value: u8) -> Result<bool, Error<I2C::Error>> {
        match self.model.register_map().ram.and_then(|ram| ram.register(address)) {
            Some(register) => {
                self.write_register(register, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reads the aging offset (0 on models without one).
    pub fn aging_get(&mut self) -> Result<i8, Error<I2C::Error>> {
        if !self.model.register_map().aging {
            return Ok(0);
        }
        let aging = decode_aging(self.read_register(RegAddr::AgingOffset as u8)?);
        self.state.aging = aging;
        Ok(aging)
    }

    /// Writes the aging offset and forces a temperature conversion so it
    /// takes effect immediately.
    ///
    /// The register holds -127..=127; `-128` is written as `-127`.
    ///
    /// `Ok(false)` on models without an aging register.
    pub fn aging_set(&mut self, aging: i8) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        if !map.aging {
            return Ok(false);
        }
        let raw = encode_aging(aging);
        self.write_register(RegAddr::AgingOffset as u8, raw)?;
        self.pause();
        self.update_register(map.control, 0xFF, CONTROL_CONV)?;
        self.state.aging = decode_aging(raw);
        Ok(true)
    }

    /// Enables the 32kHz output.
    ///
    /// The DS1307 has no 32kHz pin; there this selects the 32.768kHz square wave.
    pub fn enable_32k_out(&mut self) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        match map.status.filter(|_| map.pin_32k) {
            Some(status) => {
                self.update_register(status, 0xFF, STATUS_EN32KHZ)?;
                self.state.out_32k = true;
                Ok(true)
            }
            None => self.sqwg_set_mode(SquareWaveMode::Hz32768),
        }
    }

    /// Disables the 32kHz output.
    ///
    /// On the DS1307 this turns the square wave off with the pin held low.
    pub fn disable_32k_out(&mut self) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        match map.status.filter(|_| map.pin_32k) {
            Some(status) => {
                self.update_register(status, !STATUS_EN32KHZ, 0)?;
                self.state.out_32k = false;
                Ok(true)
            }
            None => self.sqwg_set_mode(SquareWaveMode::OffLow),
        }
    }
}
