//! Async front-end of the driver.
//!
//! Same operations and caching rules as the blocking [`crate::ClockDevice`],
//! over `embedded-hal-async` I2C. Only available with the `async` feature.
//!
//! # Example
//!
//! ```rust,ignore
//! use dsrtc::{asynch::ClockDevice, Model};
//!
//! let mut rtc = ClockDevice::new(i2c, Model::Ds3232);
//! rtc.refresh().await?;
//! let now = rtc.datetime()?;
//! rtc.ram_write(0, 0x42).await?;
//! ```

use chrono::NaiveDateTime;
use embedded_hal_async::i2c::I2c;

use crate::codec::{decode_aging, encode_aging, sqwg_masks};
use crate::datetime::datetime_to_snapshot;
use crate::registers::{RegAddr, CONTROL_CONV, CONTROL_EOSC, CONTROL_INTCN, STATUS_EN32KHZ};
use crate::state::{
    self, decode_hours, encode_alarm, encode_hours, encode_time, join_hour, split_hour,
    CorruptRegister, REGISTER_FILE_LEN,
};
use crate::{
    time_write_snapshot, Alarm, AlarmMode, AlarmState, ClockSnapshot, ControlLayout,
    DeviceState, Error, Model, SquareWaveMode, TimeRepresentation, DEFAULT_ADDRESS,
};

/// Async driver for a DS1307, DS3231 or DS3232.
pub struct ClockDevice<I2C: I2c> {
    i2c: I2C,
    address: u8,
    model: Model,
    state: DeviceState,
}

impl<I2C: I2c> ClockDevice<I2C> {
    /// Creates a driver for `model` at [`DEFAULT_ADDRESS`].
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
        }
    }

    /// Consumes the driver and returns the I2C bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Changes the I2C address used for later transactions.
    pub fn set_rtc_address(&mut self, address: u8) {
        self.address = address;
    }

    /// Changes the chip model and resets the cached state.
    pub fn set_model(&mut self, model: Model) {
        self.model = model;
        self.state = DeviceState::default();
    }

    impl_cached_accessors!();

    async fn read_register(&mut self, register: u8) -> Result<u8, Error<I2C::Error>> {
        let mut data = [0];
        self.i2c
            .write_read(self.address, &[register], &mut data)
            .await?;
        Ok(data[0])
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c.write(self.address, &[register, value]).await?;
        Ok(())
    }

    async fn update_register(
        &mut self,
        register: u8,
        and: u8,
        or: u8,
    ) -> Result<u8, Error<I2C::Error>> {
        let old = self.read_register(register).await?;
        let new = (old & and) | or;
        debug!("register {:#x}: {:#x} -> {:#x}", register, old, new);
        self.write_register(register, new).await?;
        Ok(new)
    }

    /// Reads the register file and replaces the cached state.
    ///
    /// # Errors
    /// On a bus error or a corrupt read the cached state is left untouched.
    pub async fn refresh(&mut self) -> Result<(), Error<I2C::Error>> {
        let map = self.model.register_map();
        let mut regs = [0u8; REGISTER_FILE_LEN];
        self.i2c
            .write_read(
                self.address,
                &[RegAddr::Seconds as u8],
                &mut regs[..map.burst_len],
            )
            .await?;
        if map.layout == ControlLayout::Ds1307 {
            regs[usize::from(map.control)] = self.read_register(map.control).await?;
        }
        let state = state::decode(self.model, &regs).map_err(Error::corrupt)?;
        debug!("refresh: {:?}", state.snapshot);
        self.state = state;
        Ok(())
    }

    /// Writes the time registers in one burst. See [`crate::ClockDevice::set`].
    #[allow(clippy::too_many_arguments)]
    pub async fn set(
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
        .await
    }

    /// Writes the time registers from a `NaiveDateTime`.
    pub async fn set_datetime(
        &mut self,
        datetime: &NaiveDateTime,
    ) -> Result<(), Error<I2C::Error>> {
        let time = datetime_to_snapshot(datetime, self.state.snapshot.time_representation)
            .map_err(Error::DateTime)?;
        self.write_time(time).await
    }

    async fn write_time(&mut self, time: ClockSnapshot) -> Result<(), Error<I2C::Error>> {
        let snapshot = time_write_snapshot(self.model, &self.state.snapshot, time);
        self.i2c
            .write(self.address, &encode_time(&snapshot))
            .await?;
        self.state.snapshot = snapshot;
        Ok(())
    }

    /// Switches the hours register between 12- and 24-hour format, keeping the hour.
    pub async fn set_time_representation(
        &mut self,
        time_representation: TimeRepresentation,
    ) -> Result<(), Error<I2C::Error>> {
        let register = RegAddr::Hours as u8;
        let raw = self.read_register(register).await?;
        let (hour, current, pm) =
            decode_hours(raw).ok_or_else(|| Error::corrupt(CorruptRegister(register)))?;
        let (hour, pm) = split_hour(join_hour(hour, current, pm), time_representation);
        self.write_register(register, encode_hours(hour, time_representation, pm))
            .await?;

        let snapshot = &mut self.state.snapshot;
        snapshot.hour = hour;
        snapshot.pm = pm;
        snapshot.time_representation = time_representation;
        Ok(())
    }

    /// Clears the lost-power flag (OSF, or CH on the DS1307).
    pub async fn lost_power_clear(&mut self) -> Result<(), Error<I2C::Error>> {
        let (register, mask) = self.model.register_map().lost_power;
        self.update_register(register, !mask, 0).await?;
        self.state.snapshot.lost_power = false;
        Ok(())
    }

    /// Keeps the oscillator running on battery. `Ok(true)` on the DS1307.
    pub async fn enable_battery(&mut self) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        if map.oscillator_switch {
            self.update_register(map.control, !CONTROL_EOSC, 0).await?;
        }
        Ok(true)
    }

    /// Stops the oscillator on battery. `Ok(true)` on the DS1307.
    pub async fn disable_battery(&mut self) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        if map.oscillator_switch {
            self.update_register(map.control, 0xFF, CONTROL_EOSC).await?;
        }
        Ok(true)
    }

    /// Programs and arms an alarm. See [`crate::ClockDevice::alarm_set`].
    pub async fn alarm_set(
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
            return self.alarm_disable(alarm).await;
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
        self.i2c.write(self.address, &data[..len]).await?;
        let control = self
            .update_register(map.control, 0xFF, alarm.bit() | CONTROL_INTCN)
            .await?;

        *self.state.alarm_mut(alarm) = state;
        self.state.apply_control(map.layout, control);
        Ok(true)
    }

    /// Clears only the alarm's interrupt enable bit.
    pub async fn alarm_disable(&mut self, alarm: Alarm) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        if !map.alarms {
            return Ok(false);
        }
        let control = self.update_register(map.control, !alarm.bit(), 0).await?;
        self.state.apply_control(map.layout, control);
        Ok(true)
    }

    /// Clears only the alarm's flag in the status register.
    pub async fn alarm_clear_flag(&mut self, alarm: Alarm) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        let Some(status) = map.status.filter(|_| map.alarms) else {
            return Ok(false);
        };
        self.update_register(status, !alarm.bit(), 0).await?;
        self.state.alarm_mut(alarm).triggered = false;
        Ok(true)
    }

    /// Sets the square-wave generator mode. `Ok(false)` if the model cannot produce it.
    pub async fn sqwg_set_mode(&mut self, mode: SquareWaveMode) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        let Some((and, or)) = sqwg_masks(map.layout, mode).filter(|_| map.supports_sqwg(mode))
        else {
            return Ok(false);
        };
        let control = self.update_register(map.control, and, or).await?;
        self.state.apply_control(map.layout, control);
        Ok(true)
    }

    /// Reads one byte of battery-backed RAM, `0xFF` outside the window.
    pub async fn ram_read(&mut self, address: u8) -> Result<u8, Error<I2C::Error>> {
        match self.model.register_map().ram.and_then(|ram| ram.register(address)) {
            Some(register) => self.read_register(register).await,
            None => Ok(0xFF),
        }
    }

    /// Writes one byte of battery-backed RAM, `Ok(false)` outside the window.
    pub async fn ram_write(&mut self, address: u8, value: u8) -> Result<bool, Error<I2C::Error>> {
        match self.model.register_map().ram.and_then(|ram| ram.register(address)) {
            Some(register) => {
                self.write_register(register, value).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reads the aging offset (0 on models without one).
    pub async fn aging_get(&mut self) -> Result<i8, Error<I2C::Error>> {
        if !self.model.register_map().aging {
            return Ok(0);
        }
        let aging = decode_aging(self.read_register(RegAddr::AgingOffset as u8).await?);
        self.state.aging = aging;
        Ok(aging)
    }

    /// Writes the aging offset and forces a temperature conversion.
    pub async fn aging_set(&mut self, aging: i8) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        if !map.aging {
            return Ok(false);
        }
        let raw = encode_aging(aging);
        self.write_register(RegAddr::AgingOffset as u8, raw).await?;
        self.update_register(map.control, 0xFF, CONTROL_CONV).await?;
        self.state.aging = decode_aging(raw);
        Ok(true)
    }

    /// Enables the 32kHz output (32.768kHz square wave on the DS1307).
    pub async fn enable_32k_out(&mut self) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        match map.status.filter(|_| map.pin_32k) {
            Some(status) => {
                self.update_register(status, 0xFF, STATUS_EN32KHZ).await?;
                self.state.out_32k = true;
                Ok(true)
            }
            None => self.sqwg_set_mode(SquareWaveMode::Hz32768).await,
        }
    }

    /// Disables the 32kHz output (square wave off, pin low, on the DS1307).
    pub async fn disable_32k_out(&mut self) -> Result<bool, Error<I2C::Error>> {
        let map = self.model.register_map();
        match map.status.filter(|_| map.pin_32k) {
            Some(status) => {
                self.update_register(status, !STATUS_EN32KHZ, 0).await?;
                self.state.out_32k = false;
                Ok(true)
            }
            None => self.sqwg_set_mode(SquareWaveMode::OffLow).await,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;
    use super::*;
    use crate::testing::SimulatedRtc;
    use crate::{Alarm1Mode, Alarm2Mode, AlarmSelector};
    use alloc::vec;
    use chrono::{Datelike, NaiveDate, Timelike};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

    const DEVICE_ADDRESS: u8 = 0x68;

    async fn setup_mock(expectations: &[I2cTrans]) -> I2cMock {
        I2cMock::new(expectations)
    }

    #[tokio::test]
    async fn test_async_refresh() {
        let mock = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            vec![
                0x00, 0x30, 0x15, 0x05, 0x14, 0x83, 0x24, // 2024-03-14 15:30:00
                0, 0, 0, 0, 0, 0, 0, // alarms
                0x1C, // control
                0x88, // status: OSF, EN32kHz
                0x00, // aging
                0xFF, 0x00, // temperature
            ],
        )])
        .await;
        let mut dev = ClockDevice::new(mock, Model::Ds3231);
        dev.refresh().await.unwrap();

        let dt = dev.datetime().unwrap();
        assert_eq!(dt.hour(), 15);
        assert_eq!(dt.minute(), 30);
        assert_eq!(dt.day(), 14);
        assert_eq!(dt.month(), 3);
        assert_eq!(dt.year(), 2024);
        assert_eq!(dev.day_of_week(), 5);
        assert_eq!(dev.temp(), -25);
        assert!(dev.lost_power());
        assert!(dev.status_32k_out());
        assert_eq!(dev.sqwg_mode(), SquareWaveMode::OffHigh);
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_async_refresh_error_keeps_state() {
        let mock = setup_mock(&[I2cTrans::write_read(DEVICE_ADDRESS, vec![0x00], vec![0; 7])
            .with_error(ErrorKind::Other)])
        .await;
        let mut dev = ClockDevice::new(mock, Model::Ds1307);
        assert_eq!(dev.refresh().await, Err(Error::I2c(ErrorKind::Other)));
        assert_eq!(*dev.state(), DeviceState::default());
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_async_set_datetime() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 14)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap();

        let mock = setup_mock(&[I2cTrans::write(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8, 0x00, 0x30, 0x15, 0x05, 0x14, 0x83, 0x24],
        )])
        .await;
        let mut dev = ClockDevice::new(mock, Model::Ds3231);
        dev.set_datetime(&dt).await.unwrap();
        assert_eq!(dev.datetime().unwrap(), dt);
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_async_alarm_set_and_clear() {
        let mock = setup_mock(&[
            I2cTrans::write(DEVICE_ADDRESS, vec![0x0B, 0x45, 0x80, 0x80]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![0x0E], vec![0b0001_1000]),
            I2cTrans::write(DEVICE_ADDRESS, vec![0x0E, 0b0001_1110]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![0x0F], vec![0b0000_0011]),
            I2cTrans::write(DEVICE_ADDRESS, vec![0x0F, 0b0000_0001]),
        ])
        .await;
        let mut dev = ClockDevice::new(mock, Model::Ds3232);
        let mode = AlarmMode::Alarm2(Alarm2Mode::FixedMinute);
        assert!(dev.alarm_set(Alarm::Alarm2, mode, 0, 45, 0, 0).await.unwrap());
        assert_eq!(dev.alarm_mode(Alarm::Alarm2), mode);
        assert!(dev.alarm_clear_flag(Alarm::Alarm2).await.unwrap());
        assert!(!dev.alarm_triggered(AlarmSelector::Any));
        dev.i2c.done();
    }

    #[tokio::test]
    async fn test_async_round_trip_against_register_file() {
        let mut dev = ClockDevice::new(SimulatedRtc::new(), Model::Ds3232);
        dev.set(30, 15, 10, 3, 15, 6, 23).await.unwrap();
        let mode = AlarmMode::Alarm1(Alarm1Mode::FixedMinuteSecond);
        dev.alarm_set(Alarm::Alarm1, mode, 5, 10, 0, 0).await.unwrap();
        assert!(dev.ram_write(100, 0x5A).await.unwrap());
        assert!(dev.aging_set(-127).await.unwrap());

        dev.refresh().await.unwrap();
        assert_eq!(
            (dev.second(), dev.minute(), dev.hour(), dev.day(), dev.month(), dev.year()),
            (30, 15, 10, 15, 6, 23)
        );
        assert_eq!(dev.alarm_mode(Alarm::Alarm1), mode);
        assert_eq!(dev.ram_read(100).await.unwrap(), 0x5A);
        assert_eq!(dev.aging_get().await.unwrap(), -127);

        assert!(dev.sqwg_set_mode(SquareWaveMode::Hz4096).await.unwrap());
        assert_eq!(dev.alarm_mode(Alarm::Alarm1), AlarmMode::Disabled);
    }

    #[tokio::test]
    async fn test_async_square_wave_off_rearms_alarms() {
        let mut dev = ClockDevice::new(SimulatedRtc::new(), Model::Ds3231);
        let a1 = AlarmMode::Alarm1(Alarm1Mode::FixedHourMinuteSecond);
        let a2 = AlarmMode::Alarm2(Alarm2Mode::EveryMinute);
        assert!(dev.alarm_set(Alarm::Alarm1, a1, 0, 30, 7, 0).await.unwrap());
        assert!(dev.sqwg_set_mode(SquareWaveMode::Hz1).await.unwrap());
        assert!(dev.sqwg_set_mode(SquareWaveMode::OffHigh).await.unwrap());
        assert_eq!(dev.alarm_mode(Alarm::Alarm1), a1);

        assert!(dev.sqwg_set_mode(SquareWaveMode::Hz1).await.unwrap());
        assert!(dev.alarm_set(Alarm::Alarm2, a2, 0, 0, 0, 0).await.unwrap());
        assert_eq!(dev.alarm_mode(Alarm::Alarm1), a1);
        assert_eq!(dev.alarm_mode(Alarm::Alarm2), a2);

        let cached = *dev.state();
        dev.refresh().await.unwrap();
        assert_eq!(dev.state().alarm1, cached.alarm1);
        assert_eq!(dev.state().alarm2, cached.alarm2);
    }

    #[tokio::test]
    async fn test_async_aging_keeps_sign() {
        let mut dev = ClockDevice::new(SimulatedRtc::new(), Model::Ds3231);
        assert!(dev.aging_set(-128).await.unwrap());
        assert_eq!(dev.i2c.regs[0x10], 0x80);
        assert_eq!(dev.aging_get().await.unwrap(), -127);
    }

    #[tokio::test]
    async fn test_async_ds1307_fallbacks() {
        let mut dev = ClockDevice::new(SimulatedRtc::new(), Model::Ds1307);
        assert!(dev.enable_battery().await.unwrap());
        assert!(!dev.aging_set(1).await.unwrap());
        assert_eq!(dev.ram_read(56).await.unwrap(), 0xFF);
        assert!(dev.enable_32k_out().await.unwrap());
        assert_eq!(dev.sqwg_mode(), SquareWaveMode::Hz32768);
        assert!(dev.disable_32k_out().await.unwrap());
        assert!(!dev.status_32k_out());
    }

    #[tokio::test]
    async fn test_async_nack_keeps_getters() {
        let mut dev = ClockDevice::new(SimulatedRtc::new(), Model::Ds3231);
        dev.set(1, 2, 3, 4, 5, 6, 7).await.unwrap();
        dev.refresh().await.unwrap();
        dev.i2c.nack = true;
        assert!(dev.refresh().await.is_err());
        assert_eq!(dev.second(), 1);
        assert_eq!(dev.year(), 7);
    }
}
