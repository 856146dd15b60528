//! Register definitions and bitfield structures for the DS1307/DS3231/DS3232 RTCs.
//!
//! The timekeeping block (0x00-0x06) is shared by the whole family. Past it
//! the DS1307 has its control register and battery-backed RAM, while the
//! DS3231/DS3232 carry two alarms, control/status, aging and temperature
//! registers (and, on the DS3232, SRAM from 0x14).

use bitfield::bitfield;

/// Register addresses of the DS3231/DS3232 map.
///
/// The first seven entries are also valid on the DS1307.
#[allow(unused)]
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Seconds register (0-59)
    Seconds = 0x00,
    /// Minutes register (0-59)
    Minutes = 0x01,
    /// Hours register (1-12 + AM/PM or 0-23)
    Hours = 0x02,
    /// Day register (1-7)
    Day = 0x03,
    /// Date register (1-31)
    Date = 0x04,
    /// Month register (1-12)
    Month = 0x05,
    /// Year register (0-99)
    Year = 0x06,
    /// Alarm 1 seconds register
    Alarm1Seconds = 0x07,
    /// Alarm 1 minutes register
    Alarm1Minutes = 0x08,
    /// Alarm 1 hours register
    Alarm1Hours = 0x09,
    /// Alarm 1 day/date register
    Alarm1DayDate = 0x0A,
    /// Alarm 2 minutes register
    Alarm2Minutes = 0x0B,
    /// Alarm 2 hours register
    Alarm2Hours = 0x0C,
    /// Alarm 2 day/date register
    Alarm2DayDate = 0x0D,
    /// Control register
    Control = 0x0E,
    /// Control/Status register
    ControlStatus = 0x0F,
    /// Aging offset register
    AgingOffset = 0x10,
    /// Temperature MSB register
    MSBTemp = 0x11,
    /// Temperature LSB register
    LSBTemp = 0x12,
}

/// DS1307 control register (square-wave output).
pub const DS1307_CONTROL: u8 = 0x07;
/// First DS1307 RAM register.
pub const DS1307_RAM_START: u8 = 0x08;
/// First DS3232 SRAM register.
pub const DS3232_SRAM_START: u8 = 0x14;

/// EOSC bit of the DS3231/DS3232 control register.
pub const CONTROL_EOSC: u8 = 0b1000_0000;
/// CONV bit of the DS3231/DS3232 control register.
pub const CONTROL_CONV: u8 = 0b0010_0000;
/// INTCN bit of the DS3231/DS3232 control register.
pub const CONTROL_INTCN: u8 = 0b0000_0100;
/// EN32kHz bit of the DS3231/DS3232 status register.
pub const STATUS_EN32KHZ: u8 = 0b0000_1000;

/// Number of registers covered by the DS3231/DS3232 refresh burst.
pub const DS323X_BURST_LEN: usize = 19;
/// Number of timekeeping registers, the DS1307 refresh burst.
pub const TIME_BURST_LEN: usize = 7;

/// Time representation format of the hours registers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeRepresentation {
    /// 24-hour format (0-23)
    #[default]
    TwentyFourHour = 0,
    /// 12-hour format (1-12 + AM/PM)
    TwelveHour = 1,
}
impl From<u8> for TimeRepresentation {
    /// Creates a `TimeRepresentation` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => TimeRepresentation::TwentyFourHour,
            1 => TimeRepresentation::TwelveHour,
            _ => panic!("Invalid value for TimeRepresentation: {}", v),
        }
    }
}
impl From<TimeRepresentation> for u8 {
    fn from(v: TimeRepresentation) -> Self {
        v as u8
    }
}

/// EOSC: whether the oscillator keeps running on battery (DS3231/DS3232).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oscillator {
    /// Oscillator runs on VBAT
    Enabled = 0,
    /// Oscillator stops when switched to VBAT
    Disabled = 1,
}
impl From<u8> for Oscillator {
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => Oscillator::Enabled,
            1 => Oscillator::Disabled,
            _ => panic!("Invalid value for Oscillator: {}", v),
        }
    }
}
impl From<Oscillator> for u8 {
    fn from(v: Oscillator) -> Self {
        v as u8
    }
}

/// INTCN: function of the shared INT/SQW pin (DS3231/DS3232).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptControl {
    /// Output square wave on INT/SQW pin
    SquareWave = 0,
    /// Output alarm interrupts on INT/SQW pin
    Interrupt = 1,
}
impl From<u8> for InterruptControl {
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => InterruptControl::SquareWave,
            1 => InterruptControl::Interrupt,
            _ => panic!("Invalid value for InterruptControl: {}", v),
        }
    }
}
impl From<InterruptControl> for u8 {
    fn from(v: InterruptControl) -> Self {
        v as u8
    }
}

/// RS2/RS1 rate select of the DS3231/DS3232 square wave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquareWaveFrequency {
    /// 1 Hz square wave output
    Hz1 = 0b00,
    /// 1.024 kHz square wave output
    Hz1024 = 0b01,
    /// 4.096 kHz square wave output
    Hz4096 = 0b10,
    /// 8.192 kHz square wave output
    Hz8192 = 0b11,
}
impl From<u8> for SquareWaveFrequency {
    /// # Panics
    /// Panics if the value does not fit in two bits.
    fn from(v: u8) -> Self {
        match v {
            0b00 => SquareWaveFrequency::Hz1,
            0b01 => SquareWaveFrequency::Hz1024,
            0b10 => SquareWaveFrequency::Hz4096,
            0b11 => SquareWaveFrequency::Hz8192,
            _ => panic!("Invalid value for SquareWaveFrequency: {}", v),
        }
    }
}
impl From<SquareWaveFrequency> for u8 {
    fn from(v: SquareWaveFrequency) -> Self {
        v as u8
    }
}

/// Day/Date select for alarm registers (DY/DT bit).
///
/// This controls whether the alarm day/date register matches against
/// the day of the week or the date of the month.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DayDateSelect {
    /// Match against date of the month (1-31)
    #[default]
    Date = 0,
    /// Match against day of the week (1-7, where 1=Sunday)
    Day = 1,
}

impl From<u8> for DayDateSelect {
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => DayDateSelect::Date,
            1 => DayDateSelect::Day,
            _ => panic!("Invalid value for DayDateSelect: {}", v),
        }
    }
}

impl From<DayDateSelect> for u8 {
    fn from(v: DayDateSelect) -> Self {
        v as u8
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Seconds register. Bit 7 is CH (clock halt) on the DS1307 and unused on the DS323x.
    #[derive(Clone, Copy, Default, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Seconds(u8);
    impl Debug;
    /// Clock halt (DS1307 only)
    pub clock_halt, set_clock_halt: 7;
    /// Tens place of seconds (0-5)
    pub ten_seconds, set_ten_seconds: 6, 4;
    /// Ones place of seconds (0-9)
    pub seconds, set_seconds: 3, 0;
}
from_register_u8!(Seconds);

bitfield! {
    /// Hours register with format selection and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Hours(u8);
    impl Debug;
    /// Time representation format (12/24 hour)
    pub from into TimeRepresentation, time_representation, set_time_representation: 6, 6;
    /// PM flag (12-hour) or 20-hour bit (24-hour)
    pub pm_or_twenty_hours, set_pm_or_twenty_hours: 5, 5;
    /// Tens place of hours
    pub ten_hours, set_ten_hours: 4, 4;
    /// Ones place of hours
    pub hours, set_hours: 3, 0;
}
from_register_u8!(Hours);

bitfield! {
    /// Month register (1-12) with century flag and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Month(u8);
    impl Debug;
    /// Century flag
    pub century, set_century: 7;
    /// Tens place of month (0-1)
    pub ten_month, set_ten_month: 4, 4;
    /// Ones place of month (0-9)
    pub month, set_month: 3, 0;
}
from_register_u8!(Month);

bitfield! {
    /// DS3231/DS3232 control register.
    #[derive(Clone, Copy, Default, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Control(u8);
    impl Debug;
    /// Oscillator enable/disable on battery (EOSC)
    pub from into Oscillator, oscillator_enable, set_oscillator_enable: 7, 7;
    /// Enable square wave output on battery power (BBSQW)
    pub battery_backed_square_wave, set_battery_backed_square_wave: 6;
    /// Force temperature conversion (CONV)
    pub convert_temperature, set_convert_temperature: 5;
    /// Square wave output frequency selection (RS2, RS1)
    pub from into SquareWaveFrequency, square_wave_frequency, set_square_wave_frequency: 4, 3;
    /// INT/SQW pin function control (INTCN)
    pub from into InterruptControl, interrupt_control, set_interrupt_control: 2, 2;
    /// Enable alarm 2 interrupt (A2IE)
    pub alarm2_interrupt_enable, set_alarm2_interrupt_enable: 1;
    /// Enable alarm 1 interrupt (A1IE)
    pub alarm1_interrupt_enable, set_alarm1_interrupt_enable: 0;
}
from_register_u8!(Control);

bitfield! {
    /// DS3231/DS3232 status register.
    #[derive(Clone, Copy, Default, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Status(u8);
    impl Debug;
    /// Oscillator stop flag (OSF)
    pub oscillator_stop_flag, set_oscillator_stop_flag: 7;
    /// Enable 32kHz output (EN32kHz)
    pub enable_32khz_output, set_enable_32khz_output: 3;
    /// Device busy flag (BSY)
    pub busy, set_busy: 2;
    /// Alarm 2 triggered flag (A2F)
    pub alarm2_flag, set_alarm2_flag: 1;
    /// Alarm 1 triggered flag (A1F)
    pub alarm1_flag, set_alarm1_flag: 0;
}
from_register_u8!(Status);

bitfield! {
    /// DS1307 control register.
    #[derive(Clone, Copy, Default, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Ds1307Control(u8);
    impl Debug;
    /// Output level while the square wave is disabled (OUT)
    pub output_level, set_output_level: 7;
    /// Square wave enable (SQWE)
    pub square_wave_enable, set_square_wave_enable: 4;
    /// Rate select (RS1, RS0): 1Hz, 4.096kHz, 8.192kHz, 32.768kHz
    pub rate_select, set_rate_select: 1, 0;
}
from_register_u8!(Ds1307Control);

// Alarm register types with mask bits and special control bits

bitfield! {
    /// Alarm Seconds register with mask bit (only used by Alarm 1).
    #[derive(Clone, Copy, Default, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct AlarmSeconds(u8);
    impl Debug;
    /// Alarm mask bit 1 (A1M1)
    pub alarm_mask1, set_alarm_mask1: 7;
    /// BCD seconds (0-59)
    pub bcd_seconds, set_bcd_seconds: 6, 0;
}
from_register_u8!(AlarmSeconds);

bitfield! {
    /// Alarm Minutes register with mask bit (used by both Alarm 1 and Alarm 2).
    #[derive(Clone, Copy, Default, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct AlarmMinutes(u8);
    impl Debug;
    /// Alarm mask bit 2 (A1M2/A2M2)
    pub alarm_mask2, set_alarm_mask2: 7;
    /// BCD minutes (0-59)
    pub bcd_minutes, set_bcd_minutes: 6, 0;
}
from_register_u8!(AlarmMinutes);

bitfield! {
    /// Alarm Hours register with mask bit; bits 6-0 follow the [`Hours`] layout.
    #[derive(Clone, Copy, Default, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct AlarmHours(u8);
    impl Debug;
    /// Alarm mask bit 3 (A1M3/A2M3)
    pub alarm_mask3, set_alarm_mask3: 7;
    /// Hour byte without the mask bit
    pub hours, set_hours: 6, 0;
}
from_register_u8!(AlarmHours);

bitfield! {
    /// Alarm Day/Date register with mask bit and DY/DT control (used by both Alarm 1 and Alarm 2).
    #[derive(Clone, Copy, Default, PartialEq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct AlarmDayDate(u8);
    impl Debug;
    /// Alarm mask bit 4 (A1M4/A2M4)
    pub alarm_mask4, set_alarm_mask4: 7;
    /// Day/Date select (1=day of week, 0=date of month)
    pub from into DayDateSelect, day_date_select, set_day_date_select: 6, 6;
    /// BCD date (1-31) or day of week (1-7)
    pub bcd_day_date, set_bcd_day_date: 5, 0;
}
from_register_u8!(AlarmDayDate);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_date_select_conversions() {
        assert_eq!(DayDateSelect::from(0), DayDateSelect::Date);
        assert_eq!(DayDateSelect::from(1), DayDateSelect::Day);
        assert_eq!(u8::from(DayDateSelect::Date), 0);
        assert_eq!(u8::from(DayDateSelect::Day), 1);
    }

    #[test]
    #[should_panic(expected = "Invalid value for DayDateSelect: 2")]
    fn test_invalid_day_date_select_conversion() {
        let _ = DayDateSelect::from(2);
    }

    #[test]
    fn test_seconds_clock_halt() {
        let seconds = Seconds::from(0xD9); // CH set, 59 seconds
        assert!(seconds.clock_halt());
        assert_eq!(seconds.ten_seconds(), 5);
        assert_eq!(seconds.seconds(), 9);

        let mut seconds = Seconds::from(0x80 | 0x42);
        seconds.set_clock_halt(false);
        assert_eq!(u8::from(seconds), 0x42);
    }

    #[test]
    fn test_hours_register_conversions() {
        // 24-hour mode, 23h
        let hours = Hours::from(0x23);
        assert_eq!(
            hours.time_representation(),
            TimeRepresentation::TwentyFourHour
        );
        assert_eq!(hours.pm_or_twenty_hours(), 1);
        assert_eq!(hours.hours(), 3);

        // 12-hour mode, 12 PM
        let hours = Hours::from(0x72);
        assert_eq!(hours.time_representation(), TimeRepresentation::TwelveHour);
        assert_eq!(hours.pm_or_twenty_hours(), 1);
        assert_eq!(hours.ten_hours(), 1);
        assert_eq!(hours.hours(), 2);
    }

    #[test]
    fn test_month_register_century() {
        let month = Month::from(0x86);
        assert!(month.century());
        assert_eq!(month.ten_month(), 0);
        assert_eq!(month.month(), 6);

        let month = Month::from(0x12);
        assert!(!month.century());
        assert_eq!(month.ten_month(), 1);
        assert_eq!(month.month(), 2);
    }

    #[test]
    fn test_control_register_conversions() {
        let control = Control::from(0xFF);
        assert_eq!(control.oscillator_enable(), Oscillator::Disabled);
        assert!(control.battery_backed_square_wave());
        assert!(control.convert_temperature());
        assert_eq!(control.square_wave_frequency(), SquareWaveFrequency::Hz8192);
        assert_eq!(control.interrupt_control(), InterruptControl::Interrupt);
        assert!(control.alarm2_interrupt_enable());
        assert!(control.alarm1_interrupt_enable());

        // Power-on default of the DS3231: INTCN set, 8.192kHz rate bits.
        let control = Control::from(0x1C);
        assert_eq!(control.oscillator_enable(), Oscillator::Enabled);
        assert_eq!(control.square_wave_frequency(), SquareWaveFrequency::Hz8192);
        assert_eq!(control.interrupt_control(), InterruptControl::Interrupt);
        assert!(!control.alarm1_interrupt_enable());
    }

    #[test]
    fn test_status_register_conversions() {
        let status = Status::from(0x8B);
        assert!(status.oscillator_stop_flag());
        assert!(status.enable_32khz_output());
        assert!(!status.busy());
        assert!(status.alarm2_flag());
        assert!(status.alarm1_flag());

        let mut status = Status::from(0x8B);
        status.set_alarm1_flag(false);
        assert_eq!(u8::from(status), 0x8A);
    }

    #[test]
    fn test_ds1307_control_register() {
        let control = Ds1307Control::from(0x93);
        assert!(control.output_level());
        assert!(control.square_wave_enable());
        assert_eq!(control.rate_select(), 0b11);

        let control = Ds1307Control::from(0x00);
        assert!(!control.output_level());
        assert!(!control.square_wave_enable());
        assert_eq!(control.rate_select(), 0);
    }

    #[test]
    fn test_alarm_register_bitfield_operations() {
        let mut seconds = AlarmSeconds::from(0x35);
        assert!(!seconds.alarm_mask1());
        assert_eq!(seconds.bcd_seconds(), 0x35);
        seconds.set_alarm_mask1(true);
        assert_eq!(u8::from(seconds), 0xB5);

        let minutes = AlarmMinutes::from(0xD7);
        assert!(minutes.alarm_mask2());
        assert_eq!(minutes.bcd_minutes(), 0x57);

        let hours = AlarmHours::from(0xC8);
        assert!(hours.alarm_mask3());
        assert_eq!(
            Hours::from(hours.hours()).time_representation(),
            TimeRepresentation::TwelveHour
        );

        let day_date = AlarmDayDate::from(0xC3);
        assert!(day_date.alarm_mask4());
        assert_eq!(day_date.day_date_select(), DayDateSelect::Day);
        assert_eq!(day_date.bcd_day_date(), 3);

        let day_date = AlarmDayDate::from(0x29);
        assert!(!day_date.alarm_mask4());
        assert_eq!(day_date.day_date_select(), DayDateSelect::Date);
        assert_eq!(day_date.bcd_day_date(), 0x29);
    }

    #[test]
    fn test_register_roundtrip_conversions() {
        for value in [0x00, 0x55, 0xAA, 0xFF, 0x12, 0x9A] {
            assert_eq!(u8::from(Seconds::from(value)), value);
            assert_eq!(u8::from(Hours::from(value)), value);
            assert_eq!(u8::from(Month::from(value)), value);
            assert_eq!(u8::from(Control::from(value)), value);
            assert_eq!(u8::from(Status::from(value)), value);
            assert_eq!(u8::from(Ds1307Control::from(value)), value);
            assert_eq!(u8::from(AlarmDayDate::from(value)), value);
        }
    }

    #[test]
    fn test_single_bit_constants_match_bitfields() {
        let mut control = Control::default();
        control.set_oscillator_enable(Oscillator::Disabled);
        assert_eq!(u8::from(control), CONTROL_EOSC);

        let mut control = Control::default();
        control.set_convert_temperature(true);
        assert_eq!(u8::from(control), CONTROL_CONV);

        let mut control = Control::default();
        control.set_interrupt_control(InterruptControl::Interrupt);
        assert_eq!(u8::from(control), CONTROL_INTCN);

        let mut status = Status::default();
        status.set_enable_32khz_output(true);
        assert_eq!(u8::from(status), STATUS_EN32KHZ);
    }

    #[test]
    #[should_panic(expected = "Invalid value for SquareWaveFrequency: 4")]
    fn test_invalid_square_wave_frequency_conversion() {
        let _ = SquareWaveFrequency::from(4);
    }
}
