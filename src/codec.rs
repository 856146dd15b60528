//! Pure register encode/decode helpers.
//!
//! Nothing here touches the bus. Out-of-range inputs give meaningless (but
//! non-panicking) results; callers are expected to stay within the ranges
//! documented on each function.

use crate::alarm::{Alarm1Mode, Alarm2Mode};
use crate::model::{ControlLayout, SquareWaveMode};
use crate::registers::{Control, Ds1307Control, InterruptControl, SquareWaveFrequency};

/// Alarm pattern bit for mask M1 (seconds, Alarm 1 only).
pub const ALARM_M1: u8 = 0b0_0001;
/// Alarm pattern bit for mask M2 (minutes).
pub const ALARM_M2: u8 = 0b0_0010;
/// Alarm pattern bit for mask M3 (hours).
pub const ALARM_M3: u8 = 0b0_0100;
/// Alarm pattern bit for mask M4 (day/date).
pub const ALARM_M4: u8 = 0b0_1000;
/// Alarm pattern bit for DY/DT (match day of week instead of date).
pub const ALARM_DY_DT: u8 = 0b1_0000;

/// Temperature reported by models without a sensor.
pub const TEMPERATURE_UNSUPPORTED: i16 = 9999;

/// Converts a decimal value (0-99) to packed BCD.
#[must_use]
pub const fn dec_to_bcd(value: u8) -> u8 {
    (value / 10).wrapping_mul(16).wrapping_add(value % 10)
}

/// Converts a packed BCD byte to decimal.
#[must_use]
pub const fn bcd_to_dec(value: u8) -> u8 {
    (value / 16) * 10 + value % 16
}

/// Whether both nibbles of `value` are decimal digits.
#[must_use]
pub const fn is_bcd(value: u8) -> bool {
    value & 0x0F <= 9 && value >> 4 <= 9
}

/// Decodes the temperature registers into hundredths of a degree Celsius.
///
/// The MSB holds the integer part and bits 7-6 of the LSB the quarter
/// degrees. Negative readings keep the integer part complemented, so they are
/// rebuilt from the inverted magnitude and corrected by one quarter.
#[must_use]
pub fn decode_temperature(msb: u8, lsb: u8) -> i16 {
    let fraction = i16::from(lsb >> 6);
    let quarters = if msb & 0x80 == 0 {
        (i16::from(msb) << 2) | fraction
    } else {
        -(((i16::from(!msb) << 2) | fraction) + 1)
    };
    quarters * 25
}

/// Decodes the aging offset register.
///
/// Negative offsets are stored one below their two's complement value.
#[must_use]
pub fn decode_aging(raw: u8) -> i8 {
    if raw & 0x80 == 0 {
        raw as i8
    } else {
        raw.wrapping_add(1) as i8
    }
}

/// Encodes an aging offset for the aging register.
///
/// The register holds -127..=127, so `-128` is clamped to `-127`.
#[must_use]
pub fn encode_aging(value: i8) -> u8 {
    if value < 0 {
        (value.max(-127) as u8).wrapping_sub(1)
    } else {
        value as u8
    }
}

/// Packs an Alarm 1 mode into its `DY/DT M4 M3 M2 M1` pattern.
#[must_use]
pub fn pack_alarm1_mode(mode: Alarm1Mode) -> u8 {
    match mode {
        Alarm1Mode::EverySecond => ALARM_M4 | ALARM_M3 | ALARM_M2 | ALARM_M1,
        Alarm1Mode::FixedSecond => ALARM_M4 | ALARM_M3 | ALARM_M2,
        Alarm1Mode::FixedMinuteSecond => ALARM_M4 | ALARM_M3,
        Alarm1Mode::FixedHourMinuteSecond => ALARM_M4,
        Alarm1Mode::FixedDateHourMinuteSecond => 0,
        Alarm1Mode::FixedWeekdayHourMinuteSecond => ALARM_DY_DT,
    }
}

/// Unpacks an Alarm 1 pattern, `None` for mask combinations the chip does not define.
#[must_use]
pub fn unpack_alarm1_mode(pattern: u8) -> Option<Alarm1Mode> {
    match normalize_pattern(pattern) {
        0b0_1111 => Some(Alarm1Mode::EverySecond),
        0b0_1110 => Some(Alarm1Mode::FixedSecond),
        0b0_1100 => Some(Alarm1Mode::FixedMinuteSecond),
        0b0_1000 => Some(Alarm1Mode::FixedHourMinuteSecond),
        0b0_0000 => Some(Alarm1Mode::FixedDateHourMinuteSecond),
        0b1_0000 => Some(Alarm1Mode::FixedWeekdayHourMinuteSecond),
        _ => None,
    }
}

/// Packs an Alarm 2 mode into its `DY/DT M4 M3 M2` pattern (bit 0 unused).
#[must_use]
pub fn pack_alarm2_mode(mode: Alarm2Mode) -> u8 {
    match mode {
        Alarm2Mode::EveryMinute => ALARM_M4 | ALARM_M3 | ALARM_M2,
        Alarm2Mode::FixedMinute => ALARM_M4 | ALARM_M3,
        Alarm2Mode::FixedHourMinute => ALARM_M4,
        Alarm2Mode::FixedDateHourMinute => 0,
        Alarm2Mode::FixedWeekdayHourMinute => ALARM_DY_DT,
    }
}

/// Unpacks an Alarm 2 pattern, `None` for mask combinations the chip does not define.
#[must_use]
pub fn unpack_alarm2_mode(pattern: u8) -> Option<Alarm2Mode> {
    match normalize_pattern(pattern & !ALARM_M1) {
        0b0_1110 => Some(Alarm2Mode::EveryMinute),
        0b0_1100 => Some(Alarm2Mode::FixedMinute),
        0b0_1000 => Some(Alarm2Mode::FixedHourMinute),
        0b0_0000 => Some(Alarm2Mode::FixedDateHourMinute),
        0b1_0000 => Some(Alarm2Mode::FixedWeekdayHourMinute),
        _ => None,
    }
}

// DY/DT is only meaningful while the day/date register takes part in the match.
fn normalize_pattern(pattern: u8) -> u8 {
    let pattern = pattern & 0b1_1111;
    if pattern & ALARM_M4 != 0 {
        pattern & !ALARM_DY_DT
    } else {
        pattern
    }
}

/// Returns the `(and, or)` masks that put the control register in `mode`,
/// or `None` if the layout cannot produce it.
#[must_use]
pub fn sqwg_masks(layout: ControlLayout, mode: SquareWaveMode) -> Option<(u8, u8)> {
    match layout {
        ControlLayout::Ds1307 => {
            let mut keep = Ds1307Control::from(0xFF);
            keep.set_output_level(false);
            keep.set_square_wave_enable(false);
            keep.set_rate_select(0);

            let mut set = Ds1307Control::default();
            match mode {
                SquareWaveMode::OffLow => {}
                SquareWaveMode::OffHigh => set.set_output_level(true),
                SquareWaveMode::Hz1 => set.set_square_wave_enable(true),
                SquareWaveMode::Hz4096 => {
                    set.set_square_wave_enable(true);
                    set.set_rate_select(0b01);
                }
                SquareWaveMode::Hz8192 => {
                    set.set_square_wave_enable(true);
                    set.set_rate_select(0b10);
                }
                SquareWaveMode::Hz32768 => {
                    set.set_square_wave_enable(true);
                    set.set_rate_select(0b11);
                }
                SquareWaveMode::Hz1024 => return None,
            }
            Some((keep.into(), set.into()))
        }
        ControlLayout::Ds323x => {
            let mut keep = Control::from(0xFF);
            keep.set_square_wave_frequency(SquareWaveFrequency::Hz1);
            keep.set_interrupt_control(InterruptControl::SquareWave);

            let mut set = Control::default();
            match mode {
                SquareWaveMode::OffHigh => set.set_interrupt_control(InterruptControl::Interrupt),
                SquareWaveMode::Hz1 => set.set_square_wave_frequency(SquareWaveFrequency::Hz1),
                SquareWaveMode::Hz1024 => {
                    set.set_square_wave_frequency(SquareWaveFrequency::Hz1024);
                }
                SquareWaveMode::Hz4096 => {
                    set.set_square_wave_frequency(SquareWaveFrequency::Hz4096);
                }
                SquareWaveMode::Hz8192 => {
                    set.set_square_wave_frequency(SquareWaveFrequency::Hz8192);
                }
                SquareWaveMode::OffLow | SquareWaveMode::Hz32768 => return None,
            }
            Some((keep.into(), set.into()))
        }
    }
}

/// Decodes the square-wave mode from a raw control register.
#[must_use]
pub fn decode_sqwg(layout: ControlLayout, control: u8) -> SquareWaveMode {
    match layout {
        ControlLayout::Ds1307 => {
            let control = Ds1307Control::from(control);
            if !control.square_wave_enable() {
                if control.output_level() {
                    SquareWaveMode::OffHigh
                } else {
                    SquareWaveMode::OffLow
                }
            } else {
                match control.rate_select() {
                    0b00 => SquareWaveMode::Hz1,
                    0b01 => SquareWaveMode::Hz4096,
                    0b10 => SquareWaveMode::Hz8192,
                    _ => SquareWaveMode::Hz32768,
                }
            }
        }
        ControlLayout::Ds323x => {
            let control = Control::from(control);
            match (control.interrupt_control(), control.square_wave_frequency()) {
                (InterruptControl::Interrupt, _) => SquareWaveMode::OffHigh,
                (InterruptControl::SquareWave, SquareWaveFrequency::Hz1) => SquareWaveMode::Hz1,
                (InterruptControl::SquareWave, SquareWaveFrequency::Hz1024) => {
                    SquareWaveMode::Hz1024
                }
                (InterruptControl::SquareWave, SquareWaveFrequency::Hz4096) => {
                    SquareWaveMode::Hz4096
                }
                (InterruptControl::SquareWave, SquareWaveFrequency::Hz8192) => {
                    SquareWaveMode::Hz8192
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcd_round_trip() {
        for v in 0..=99u8 {
            assert_eq!(bcd_to_dec(dec_to_bcd(v)), v);
            assert!(is_bcd(dec_to_bcd(v)));
        }
        assert_eq!(dec_to_bcd(59), 0x59);
        assert_eq!(bcd_to_dec(0x31), 31);
    }

    #[test]
    fn test_dec_to_bcd_out_of_range_does_not_panic() {
        let _ = dec_to_bcd(255);
        assert!(!is_bcd(0x7F));
        assert!(!is_bcd(0xA0));
    }

    #[test]
    fn test_decode_temperature() {
        assert_eq!(decode_temperature(0x19, 0b0100_0000), 2525);
        assert_eq!(decode_temperature(0xFF, 0x00), -25);
        assert_eq!(decode_temperature(0x00, 0x00), 0);
        assert_eq!(decode_temperature(0x19, 0xC0), 2575);
        // Only the top two LSB bits carry data.
        assert_eq!(decode_temperature(0x19, 0x3F), 2500);
    }

    #[test]
    fn test_decode_temperature_negative_magnitude() {
        // 0xFE keeps a complemented magnitude of one degree.
        assert_eq!(decode_temperature(0xFE, 0x00), -125);
        assert_eq!(decode_temperature(0xFF, 0x40), -50);
    }

    #[test]
    fn test_aging_round_trip() {
        for v in -127..=127i8 {
            assert_eq!(decode_aging(encode_aging(v)), v);
        }
    }

    #[test]
    fn test_aging_encoding() {
        assert_eq!(encode_aging(5), 0x05);
        assert_eq!(encode_aging(-1), 0xFE);
        assert_eq!(decode_aging(0xFF), 0);
        assert_eq!(decode_aging(0x7F), 127);
        assert_eq!(decode_aging(0x80), -127);
        // Below the register's range: keeps the sign
        assert_eq!(encode_aging(-128), 0x80);
        assert_eq!(decode_aging(encode_aging(-128)), -127);
    }

    #[test]
    fn test_alarm1_mode_round_trip() {
        for mode in [
            Alarm1Mode::EverySecond,
            Alarm1Mode::FixedSecond,
            Alarm1Mode::FixedMinuteSecond,
            Alarm1Mode::FixedHourMinuteSecond,
            Alarm1Mode::FixedDateHourMinuteSecond,
            Alarm1Mode::FixedWeekdayHourMinuteSecond,
        ] {
            assert_eq!(unpack_alarm1_mode(pack_alarm1_mode(mode)), Some(mode));
        }
    }

    #[test]
    fn test_alarm1_patterns_match_datasheet() {
        assert_eq!(pack_alarm1_mode(Alarm1Mode::EverySecond), 0b0_1111);
        assert_eq!(pack_alarm1_mode(Alarm1Mode::FixedSecond), 0b0_1110);
        assert_eq!(pack_alarm1_mode(Alarm1Mode::FixedMinuteSecond), 0b0_1100);
        assert_eq!(pack_alarm1_mode(Alarm1Mode::FixedHourMinuteSecond), 0b0_1000);
        assert_eq!(pack_alarm1_mode(Alarm1Mode::FixedDateHourMinuteSecond), 0b0_0000);
        assert_eq!(
            pack_alarm1_mode(Alarm1Mode::FixedWeekdayHourMinuteSecond),
            0b1_0000
        );
    }

    #[test]
    fn test_alarm2_mode_round_trip() {
        for mode in [
            Alarm2Mode::EveryMinute,
            Alarm2Mode::FixedMinute,
            Alarm2Mode::FixedHourMinute,
            Alarm2Mode::FixedDateHourMinute,
            Alarm2Mode::FixedWeekdayHourMinute,
        ] {
            assert_eq!(unpack_alarm2_mode(pack_alarm2_mode(mode)), Some(mode));
        }
    }

    #[test]
    fn test_unpack_ignores_dy_dt_when_day_is_masked() {
        assert_eq!(unpack_alarm1_mode(0b1_1111), Some(Alarm1Mode::EverySecond));
        assert_eq!(unpack_alarm2_mode(0b1_1110), Some(Alarm2Mode::EveryMinute));
        // Alarm 2 has no M1 bit.
        assert_eq!(unpack_alarm2_mode(0b0_1111), Some(Alarm2Mode::EveryMinute));
    }

    #[test]
    fn test_unpack_rejects_illegal_masks() {
        // Seconds must match while minutes are ignored.
        assert_eq!(unpack_alarm1_mode(0b0_0001), None);
        assert_eq!(unpack_alarm1_mode(0b0_1010), None);
        assert_eq!(unpack_alarm2_mode(0b0_0110), None);
    }

    #[test]
    fn test_ds323x_sqwg_masks() {
        let (and, or) = sqwg_masks(ControlLayout::Ds323x, SquareWaveMode::Hz4096).unwrap();
        assert_eq!(and, 0b1110_0011);
        assert_eq!(or, 0b0001_0000);
        // INTCN set, rate bits cleared
        assert_eq!(
            sqwg_masks(ControlLayout::Ds323x, SquareWaveMode::OffHigh),
            Some((0b1110_0011, 0b0000_0100))
        );
        assert_eq!(sqwg_masks(ControlLayout::Ds323x, SquareWaveMode::Hz32768), None);
        assert_eq!(sqwg_masks(ControlLayout::Ds323x, SquareWaveMode::OffLow), None);
    }

    #[test]
    fn test_ds1307_sqwg_masks() {
        assert_eq!(
            sqwg_masks(ControlLayout::Ds1307, SquareWaveMode::Hz32768),
            Some((0b0110_1100, 0b0001_0011))
        );
        assert_eq!(
            sqwg_masks(ControlLayout::Ds1307, SquareWaveMode::OffHigh),
            Some((0b0110_1100, 0b1000_0000))
        );
        assert_eq!(sqwg_masks(ControlLayout::Ds1307, SquareWaveMode::Hz1024), None);
    }

    #[test]
    fn test_sqwg_masks_decode_back() {
        for layout in [ControlLayout::Ds1307, ControlLayout::Ds323x] {
            for mode in [
                SquareWaveMode::OffLow,
                SquareWaveMode::OffHigh,
                SquareWaveMode::Hz1,
                SquareWaveMode::Hz1024,
                SquareWaveMode::Hz4096,
                SquareWaveMode::Hz8192,
                SquareWaveMode::Hz32768,
            ] {
                if let Some((and, or)) = sqwg_masks(layout, mode) {
                    assert_eq!(decode_sqwg(layout, (0x5A & and) | or), mode);
                }
            }
        }
    }
}
