//! Chip models and their register-map descriptors.
//!
//! Every model-dependent decision in the driver goes through the
//! [`RegisterMap`] returned by [`Model::register_map`]: how much to read on a
//! refresh, where the control and status bits live, which RAM window is
//! addressable and which square-wave modes the chip can produce.

use crate::registers::{
    RegAddr, DS1307_CONTROL, DS1307_RAM_START, DS3232_SRAM_START, DS323X_BURST_LEN,
    TIME_BURST_LEN,
};

/// Supported RTC chips.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Model {
    /// DS1307: timekeeping, square wave and 56 bytes of RAM.
    Ds1307,
    /// DS3231: adds alarms, aging trim, temperature sensor and a 32kHz pin.
    Ds3231,
    /// DS3232: a DS3231 with 236 bytes of SRAM.
    Ds3232,
}

impl Model {
    /// Returns the register-map descriptor for this model.
    #[must_use]
    pub const fn register_map(self) -> &'static RegisterMap {
        match self {
            Model::Ds1307 => &DS1307_MAP,
            Model::Ds3231 => &DS3231_MAP,
            Model::Ds3232 => &DS3232_MAP,
        }
    }
}

/// Square-wave generator output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquareWaveMode {
    /// Output disabled, pin held low (DS1307 only)
    #[default]
    OffLow,
    /// Output disabled, pin high
    OffHigh,
    /// 1 Hz
    Hz1,
    /// 1.024 kHz (DS3231/DS3232 only)
    Hz1024,
    /// 4.096 kHz
    Hz4096,
    /// 8.192 kHz
    Hz8192,
    /// 32.768 kHz (DS1307 only)
    Hz32768,
}

impl SquareWaveMode {
    /// Whether the generator is actually producing a frequency.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, SquareWaveMode::OffLow | SquareWaveMode::OffHigh)
    }
}

/// Layout of the control register that drives the square-wave pin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlLayout {
    /// OUT / SQWE / RS1:RS0 at 0x07
    Ds1307,
    /// EOSC / BBSQW / CONV / RS2:RS1 / INTCN / A2IE / A1IE at 0x0E
    Ds323x,
}

/// A battery-backed RAM window: user addresses `0..len` map to `base..`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RamWindow {
    /// First register of the window
    pub base: u8,
    /// Number of addressable bytes
    pub len: u8,
}

impl RamWindow {
    /// Translates a user address into a register address, if it is inside the window.
    #[must_use]
    pub fn register(&self, address: u8) -> Option<u8> {
        (address < self.len).then(|| self.base + address)
    }
}

/// Register-map descriptor of one chip model.
#[derive(Debug, PartialEq, Eq)]
pub struct RegisterMap {
    /// Bytes read from register 0 by a refresh
    pub burst_len: usize,
    /// Control register address
    pub control: u8,
    /// Control register layout
    pub layout: ControlLayout,
    /// Status register address, if any
    pub status: Option<u8>,
    /// Register and bit mask of the lost-power flag (CH or OSF)
    pub lost_power: (u8, u8),
    /// Battery-backed RAM, if any
    pub ram: Option<RamWindow>,
    /// Alarm 1 and 2 registers present
    pub alarms: bool,
    /// Temperature registers present
    pub temperature: bool,
    /// Aging offset register present
    pub aging: bool,
    /// Dedicated 32kHz output pin present
    pub pin_32k: bool,
    /// EOSC battery switch-over bit present
    pub oscillator_switch: bool,
    /// Legal square-wave modes
    pub sqwg_modes: &'static [SquareWaveMode],
}

impl RegisterMap {
    /// Whether `mode` can be produced by this chip.
    #[must_use]
    pub fn supports_sqwg(&self, mode: SquareWaveMode) -> bool {
        self.sqwg_modes.contains(&mode)
    }
}

const DS1307_MAP: RegisterMap = RegisterMap {
    burst_len: TIME_BURST_LEN,
    control: DS1307_CONTROL,
    layout: ControlLayout::Ds1307,
    status: None,
    lost_power: (RegAddr::Seconds as u8, 0b1000_0000),
    ram: Some(RamWindow {
        base: DS1307_RAM_START,
        len: 56,
    }),
    alarms: false,
    temperature: false,
    aging: false,
    pin_32k: false,
    oscillator_switch: false,
    sqwg_modes: &[
        SquareWaveMode::OffLow,
        SquareWaveMode::OffHigh,
        SquareWaveMode::Hz1,
        SquareWaveMode::Hz4096,
        SquareWaveMode::Hz8192,
        SquareWaveMode::Hz32768,
    ],
};

const DS323X_SQWG_MODES: &[SquareWaveMode] = &[
    SquareWaveMode::OffHigh,
    SquareWaveMode::Hz1,
    SquareWaveMode::Hz1024,
    SquareWaveMode::Hz4096,
    SquareWaveMode::Hz8192,
];

const DS3231_MAP: RegisterMap = RegisterMap {
    burst_len: DS323X_BURST_LEN,
    control: RegAddr::Control as u8,
    layout: ControlLayout::Ds323x,
    status: Some(RegAddr::ControlStatus as u8),
    lost_power: (RegAddr::ControlStatus as u8, 0b1000_0000),
    ram: None,
    alarms: true,
    temperature: true,
    aging: true,
    pin_32k: true,
    oscillator_switch: true,
    sqwg_modes: DS323X_SQWG_MODES,
};

const DS3232_MAP: RegisterMap = RegisterMap {
    ram: Some(RamWindow {
        base: DS3232_SRAM_START,
        len: 236,
    }),
    ..DS3231_MAP
};
