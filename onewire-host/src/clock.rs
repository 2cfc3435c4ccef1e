//! Real-time clock of DS1994 and DS1904 class devices.

use crate::{Catalog, Device, Feature, OneWireError, OneWireResult, ReadMode, Transport};

/// Family codes of devices with a real-time clock (DS1994/DS2404 and DS1904).
pub const CLOCK_FAMILIES: [u8; 2] = [0x04, 0x24];

/// Non-volatile bank type holding the clock registers.
pub const CLOCK_BANK: u8 = 2;

/// Offset of the seconds counter within [`CLOCK_BANK`].
pub const CLOCK_OFFSET: usize = 0x03;

/// Whether devices of `family` have a real-time clock.
#[inline]
pub fn has_clock(family: u8) -> bool {
    CLOCK_FAMILIES.contains(&family)
}

/// The 32-bit seconds counter, stored least significant byte first.
///
/// The epoch is up to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockRegister(pub u32);

impl ClockRegister {
    /// Register width in bytes.
    pub const LEN: usize = 4;

    /// Bytes as stored on the device.
    pub fn encode(self) -> [u8; Self::LEN] {
        self.0.to_le_bytes()
    }

    /// Seconds counter from the bytes stored on the device.
    pub fn decode(bytes: [u8; Self::LEN]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }

    /// Counter value in seconds.
    pub fn seconds(self) -> u32 {
        self.0
    }
}

impl From<u32> for ClockRegister {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl<T: Transport, C: Catalog> Device<'_, T, C> {
    fn require_clock(&self) -> OneWireResult<()> {
        if self.capabilities().clock {
            Ok(())
        } else {
            Err(OneWireError::UnsupportedFeature {
                family: self.family(),
                feature: Feature::Clock,
            })
        }
    }

    /// Sets the clock to `time` seconds and starts the oscillator.
    ///
    /// # Errors
    /// * [`OneWireError::UnsupportedFeature`] - the device has no clock; nothing is sent.
    /// * [`OneWireError::Io`] - writing the counter or starting the oscillator failed.
    pub fn set_rtc(&self, time: u32) -> OneWireResult<()> {
        self.require_clock()?;
        let bytes = ClockRegister(time).encode();
        log::debug!("{}: set clock to {}", self.serial(), time);
        self.transact(|link, serial| {
            link.write_nv(CLOCK_BANK, serial, CLOCK_OFFSET, &bytes)?;
            link.set_oscillator(serial, true)
        })
    }

    /// Reads the clock in seconds, using the read mode configured on the port.
    ///
    /// # Errors
    /// * [`OneWireError::UnsupportedFeature`] - the device has no clock; nothing is sent.
    /// * [`OneWireError::Io`] - the read failed.
    pub fn get_rtc(&self) -> OneWireResult<u32> {
        self.get_rtc_with(self.port().clock_read())
    }

    /// Reads the clock in seconds with an explicit [`ReadMode`].
    pub fn get_rtc_with(&self, mode: ReadMode) -> OneWireResult<u32> {
        self.require_clock()?;
        let mut bytes = [0u8; ClockRegister::LEN];
        self.transact(|link, serial| {
            link.read_nv(CLOCK_BANK, serial, CLOCK_OFFSET, mode, &mut bytes)
        })?;
        Ok(ClockRegister::decode(bytes).seconds())
    }

    /// Stops the clock oscillator. The counter keeps its value.
    ///
    /// # Errors
    /// * [`OneWireError::UnsupportedFeature`] - the device has no clock; nothing is sent.
    /// * [`OneWireError::Io`] - the transaction failed.
    pub fn stop_rtc(&self) -> OneWireResult<()> {
        self.require_clock()?;
        log::debug!("{}: stop clock", self.serial());
        self.transact(|link, serial| link.set_oscillator(serial, false))
    }
}
