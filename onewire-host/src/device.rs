use crate::{
    Capabilities, Catalog, Fault, MemoryBankInfo, OneWireError, OneWireResult, Port, Serial,
    StandardCatalog, Transport,
};
use core::fmt;

/// A device on a 1-Wire bus, identified by its port and serial number.
///
/// Devices are plain values: they borrow their [`Port`] and never close it.
/// The family code (first serial byte) determines the memory bank layout and
/// whether the clock operations are available; see [`Device::capabilities`].
pub struct Device<'p, T: Transport, C: Catalog = StandardCatalog> {
    port: &'p Port<T, C>,
    serial: Serial,
    caps: Capabilities,
}

impl<'p, T: Transport, C: Catalog> Device<'p, T, C> {
    /// Binds a known serial number to `port`.
    pub fn new(port: &'p Port<T, C>, serial: impl Into<Serial>) -> Self {
        let serial = serial.into();
        Self {
            port,
            serial,
            caps: Capabilities::of(port.catalog(), serial.family()),
        }
    }

    /// The port this device is reached through.
    pub fn port(&self) -> &'p Port<T, C> {
        self.port
    }

    /// Serial number of the device.
    pub fn serial(&self) -> Serial {
        self.serial
    }

    /// Family code of the device.
    pub fn family(&self) -> u8 {
        self.serial.family()
    }

    /// Features of this device's family.
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Short family name, e.g. `DS1994`.
    pub fn name(&self) -> &'p str {
        self.port.catalog().name(self.family())
    }

    /// Human readable description of the family.
    pub fn describe(&self) -> &'p str {
        self.port.catalog().description(self.family())
    }

    /// Descriptions of all memory banks, in bank order. Empty if the device has no memory.
    pub fn banks(&self) -> Vec<&'p str> {
        let catalog = self.port.catalog();
        (0..self.caps.banks)
            .filter_map(|i| catalog.bank(self.family(), i))
            .map(|bank| bank.description)
            .collect()
    }

    /// Layout of memory bank `bank`.
    ///
    /// # Errors
    /// [`OneWireError::InvalidArgument`] if the family has no such bank.
    pub fn bank_info(&self, bank: usize) -> OneWireResult<MemoryBankInfo> {
        self.port
            .catalog()
            .bank(self.family(), bank)
            .ok_or_else(|| {
                OneWireError::invalid(format!(
                    "{} has {} memory bank(s), no bank {}",
                    self.name(),
                    self.caps.banks,
                    bank
                ))
            })
    }

    /// Number of pages in memory bank `bank`.
    pub fn bank_pages(&self, bank: usize) -> OneWireResult<usize> {
        self.bank_info(bank).map(|info| info.page_count)
    }

    pub(crate) fn transact<R>(
        &self,
        f: impl FnOnce(&mut T, &Serial) -> Result<R, Fault>,
    ) -> OneWireResult<R> {
        let serial = self.serial;
        self.port.with_link(|link| f(link, &serial))
    }
}

impl<T: Transport, C: Catalog> Clone for Device<'_, T, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Transport, C: Catalog> Copy for Device<'_, T, C> {}

impl<T: Transport, C: Catalog> PartialEq for Device<'_, T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.serial == other.serial
    }
}

impl<T: Transport, C: Catalog> Eq for Device<'_, T, C> {}

impl<T: Transport, C: Catalog> fmt::Debug for Device<'_, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("port", &self.port.path())
            .field("serial", &self.serial)
            .field("capabilities", &self.caps)
            .finish()
    }
}

impl<T: Transport, C: Catalog> fmt::Display for Device<'_, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name(), self.serial)
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::sim::SimAdapter;

    #[test]
    fn test_metadata_needs_no_bus() {
        let adapter = SimAdapter::new();
        let mut port = Port::open(&adapter, "sim").unwrap();
        port.close();
        adapter.clear_calls();

        let dev = Device::new(&port, [0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x02]);
        assert_eq!(dev.name(), "DS1994");
        assert!(!dev.describe().is_empty());
        assert_eq!(
            dev.banks(),
            vec!["Scratchpad", "Main Memory", "Clock/alarm registers"]
        );
        assert_eq!(dev.bank_pages(1).unwrap(), 16);
        assert!(adapter.calls().is_empty());
    }

    #[test]
    fn test_bank_out_of_range() {
        let adapter = SimAdapter::new();
        let port = Port::open(&adapter, "sim").unwrap();
        let dev = Device::new(&port, [0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x02]);
        assert!(matches!(
            dev.bank_pages(3),
            Err(OneWireError::InvalidArgument(_))
        ));

        let button = Device::new(&port, [0x01, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x02]);
        assert!(button.banks().is_empty());
        assert!(button.bank_pages(0).is_err());
    }

    #[test]
    fn test_equality_by_serial() {
        let adapter = SimAdapter::new();
        let port = Port::open(&adapter, "sim").unwrap();
        let a = Device::new(&port, 0x0266554433221104u64);
        let b = Device::new(&port, [0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x02]);
        assert_eq!(a, b);
        assert_eq!(a.family(), 0x04);
        assert!(a.capabilities().clock);
    }
}
