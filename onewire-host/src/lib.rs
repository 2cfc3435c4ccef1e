#![deny(missing_docs)]
//! # onewire-host
//! Host-side access to Dallas/Maxim 1-Wire devices.
//!
//! A [Port] owns an open adapter link (anything implementing [Transport], acquired
//! through an [Acquire] implementation) and enumerates the devices on its bus.
//! Each [Device] is a `(port, serial)` pair whose family code selects the memory
//! bank layout from a [Catalog] and decides whether clock operations are available.
//!
//! Page reads are dispatched on the capabilities of the memory bank (see
//! [ReadStrategy]), and the real-time clock of DS1994/DS1904 class devices is
//! read and written through [ClockRegister].
//!
//! All operations are blocking and synchronous. Operations that reach the bus
//! through the same [Port] must not overlap; a re-entrant call fails with
//! [OneWireError::BusInUse].
//!
//! With the `sim` feature (enabled by default) the [sim] module provides an
//! in-memory adapter for testing without hardware.

mod catalog;
mod clock;
mod crc;
mod device;
mod error;
mod memory;
mod port;
mod serial;
#[cfg(feature = "sim")]
pub mod sim;
mod transport;

pub use catalog::{Capabilities, Catalog, FAMILIES, FamilyInfo, MemoryBankInfo, StandardCatalog};
pub use clock::{CLOCK_BANK, CLOCK_FAMILIES, CLOCK_OFFSET, ClockRegister, has_clock};
pub use crc::{crc8, crc16};
pub use device::Device;
pub use error::{Fault, Feature, OneWireError};
pub use memory::{PageData, ReadStrategy};
pub use port::{Port, PortBuilder};
pub use serial::Serial;
pub use transport::{Acquire, ReadMode, SearchKind, Transport};

/// Result of host-side 1-Wire operations.
pub type OneWireResult<T> = Result<T, OneWireError>;
