//! In-memory 1-Wire adapter for testing without hardware.
//!
//! [`SimAdapter`] hands out [`SimLink`] transports for any path starting with
//! `sim`. Devices are attached to the simulated bus with memory banks laid out
//! from the standard catalog (or any bank list), and every transport primitive
//! is recorded as a [`SimCall`] for inspection.
//!
//! The simulation keeps a CRC-16 per page, updated on every write; CRC-checked
//! reads fail after [`SimAdapter::corrupt_page`]. Every write increments the
//! written pages' counters, which are returned as extra information.

mod device;

pub use device::{CONTROL_OFFSET, ClockControl};

use crate::{
    Acquire, Fault, MemoryBankInfo, ReadMode, SearchKind, Serial, StandardCatalog, Transport,
};
use core::cell::RefCell;
use device::SimDevice;
use std::rc::Rc;

/// No adapter with the requested path.
pub const ADAPTER_NOT_FOUND: i32 = 1;
/// The adapter is already acquired.
pub const ADAPTER_BUSY: i32 = 2;
/// No device with the requested serial number on the bus.
pub const NO_DEVICE: i32 = 3;
/// Bank, page or address out of range.
pub const OUT_OF_RANGE: i32 = 4;
/// CRC check failed.
pub const CRC_MISMATCH: i32 = 5;
/// The device does not support the operation.
pub const UNSUPPORTED: i32 = 6;
/// [`Transport::serial`] called without a current search hit.
pub const NO_SEARCH: i32 = 7;

/// A transport primitive invocation recorded by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    /// [`Transport::search_first`]
    SearchFirst {
        /// Search type.
        kind: SearchKind,
        /// Family restriction.
        family: Option<u8>,
    },
    /// [`Transport::search_next`]
    SearchNext {
        /// Search type.
        kind: SearchKind,
        /// Family restriction.
        family: Option<u8>,
    },
    /// [`Transport::serial`]
    ReadSerial,
    /// [`Transport::read_page`]
    ReadPage {
        /// Target device.
        serial: Serial,
        /// Memory bank.
        bank: usize,
        /// Page within the bank.
        page: usize,
    },
    /// [`Transport::read_page_extra`]
    ReadPageExtra {
        /// Target device.
        serial: Serial,
        /// Memory bank.
        bank: usize,
        /// Page within the bank.
        page: usize,
    },
    /// [`Transport::read_page_crc`]
    ReadPageCrc {
        /// Target device.
        serial: Serial,
        /// Memory bank.
        bank: usize,
        /// Page within the bank.
        page: usize,
    },
    /// [`Transport::read_page_extra_crc`]
    ReadPageExtraCrc {
        /// Target device.
        serial: Serial,
        /// Memory bank.
        bank: usize,
        /// Page within the bank.
        page: usize,
    },
    /// [`Transport::write`]
    Write {
        /// Target device.
        serial: Serial,
        /// Memory bank.
        bank: usize,
        /// Byte offset within the bank.
        addr: usize,
        /// Bytes written.
        data: Vec<u8>,
    },
    /// [`Transport::read_nv`]
    ReadNv {
        /// Target device.
        serial: Serial,
        /// NV bank type.
        bank: u8,
        /// Byte offset within the bank.
        addr: usize,
        /// Requested read mode.
        mode: ReadMode,
        /// Number of bytes read.
        len: usize,
    },
    /// [`Transport::write_nv`]
    WriteNv {
        /// Target device.
        serial: Serial,
        /// NV bank type.
        bank: u8,
        /// Byte offset within the bank.
        addr: usize,
        /// Bytes written.
        data: Vec<u8>,
    },
    /// [`Transport::set_oscillator`]
    SetOscillator {
        /// Target device.
        serial: Serial,
        /// Requested oscillator state.
        enable: bool,
    },
    /// [`Transport::release`]
    Release,
}

#[derive(Default)]
struct SimBus {
    devices: Vec<SimDevice>,
    calls: Vec<SimCall>,
    cursor: Option<usize>,
    acquired: bool,
    fault: Option<(usize, Fault)>,
}

impl SimBus {
    /// Records `call` and hands out a pending injected fault once it is due.
    fn record(&mut self, call: SimCall) -> Result<(), Fault> {
        log::trace!("sim: {:?}", call);
        self.calls.push(call);
        match self.fault.take() {
            Some((0, fault)) => Err(fault),
            Some((skip, fault)) => {
                self.fault = Some((skip - 1, fault));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn device(&self, serial: &Serial) -> Result<&SimDevice, Fault> {
        self.devices
            .iter()
            .find(|d| d.serial == *serial)
            .ok_or_else(|| Fault::new(NO_DEVICE, format!("device {} not found", serial)))
    }

    fn device_mut(&mut self, serial: &Serial) -> Result<&mut SimDevice, Fault> {
        self.devices
            .iter_mut()
            .find(|d| d.serial == *serial)
            .ok_or_else(|| Fault::new(NO_DEVICE, format!("device {} not found", serial)))
    }

    fn find_from(&mut self, start: usize, kind: SearchKind, family: Option<u8>) -> bool {
        self.cursor = self
            .devices
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, d)| {
                family.is_none_or(|f| d.serial.family() == f)
                    && (kind == SearchKind::Normal || d.alarm)
            })
            .map(|(i, _)| i);
        self.cursor.is_some()
    }
}

/// A simulated 1-Wire adapter.
///
/// Clones share the same bus, so a test can keep a handle for inspection while a
/// [`Port`](crate::Port) owns the acquired link.
#[derive(Clone, Default)]
pub struct SimAdapter {
    bus: Rc<RefCell<SimBus>>,
}

impl SimAdapter {
    /// Creates an adapter with an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a device, laying out its memory from the [`StandardCatalog`].
    pub fn attach(&self, serial: impl Into<Serial>) {
        let serial = serial.into();
        let banks = StandardCatalog::family(serial.family()).map_or(&[][..], |f| f.banks);
        self.attach_with_banks(serial, banks);
    }

    /// Attaches a device with an explicit memory layout.
    ///
    /// Bank page lengths must be non-zero.
    pub fn attach_with_banks(&self, serial: impl Into<Serial>, banks: &[MemoryBankInfo]) {
        let serial = serial.into();
        log::debug!("sim: attach {}", serial);
        self.bus
            .borrow_mut()
            .devices
            .push(SimDevice::new(serial, banks));
    }

    /// Removes a device from the bus. Returns `false` if it was not attached.
    pub fn detach(&self, serial: &Serial) -> bool {
        let mut bus = self.bus.borrow_mut();
        let before = bus.devices.len();
        bus.devices.retain(|d| d.serial != *serial);
        bus.cursor = None;
        bus.devices.len() != before
    }

    /// Sets the alarm flag reported to alarm searches.
    pub fn set_alarm(&self, serial: &Serial, alarm: bool) -> bool {
        self.with_device(serial, |d| d.alarm = alarm).is_some()
    }

    /// Flips a bit of a page without updating its CRC.
    pub fn corrupt_page(&self, serial: &Serial, bank: usize, page: usize) -> bool {
        self.with_device(serial, |d| d.corrupt(bank, page))
            .unwrap_or(false)
    }

    /// Contents of a memory bank.
    pub fn memory(&self, serial: &Serial, bank: usize) -> Option<Vec<u8>> {
        self.with_device(serial, |d| d.memory(bank)).flatten()
    }

    /// Clock control byte of a clock device.
    pub fn control(&self, serial: &Serial) -> Option<ClockControl> {
        self.with_device(serial, |d| d.control()).flatten()
    }

    /// Whether the oscillator of a clock device runs.
    pub fn oscillator(&self, serial: &Serial) -> Option<bool> {
        self.control(serial).map(|c| c.running())
    }

    /// Seconds counter of a clock device.
    pub fn clock(&self, serial: &Serial) -> Option<u32> {
        self.with_device(serial, |d| d.seconds()).flatten()
    }

    /// Lets `secs` seconds pass on every running clock.
    pub fn advance(&self, secs: u32) {
        for dev in self.bus.borrow_mut().devices.iter_mut() {
            dev.tick(secs);
        }
    }

    /// Makes the next transport primitive fail with `fault`.
    pub fn inject_fault(&self, fault: Fault) {
        self.inject_fault_after(0, fault);
    }

    /// Lets `skip` primitives succeed, then fails the following one with `fault`.
    pub fn inject_fault_after(&self, skip: usize, fault: Fault) {
        self.bus.borrow_mut().fault = Some((skip, fault));
    }

    /// Primitives invoked so far.
    pub fn calls(&self) -> Vec<SimCall> {
        self.bus.borrow().calls.clone()
    }

    /// Clears the call log.
    pub fn clear_calls(&self) {
        self.bus.borrow_mut().calls.clear();
    }

    /// Whether a link is currently acquired.
    pub fn is_acquired(&self) -> bool {
        self.bus.borrow().acquired
    }

    fn with_device<R>(&self, serial: &Serial, f: impl FnOnce(&mut SimDevice) -> R) -> Option<R> {
        self.bus.borrow_mut().device_mut(serial).ok().map(f)
    }
}

impl Acquire for SimAdapter {
    type Link = SimLink;

    fn acquire(&self, path: &str) -> Result<SimLink, Fault> {
        if !path.starts_with("sim") {
            return Err(Fault::new(
                ADAPTER_NOT_FOUND,
                format!("no simulated adapter at '{}'", path),
            ));
        }
        let mut bus = self.bus.borrow_mut();
        if bus.acquired {
            return Err(Fault::new(ADAPTER_BUSY, "adapter is in use"));
        }
        bus.acquired = true;
        bus.cursor = None;
        Ok(SimLink {
            bus: Rc::clone(&self.bus),
        })
    }
}

/// Transport to a [`SimAdapter`] bus.
pub struct SimLink {
    bus: Rc<RefCell<SimBus>>,
}

impl SimLink {
    #[allow(clippy::too_many_arguments)]
    fn read(
        &mut self,
        call: SimCall,
        serial: &Serial,
        bank: usize,
        page: usize,
        buf: &mut [u8],
        extra: Option<&mut [u8]>,
        check_crc: bool,
    ) -> Result<(), Fault> {
        let mut bus = self.bus.borrow_mut();
        bus.record(call)?;
        bus.device(serial)?
            .read_page(bank, page, buf, extra, check_crc)
    }
}

impl Transport for SimLink {
    fn search_first(&mut self, kind: SearchKind, family: Option<u8>) -> Result<bool, Fault> {
        let mut bus = self.bus.borrow_mut();
        bus.record(SimCall::SearchFirst { kind, family })?;
        Ok(bus.find_from(0, kind, family))
    }

    fn search_next(&mut self, kind: SearchKind, family: Option<u8>) -> Result<bool, Fault> {
        let mut bus = self.bus.borrow_mut();
        bus.record(SimCall::SearchNext { kind, family })?;
        match bus.cursor {
            Some(i) => Ok(bus.find_from(i + 1, kind, family)),
            None => Ok(false),
        }
    }

    fn serial(&mut self) -> Result<Serial, Fault> {
        let mut bus = self.bus.borrow_mut();
        bus.record(SimCall::ReadSerial)?;
        bus.cursor
            .map(|i| bus.devices[i].serial)
            .ok_or_else(|| Fault::new(NO_SEARCH, "no device selected by search"))
    }

    fn read_page(
        &mut self,
        bank: usize,
        serial: &Serial,
        page: usize,
        buf: &mut [u8],
    ) -> Result<(), Fault> {
        let call = SimCall::ReadPage {
            serial: *serial,
            bank,
            page,
        };
        self.read(call, serial, bank, page, buf, None, false)
    }

    fn read_page_extra(
        &mut self,
        bank: usize,
        serial: &Serial,
        page: usize,
        buf: &mut [u8],
        extra: &mut [u8],
    ) -> Result<(), Fault> {
        let call = SimCall::ReadPageExtra {
            serial: *serial,
            bank,
            page,
        };
        self.read(call, serial, bank, page, buf, Some(extra), false)
    }

    fn read_page_crc(
        &mut self,
        bank: usize,
        serial: &Serial,
        page: usize,
        buf: &mut [u8],
    ) -> Result<(), Fault> {
        let call = SimCall::ReadPageCrc {
            serial: *serial,
            bank,
            page,
        };
        self.read(call, serial, bank, page, buf, None, true)
    }

    fn read_page_extra_crc(
        &mut self,
        bank: usize,
        serial: &Serial,
        page: usize,
        buf: &mut [u8],
        extra: &mut [u8],
    ) -> Result<(), Fault> {
        let call = SimCall::ReadPageExtraCrc {
            serial: *serial,
            bank,
            page,
        };
        self.read(call, serial, bank, page, buf, Some(extra), true)
    }

    fn write(
        &mut self,
        bank: usize,
        serial: &Serial,
        addr: usize,
        data: &[u8],
    ) -> Result<(), Fault> {
        let mut bus = self.bus.borrow_mut();
        bus.record(SimCall::Write {
            serial: *serial,
            bank,
            addr,
            data: data.to_vec(),
        })?;
        bus.device_mut(serial)?.write(bank, addr, data)
    }

    fn read_nv(
        &mut self,
        bank: u8,
        serial: &Serial,
        addr: usize,
        mode: ReadMode,
        buf: &mut [u8],
    ) -> Result<(), Fault> {
        let mut bus = self.bus.borrow_mut();
        bus.record(SimCall::ReadNv {
            serial: *serial,
            bank,
            addr,
            mode,
            len: buf.len(),
        })?;
        bus.device(serial)?.read_nv(bank, addr, buf)
    }

    fn write_nv(
        &mut self,
        bank: u8,
        serial: &Serial,
        addr: usize,
        data: &[u8],
    ) -> Result<(), Fault> {
        let mut bus = self.bus.borrow_mut();
        bus.record(SimCall::WriteNv {
            serial: *serial,
            bank,
            addr,
            data: data.to_vec(),
        })?;
        bus.device_mut(serial)?.write_nv(bank, addr, data)
    }

    fn set_oscillator(&mut self, serial: &Serial, enable: bool) -> Result<(), Fault> {
        let mut bus = self.bus.borrow_mut();
        bus.record(SimCall::SetOscillator {
            serial: *serial,
            enable,
        })?;
        bus.device_mut(serial)?.set_oscillator(enable)
    }

    fn release(&mut self) {
        let mut bus = self.bus.borrow_mut();
        bus.calls.push(SimCall::Release);
        bus.acquired = false;
        bus.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Serial = Serial([0x10, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x01]);
    const B: Serial = Serial([0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x02]);

    #[test]
    fn test_acquire_once() {
        let adapter = SimAdapter::new();
        let mut link = adapter.acquire("sim").unwrap();
        assert_eq!(adapter.acquire("sim").err().unwrap().code, ADAPTER_BUSY);
        link.release();
        assert!(adapter.acquire("sim0").is_ok());
    }

    #[test]
    fn test_search_order_and_filters() {
        let adapter = SimAdapter::new();
        adapter.attach(A);
        adapter.attach(B);
        adapter.set_alarm(&B, true);
        let mut link = adapter.acquire("sim").unwrap();

        assert!(link.search_first(SearchKind::Normal, None).unwrap());
        assert_eq!(link.serial().unwrap(), A);
        assert!(link.search_next(SearchKind::Normal, None).unwrap());
        assert_eq!(link.serial().unwrap(), B);
        assert!(!link.search_next(SearchKind::Normal, None).unwrap());
        assert!(!link.search_next(SearchKind::Normal, None).unwrap());

        assert!(link.search_first(SearchKind::Alarmed, None).unwrap());
        assert_eq!(link.serial().unwrap(), B);
        assert!(!link.search_next(SearchKind::Alarmed, None).unwrap());

        assert!(!link.search_first(SearchKind::Normal, Some(0x28)).unwrap());
        assert_eq!(link.serial().unwrap_err().code, NO_SEARCH);
    }

    #[test]
    fn test_injected_fault_is_consumed() {
        let adapter = SimAdapter::new();
        adapter.attach(A);
        let mut link = adapter.acquire("sim").unwrap();
        adapter.inject_fault(Fault::new(99, "line short"));
        assert_eq!(
            link.search_first(SearchKind::Normal, None).unwrap_err().code,
            99
        );
        assert!(link.search_first(SearchKind::Normal, None).unwrap());
    }

    #[test]
    fn test_delayed_fault() {
        let adapter = SimAdapter::new();
        adapter.attach(A);
        let mut link = adapter.acquire("sim").unwrap();
        adapter.inject_fault_after(2, Fault::new(98, "late"));
        assert!(link.search_first(SearchKind::Normal, None).unwrap());
        assert_eq!(link.serial().unwrap(), A);
        assert_eq!(
            link.search_next(SearchKind::Normal, None).unwrap_err().code,
            98
        );
        assert!(!link.search_next(SearchKind::Normal, None).unwrap());
    }

    #[test]
    fn test_detach_removes_device() {
        let adapter = SimAdapter::new();
        adapter.attach(A);
        adapter.attach(B);
        assert!(adapter.detach(&A));
        assert!(!adapter.detach(&A));
        let mut link = adapter.acquire("sim").unwrap();
        assert!(link.search_first(SearchKind::Normal, None).unwrap());
        assert_eq!(link.serial().unwrap(), B);
        assert!(!link.search_next(SearchKind::Normal, None).unwrap());
        assert!(adapter.memory(&A, 1).is_none());
    }

    #[test]
    fn test_crc_read_detects_corruption() {
        let serial = Serial::with_crc(0x09, [1, 2, 3, 4, 5, 6]);
        let adapter = SimAdapter::new();
        adapter.attach(serial);
        let mut link = adapter.acquire("sim").unwrap();
        let mut buf = [0u8; 32];
        link.write(0, &serial, 0, &[0x55; 32]).unwrap();
        link.read_page_crc(0, &serial, 0, &mut buf).unwrap();
        assert_eq!(buf, [0x55; 32]);

        assert!(adapter.corrupt_page(&serial, 0, 0));
        let fault = link.read_page_crc(0, &serial, 0, &mut buf).unwrap_err();
        assert_eq!(fault.code, CRC_MISMATCH);
        link.read_page(0, &serial, 0, &mut buf).unwrap();
        assert_eq!(buf[0], 0x54);
    }

    #[test]
    fn test_unknown_device() {
        let adapter = SimAdapter::new();
        let mut link = adapter.acquire("sim").unwrap();
        let mut buf = [0u8; 4];
        let fault = link
            .read_nv(2, &B, 3, ReadMode::Cached, &mut buf)
            .unwrap_err();
        assert_eq!(fault.code, NO_DEVICE);
    }
}
