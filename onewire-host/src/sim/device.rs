use super::{CRC_MISMATCH, OUT_OF_RANGE, UNSUPPORTED};
use crate::{
    CLOCK_BANK, CLOCK_OFFSET, ClockRegister, Fault, MemoryBankInfo, Serial, crc16, has_clock,
};
use bitfield_struct::bitfield;

/// Offset of the device control byte within the clock registers.
pub const CONTROL_OFFSET: usize = 0x01;

const CLOCK_PAGE_LEN: usize = 32;

/// Device control byte of a simulated clock.
///
/// Bit layout follows the DS1994: the oscillator runs only while all three OSC
/// bits are set.
#[bitfield(u8)]
#[derive(PartialEq, Eq)]
pub struct ClockControl {
    /// Write-protect and read-only flags of the clock, timer and cycle counter.
    #[bits(4)]
    pub protect: u8,
    /// Oscillator enable bits.
    #[bits(3)]
    pub osc: u8,
    /// Delay select.
    pub dsel: bool,
}

impl ClockControl {
    const OSC_ON: u8 = 0b111;

    /// Whether the oscillator runs.
    pub fn running(&self) -> bool {
        self.osc() == Self::OSC_ON
    }
}

struct SimBank {
    info: MemoryBankInfo,
    data: Vec<u8>,
    crcs: Vec<u16>,
    counters: Vec<u32>,
}

impl SimBank {
    fn new(info: MemoryBankInfo) -> Self {
        let data = vec![0u8; info.size()];
        let crcs = data
            .chunks(info.page_len.max(1))
            .map(|p| crc16(0, p))
            .collect();
        Self {
            info,
            data,
            crcs,
            counters: vec![0; info.page_count],
        }
    }

    fn page(&self, page: usize) -> Result<&[u8], Fault> {
        if page >= self.info.page_count {
            return Err(Fault::new(OUT_OF_RANGE, format!("page {} out of range", page)));
        }
        let len = self.info.page_len;
        Ok(&self.data[page * len..(page + 1) * len])
    }

    fn span(&self, addr: usize, len: usize) -> Result<core::ops::Range<usize>, Fault> {
        match addr.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(addr..end),
            _ => Err(Fault::new(
                OUT_OF_RANGE,
                format!("0x{:x}+{} beyond end of bank {}", addr, len, self.info.index),
            )),
        }
    }

    fn write(&mut self, addr: usize, src: &[u8]) -> Result<(), Fault> {
        let span = self.span(addr, src.len())?;
        if src.is_empty() {
            return Ok(());
        }
        self.data[span.clone()].copy_from_slice(src);
        let len = self.info.page_len;
        for page in span.start / len..=(span.end - 1) / len {
            self.crcs[page] = crc16(0, &self.data[page * len..(page + 1) * len]);
            self.counters[page] = self.counters[page].wrapping_add(1);
        }
        Ok(())
    }

    fn extra(&self, page: usize, out: &mut [u8]) {
        out.fill(0);
        let counter = self.counters[page].to_le_bytes();
        let n = out.len().min(counter.len());
        out[..n].copy_from_slice(&counter[..n]);
    }
}

/// State of one simulated device.
pub(super) struct SimDevice {
    pub(super) serial: Serial,
    pub(super) alarm: bool,
    banks: Vec<SimBank>,
    clock_page: Option<Vec<u8>>,
}

impl SimDevice {
    pub(super) fn new(serial: Serial, banks: &[MemoryBankInfo]) -> Self {
        let clock_page = (has_clock(serial.family()) && banks.len() <= CLOCK_BANK as usize)
            .then(|| vec![0u8; CLOCK_PAGE_LEN]);
        Self {
            serial,
            alarm: false,
            banks: banks.iter().copied().map(SimBank::new).collect(),
            clock_page,
        }
    }

    fn bank(&self, bank: usize) -> Result<&SimBank, Fault> {
        self.banks
            .get(bank)
            .ok_or_else(|| Fault::new(OUT_OF_RANGE, format!("no memory bank {}", bank)))
    }

    fn bank_mut(&mut self, bank: usize) -> Result<&mut SimBank, Fault> {
        self.banks
            .get_mut(bank)
            .ok_or_else(|| Fault::new(OUT_OF_RANGE, format!("no memory bank {}", bank)))
    }

    pub(super) fn read_page(
        &self,
        bank: usize,
        page: usize,
        buf: &mut [u8],
        extra: Option<&mut [u8]>,
        check_crc: bool,
    ) -> Result<(), Fault> {
        let b = self.bank(bank)?;
        if extra.is_some() && !b.info.has_extra_info {
            return Err(Fault::new(
                UNSUPPORTED,
                format!("bank {} has no extra information", bank),
            ));
        }
        if check_crc && !b.info.has_auto_crc {
            return Err(Fault::new(UNSUPPORTED, format!("bank {} has no page CRC", bank)));
        }
        let data = b.page(page)?;
        if check_crc && crc16(0, data) != b.crcs[page] {
            return Err(Fault::new(
                CRC_MISMATCH,
                format!("CRC mismatch reading bank {} page {}", bank, page),
            ));
        }
        let n = buf.len().min(data.len());
        buf[..n].copy_from_slice(&data[..n]);
        if let Some(extra) = extra {
            b.extra(page, extra);
        }
        Ok(())
    }

    pub(super) fn write(&mut self, bank: usize, addr: usize, data: &[u8]) -> Result<(), Fault> {
        self.bank_mut(bank)?.write(addr, data)
    }

    pub(super) fn read_nv(&self, bank: u8, addr: usize, buf: &mut [u8]) -> Result<(), Fault> {
        let region = self.nv(bank)?;
        match addr.checked_add(buf.len()) {
            Some(end) if end <= region.len() => {
                buf.copy_from_slice(&region[addr..end]);
                Ok(())
            }
            _ => Err(Fault::new(
                OUT_OF_RANGE,
                format!("0x{:x}+{} beyond end of NV bank {}", addr, buf.len(), bank),
            )),
        }
    }

    pub(super) fn write_nv(&mut self, bank: u8, addr: usize, data: &[u8]) -> Result<(), Fault> {
        if (bank as usize) < self.banks.len() {
            return self.write(bank as usize, addr, data);
        }
        let region = self.clock_region_mut(bank)?;
        match addr.checked_add(data.len()) {
            Some(end) if end <= region.len() => {
                region[addr..end].copy_from_slice(data);
                Ok(())
            }
            _ => Err(Fault::new(
                OUT_OF_RANGE,
                format!("0x{:x}+{} beyond end of NV bank {}", addr, data.len(), bank),
            )),
        }
    }

    fn nv(&self, bank: u8) -> Result<&[u8], Fault> {
        if let Some(b) = self.banks.get(bank as usize) {
            return Ok(&b.data);
        }
        match &self.clock_page {
            Some(page) if bank == CLOCK_BANK => Ok(page),
            _ => Err(Fault::new(OUT_OF_RANGE, format!("no NV bank {}", bank))),
        }
    }

    fn clock_region_mut(&mut self, bank: u8) -> Result<&mut Vec<u8>, Fault> {
        match &mut self.clock_page {
            Some(page) if bank == CLOCK_BANK => Ok(page),
            _ => Err(Fault::new(OUT_OF_RANGE, format!("no NV bank {}", bank))),
        }
    }

    fn require_clock(&self) -> Result<(), Fault> {
        if has_clock(self.serial.family()) {
            Ok(())
        } else {
            Err(Fault::new(UNSUPPORTED, format!("{} has no oscillator", self.serial)))
        }
    }

    pub(super) fn control(&self) -> Option<ClockControl> {
        let mut byte = [0u8; 1];
        self.require_clock().ok()?;
        self.read_nv(CLOCK_BANK, CONTROL_OFFSET, &mut byte).ok()?;
        Some(ClockControl::from_bits(byte[0]))
    }

    pub(super) fn set_oscillator(&mut self, enable: bool) -> Result<(), Fault> {
        self.require_clock()?;
        let mut byte = [0u8; 1];
        self.read_nv(CLOCK_BANK, CONTROL_OFFSET, &mut byte)?;
        let control = ClockControl::from_bits(byte[0]).with_osc(if enable {
            ClockControl::OSC_ON
        } else {
            0
        });
        self.write_nv(CLOCK_BANK, CONTROL_OFFSET, &[control.into_bits()])
    }

    pub(super) fn seconds(&self) -> Option<u32> {
        self.require_clock().ok()?;
        let mut bytes = [0u8; ClockRegister::LEN];
        self.read_nv(CLOCK_BANK, CLOCK_OFFSET, &mut bytes).ok()?;
        Some(ClockRegister::decode(bytes).seconds())
    }

    /// Advances a running clock by `secs`.
    pub(super) fn tick(&mut self, secs: u32) {
        if !self.control().is_some_and(|c| c.running()) {
            return;
        }
        if let Some(now) = self.seconds() {
            let bytes = ClockRegister(now.wrapping_add(secs)).encode();
            self.write_nv(CLOCK_BANK, CLOCK_OFFSET, &bytes).ok();
        }
    }

    pub(super) fn memory(&self, bank: usize) -> Option<Vec<u8>> {
        self.banks.get(bank).map(|b| b.data.clone())
    }

    pub(super) fn corrupt(&mut self, bank: usize, page: usize) -> bool {
        let Some(b) = self.banks.get_mut(bank) else {
            return false;
        };
        if page >= b.info.page_count {
            return false;
        }
        b.data[page * b.info.page_len] ^= 0x01;
        true
    }
}
