use crate::{Fault, Serial};

/// Type of search performed by [`Transport::search_first`] and [`Transport::search_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchKind {
    /// Every device on the bus responds.
    #[default]
    Normal,
    /// Only devices in an alarm state respond.
    Alarmed,
}

/// How non-volatile memory is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Accept the value the transport already holds; no conversion cycle is forced.
    #[default]
    Cached,
    /// Force the device to refresh the value before it is read.
    Fresh,
}

/// Primitives of an open 1-Wire adapter.
///
/// A transport is exclusively owned by one [`Port`](crate::Port). Every call blocks
/// until the bus transaction completes. Failures carry the adapter's own error code
/// and message in a [`Fault`].
///
/// Page and NV primitives address the device by `serial`; `bank` is the memory bank
/// index as defined by the device family.
pub trait Transport {
    /// Starts a new bus search and positions on the first responding device.
    ///
    /// # Arguments
    /// * `kind` - Full search or alarm-only search.
    /// * `family` - Restrict the search to one family code.
    ///
    /// # Returns
    /// `true` if a device was found; its serial is available through [`Transport::serial`].
    fn search_first(&mut self, kind: SearchKind, family: Option<u8>) -> Result<bool, Fault>;

    /// Continues the search started by [`Transport::search_first`].
    ///
    /// # Returns
    /// `true` if another device was found, `false` once the search is exhausted.
    fn search_next(&mut self, kind: SearchKind, family: Option<u8>) -> Result<bool, Fault>;

    /// Serial number of the device the search is positioned on.
    fn serial(&mut self) -> Result<Serial, Fault>;

    /// Reads one page into `buf`.
    fn read_page(
        &mut self,
        bank: usize,
        serial: &Serial,
        page: usize,
        buf: &mut [u8],
    ) -> Result<(), Fault>;

    /// Reads one page into `buf` and the page's extra information into `extra`.
    fn read_page_extra(
        &mut self,
        bank: usize,
        serial: &Serial,
        page: usize,
        buf: &mut [u8],
        extra: &mut [u8],
    ) -> Result<(), Fault>;

    /// Reads one page into `buf`, validating the device supplied CRC.
    ///
    /// # Errors
    /// Fails if the CRC does not match.
    fn read_page_crc(
        &mut self,
        bank: usize,
        serial: &Serial,
        page: usize,
        buf: &mut [u8],
    ) -> Result<(), Fault>;

    /// Combination of [`Transport::read_page_extra`] and [`Transport::read_page_crc`].
    fn read_page_extra_crc(
        &mut self,
        bank: usize,
        serial: &Serial,
        page: usize,
        buf: &mut [u8],
        extra: &mut [u8],
    ) -> Result<(), Fault>;

    /// Writes `data` to `bank` starting at byte offset `addr`.
    fn write(&mut self, bank: usize, serial: &Serial, addr: usize, data: &[u8])
    -> Result<(), Fault>;

    /// Reads non-volatile memory of bank type `bank` at `addr` into `buf`.
    fn read_nv(
        &mut self,
        bank: u8,
        serial: &Serial,
        addr: usize,
        mode: ReadMode,
        buf: &mut [u8],
    ) -> Result<(), Fault>;

    /// Writes `data` to non-volatile memory of bank type `bank` at `addr`.
    fn write_nv(&mut self, bank: u8, serial: &Serial, addr: usize, data: &[u8])
    -> Result<(), Fault>;

    /// Starts (`true`) or stops (`false`) the clock oscillator of `serial`.
    ///
    /// # Errors
    /// Fails if the transaction fails or the device has no oscillator.
    fn set_oscillator(&mut self, serial: &Serial, enable: bool) -> Result<(), Fault>;

    /// Releases the adapter. Called once when the owning port closes.
    fn release(&mut self) {}
}

/// Opens transports from a device path or identifier.
pub trait Acquire {
    /// The transport handed out on success.
    type Link: Transport;

    /// Acquires the adapter named by `path`.
    ///
    /// # Errors
    /// Fails if the path is invalid or the adapter is busy.
    fn acquire(&self, path: &str) -> Result<Self::Link, Fault>;
}
