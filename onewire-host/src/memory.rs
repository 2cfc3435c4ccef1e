//! Memory bank page reads and block writes.

use crate::{Catalog, Device, MemoryBankInfo, OneWireError, OneWireResult, Transport};

/// Page read primitive selected from the capabilities of a memory bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Page bytes only.
    Plain,
    /// Page bytes plus per-page extra information.
    WithExtra,
    /// Page bytes, CRC checked by the transport.
    WithCrc,
    /// Page bytes plus extra information, CRC checked by the transport.
    WithExtraAndCrc,
}

impl ReadStrategy {
    /// Selects the strategy for a bank.
    pub fn for_bank(bank: &MemoryBankInfo) -> Self {
        match (bank.has_extra_info, bank.has_auto_crc) {
            (false, false) => Self::Plain,
            (true, false) => Self::WithExtra,
            (false, true) => Self::WithCrc,
            (true, true) => Self::WithExtraAndCrc,
        }
    }

    /// Whether reads with this strategy return extra information.
    pub fn has_extra(&self) -> bool {
        matches!(self, Self::WithExtra | Self::WithExtraAndCrc)
    }
}

/// Result of [`Device::read_page`].
///
/// Banks with extra information return the page together with the extra bytes;
/// all other banks return the page alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageData {
    /// Page contents.
    Plain(Vec<u8>),
    /// Page contents and the page's extra information.
    WithExtra {
        /// Page contents.
        page: Vec<u8>,
        /// Extra information, e.g. a write cycle counter.
        extra: Vec<u8>,
    },
}

impl PageData {
    /// Page contents.
    pub fn page(&self) -> &[u8] {
        match self {
            Self::Plain(page) | Self::WithExtra { page, .. } => page,
        }
    }

    /// Extra information, if the bank provides it.
    pub fn extra(&self) -> Option<&[u8]> {
        match self {
            Self::Plain(_) => None,
            Self::WithExtra { extra, .. } => Some(extra),
        }
    }

    /// Splits into page contents and optional extra information.
    pub fn into_parts(self) -> (Vec<u8>, Option<Vec<u8>>) {
        match self {
            Self::Plain(page) => (page, None),
            Self::WithExtra { page, extra } => (page, Some(extra)),
        }
    }
}

impl<T: Transport, C: Catalog> Device<'_, T, C> {
    /// Reads page `page` of memory bank `bank`.
    ///
    /// The transport primitive is chosen by [`ReadStrategy::for_bank`]. The returned
    /// page is exactly the bank's page length; banks with extra information return
    /// [`PageData::WithExtra`].
    ///
    /// # Errors
    /// * [`OneWireError::InvalidArgument`] - no such bank or page.
    /// * [`OneWireError::Io`] - the transport failed, including CRC mismatches.
    /// * [`OneWireError::InvalidState`] - the port is closed.
    pub fn read_page(&self, bank: usize, page: usize) -> OneWireResult<PageData> {
        let info = self.bank_info(bank)?;
        if page >= info.page_count {
            return Err(OneWireError::invalid(format!(
                "{} bank {} has {} page(s), no page {}",
                self.name(),
                bank,
                info.page_count,
                page
            )));
        }
        let strategy = ReadStrategy::for_bank(&info);
        let mut buf = vec![0u8; info.page_len];
        let mut extra = vec![0u8; info.extra_info_len];
        log::trace!(
            "{}: read bank {} page {} ({:?})",
            self.serial(),
            bank,
            page,
            strategy
        );
        self.transact(|link, serial| match strategy {
            ReadStrategy::Plain => link.read_page(bank, serial, page, &mut buf),
            ReadStrategy::WithExtra => {
                link.read_page_extra(bank, serial, page, &mut buf, &mut extra)
            }
            ReadStrategy::WithCrc => link.read_page_crc(bank, serial, page, &mut buf),
            ReadStrategy::WithExtraAndCrc => {
                link.read_page_extra_crc(bank, serial, page, &mut buf, &mut extra)
            }
        })?;
        Ok(if strategy.has_extra() {
            PageData::WithExtra { page: buf, extra }
        } else {
            PageData::Plain(buf)
        })
    }

    /// Reads every page of `bank` and concatenates the page contents.
    ///
    /// Extra information is discarded.
    pub fn read_bank(&self, bank: usize) -> OneWireResult<Vec<u8>> {
        let info = self.bank_info(bank)?;
        let mut data = Vec::with_capacity(info.size());
        for page in 0..info.page_count {
            data.extend_from_slice(self.read_page(bank, page)?.page());
        }
        Ok(data)
    }

    /// Writes `data` to memory bank `bank` starting at byte offset `addr`.
    ///
    /// Data is written verbatim, zero bytes included. Nothing is read back.
    ///
    /// # Errors
    /// * [`OneWireError::InvalidArgument`] - no such bank, or the write extends past its end.
    /// * [`OneWireError::Io`] - the transport failed.
    pub fn write_block(&self, bank: usize, addr: usize, data: &[u8]) -> OneWireResult<()> {
        let info = self.bank_info(bank)?;
        if addr
            .checked_add(data.len())
            .is_none_or(|end| end > info.size())
        {
            return Err(OneWireError::invalid(format!(
                "write of {} byte(s) at 0x{:x} exceeds {} bank {} ({} bytes)",
                data.len(),
                addr,
                self.name(),
                bank,
                info.size()
            )));
        }
        log::trace!(
            "{}: write {} byte(s) to bank {} at 0x{:x}",
            self.serial(),
            data.len(),
            bank,
            addr
        );
        self.transact(|link, serial| link.write(bank, serial, addr, data))
    }
}
