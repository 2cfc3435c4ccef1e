//! Family code metadata: device names and memory bank layouts.

use crate::clock::has_clock;

/// Static description of one memory bank of a device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBankInfo {
    /// Bank index within the family, starting at 0.
    pub index: usize,
    /// Human readable bank description.
    pub description: &'static str,
    /// Number of pages in the bank.
    pub page_count: usize,
    /// Length of one page in bytes.
    pub page_len: usize,
    /// Page reads return auxiliary per-page data.
    pub has_extra_info: bool,
    /// Length of the auxiliary data in bytes.
    pub extra_info_len: usize,
    /// Page reads are integrity checked by the transport.
    pub has_auto_crc: bool,
}

impl MemoryBankInfo {
    /// A bank without extra info or automatic CRC.
    pub const fn plain(
        index: usize,
        description: &'static str,
        page_count: usize,
        page_len: usize,
    ) -> Self {
        Self {
            index,
            description,
            page_count,
            page_len,
            has_extra_info: false,
            extra_info_len: 0,
            has_auto_crc: false,
        }
    }

    /// Adds `len` bytes of extra info per page.
    pub const fn with_extra_info(mut self, len: usize) -> Self {
        self.has_extra_info = true;
        self.extra_info_len = len;
        self
    }

    /// Marks page reads as CRC protected.
    pub const fn with_auto_crc(mut self) -> Self {
        self.has_auto_crc = true;
        self
    }

    /// Total size of the bank in bytes.
    pub const fn size(&self) -> usize {
        self.page_count * self.page_len
    }
}

/// Metadata lookup keyed by family code.
///
/// Lookups are pure and never touch the bus.
pub trait Catalog {
    /// Short device name for the family, e.g. `DS1994`.
    fn name(&self, family: u8) -> &str;

    /// Longer description of the family.
    fn description(&self, family: u8) -> &str;

    /// Number of memory banks defined for the family.
    fn bank_count(&self, family: u8) -> usize;

    /// Layout of bank `index`, or `None` if the family has no such bank.
    fn bank(&self, family: u8, index: usize) -> Option<MemoryBankInfo>;

    /// Layouts of all banks of the family, in index order.
    fn banks(&self, family: u8) -> Vec<MemoryBankInfo> {
        (0..self.bank_count(family))
            .filter_map(|i| self.bank(family, i))
            .collect()
    }
}

/// One entry of the [`StandardCatalog`] table.
#[derive(Debug, Clone, Copy)]
pub struct FamilyInfo {
    /// Family code.
    pub code: u8,
    /// Part name.
    pub name: &'static str,
    /// Feature description.
    pub description: &'static str,
    /// Memory banks, in index order.
    pub banks: &'static [MemoryBankInfo],
}

const SCRATCHPAD: MemoryBankInfo = MemoryBankInfo::plain(0, "Scratchpad", 1, 32);

/// Known device families.
pub static FAMILIES: &[FamilyInfo] = &[
    FamilyInfo {
        code: 0x01,
        name: "DS1990A",
        description: "64-bit unique serial number used to identify a person or object",
        banks: &[],
    },
    FamilyInfo {
        code: 0x04,
        name: "DS1994",
        description: "4096-bit NVRAM with real-time clock, interval timer, cycle counter and alarms",
        banks: &[
            SCRATCHPAD,
            MemoryBankInfo::plain(1, "Main Memory", 16, 32),
            MemoryBankInfo::plain(2, "Clock/alarm registers", 1, 32),
        ],
    },
    FamilyInfo {
        code: 0x09,
        name: "DS1982",
        description: "1024-bit add-only EPROM with write-once status memory",
        banks: &[
            MemoryBankInfo::plain(0, "Main Memory", 4, 32).with_auto_crc(),
            MemoryBankInfo::plain(1, "Status Memory", 1, 8).with_auto_crc(),
        ],
    },
    FamilyInfo {
        code: 0x0c,
        name: "DS1996",
        description: "65536-bit NVRAM",
        banks: &[SCRATCHPAD, MemoryBankInfo::plain(1, "Main Memory", 256, 32)],
    },
    FamilyInfo {
        code: 0x10,
        name: "DS18S20",
        description: "Digital thermometer with 9-bit resolution and alarm trip points",
        banks: &[],
    },
    FamilyInfo {
        code: 0x14,
        name: "DS1971",
        description: "256-bit EEPROM with 64-bit one-time programmable register",
        banks: &[
            MemoryBankInfo::plain(0, "Scratchpad", 1, 32),
            MemoryBankInfo::plain(1, "Main Memory", 1, 32),
            MemoryBankInfo::plain(2, "Application Register", 1, 8),
        ],
    },
    FamilyInfo {
        code: 0x1a,
        name: "DS1963L",
        description: "4096-bit NVRAM with write cycle counters on the last four pages",
        banks: &[
            SCRATCHPAD,
            MemoryBankInfo::plain(1, "Main Memory", 12, 32),
            MemoryBankInfo::plain(2, "Memory with write cycle counter", 4, 32).with_extra_info(8),
        ],
    },
    FamilyInfo {
        code: 0x1d,
        name: "DS2423",
        description: "4096-bit NVRAM with external event counters",
        banks: &[
            SCRATCHPAD,
            MemoryBankInfo::plain(1, "Main Memory", 12, 32),
            MemoryBankInfo::plain(2, "Memory with counters", 4, 32)
                .with_extra_info(8)
                .with_auto_crc(),
        ],
    },
    FamilyInfo {
        code: 0x23,
        name: "DS2433",
        description: "4096-bit EEPROM",
        banks: &[SCRATCHPAD, MemoryBankInfo::plain(1, "Main Memory", 16, 32)],
    },
    FamilyInfo {
        code: 0x24,
        name: "DS1904",
        description: "Real-time clock with 32-bit seconds counter",
        banks: &[],
    },
    FamilyInfo {
        code: 0x28,
        name: "DS18B20",
        description: "Programmable resolution digital thermometer",
        banks: &[],
    },
    FamilyInfo {
        code: 0x2d,
        name: "DS2431",
        description: "1024-bit EEPROM with 64-bit register page",
        banks: &[
            MemoryBankInfo::plain(0, "Scratchpad", 1, 8),
            MemoryBankInfo::plain(1, "Main Memory", 4, 32),
            MemoryBankInfo::plain(2, "Register Page", 1, 8),
        ],
    },
    FamilyInfo {
        code: 0x42,
        name: "DS28EA00",
        description: "Digital thermometer with sequence detect and PIO",
        banks: &[],
    },
];

/// The built-in [`Catalog`] backed by [`FAMILIES`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCatalog;

impl StandardCatalog {
    /// Table entry for `family`, if known.
    pub fn family(family: u8) -> Option<&'static FamilyInfo> {
        FAMILIES.iter().find(|f| f.code == family)
    }
}

impl Catalog for StandardCatalog {
    fn name(&self, family: u8) -> &str {
        Self::family(family).map_or("Unknown", |f| f.name)
    }

    fn description(&self, family: u8) -> &str {
        Self::family(family).map_or("No description available for this family", |f| {
            f.description
        })
    }

    fn bank_count(&self, family: u8) -> usize {
        Self::family(family).map_or(0, |f| f.banks.len())
    }

    fn bank(&self, family: u8, index: usize) -> Option<MemoryBankInfo> {
        Self::family(family).and_then(|f| f.banks.get(index).copied())
    }
}

/// Features of a device derived once from its family code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Device has a real-time clock.
    pub clock: bool,
    /// Number of memory banks.
    pub banks: usize,
}

impl Capabilities {
    /// Computes the capabilities of `family` from `catalog`.
    pub fn of<C: Catalog + ?Sized>(catalog: &C, family: u8) -> Self {
        Self {
            clock: has_clock(family),
            banks: catalog.bank_count(family),
        }
    }

    /// Device has at least one memory bank.
    pub fn has_memory(&self) -> bool {
        self.banks > 0
    }
}
