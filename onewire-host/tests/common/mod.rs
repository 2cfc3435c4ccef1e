#![allow(dead_code)]

use onewire_host::Serial;

pub const DS18S20: Serial = Serial([0x10, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x01]);
pub const DS1994: Serial = Serial([0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x02]);
pub const DS1904: Serial = Serial([0x24, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
pub const DS1963L: Serial = Serial([0x1a, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70]);
pub const DS1982: Serial = Serial([0x09, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70]);
pub const DS2423: Serial = Serial([0x1d, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70]);
pub const DS2433: Serial = Serial([0x23, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70]);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
