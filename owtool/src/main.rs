use clap::{ArgAction, Parser, Subcommand};
use core::ops::Range;
use onewire_host::{
    Catalog, Device, OneWireResult, PageData, Port, Serial, Transport, sim::SimAdapter,
};

/// Inspect devices on a 1-Wire bus
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Adapter path. Paths starting with `sim` open a simulated demo bus
    #[arg(short, long, default_value = "sim")]
    path: String,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List devices on the bus
    Scan {
        /// Only devices of this family (hex, e.g. 04)
        #[arg(short, long, value_parser = parse_family)]
        family: Option<u8>,
        /// Only devices signalling an alarm
        #[arg(short, long)]
        alarmed: bool,
    },
    /// Show family information and memory layout of a device
    Info {
        /// 16 hex digit serial number, family byte first
        serial: Serial,
    },
    /// Read one page of a memory bank
    Read {
        serial: Serial,
        bank: usize,
        page: usize,
    },
    /// Read a whole memory bank
    Dump { serial: Serial, bank: usize },
    /// Write hex bytes to a memory bank and read the touched pages back
    Write {
        serial: Serial,
        bank: usize,
        addr: usize,
        /// Data as hex, e.g. deadbeef
        #[arg(value_parser = parse_hex)]
        data: HexBytes,
    },
    /// Real-time clock of DS1994/DS1904 devices
    Clock {
        serial: Serial,
        #[command(subcommand)]
        action: ClockAction,
    },
}

#[derive(Subcommand, Debug)]
enum ClockAction {
    /// Print the seconds counter
    Get,
    /// Set the seconds counter and start the oscillator
    Set { seconds: u32 },
    /// Stop the oscillator
    Stop,
}

#[derive(Clone, Debug)]
struct HexBytes(Vec<u8>);

fn parse_family(s: &str) -> Result<u8, String> {
    let s = s.trim_start_matches("0x");
    u8::from_str_radix(s, 16).map_err(|e| format!("invalid family code '{}': {}", s, e))
}

fn parse_hex(s: &str) -> Result<HexBytes, String> {
    let s = s.trim_start_matches("0x");
    if !s.len().is_multiple_of(2) {
        return Err(format!("odd number of hex digits in '{}'", s));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .and_then(|b| u8::from_str_radix(b, 16).ok())
                .ok_or_else(|| format!("invalid hex byte at offset {}", i))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(HexBytes)
}

/// Devices attached to the simulated bus.
fn demo_bus() -> SimAdapter {
    let adapter = SimAdapter::new();
    adapter.attach(Serial::with_crc(0x10, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]));
    adapter.attach(Serial::with_crc(0x04, [0x11, 0x22, 0x33, 0x44, 0x55, 0x66]));
    adapter.attach(Serial::with_crc(0x1d, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06]));
    let clock = Serial::with_crc(0x24, [0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
    adapter.attach(clock);
    adapter.set_alarm(&clock, true);
    adapter
}

/// Pages of a bank covered by a write of `len` bytes at `addr`.
fn touched_pages(addr: usize, len: usize, page_len: usize) -> Range<usize> {
    if len == 0 || page_len == 0 {
        return 0..0;
    }
    addr / page_len..(addr + len - 1) / page_len + 1
}

fn scan<T: Transport, C: Catalog>(
    port: &Port<T, C>,
    family: Option<u8>,
    alarmed: bool,
) -> OneWireResult<Vec<Device<'_, T, C>>> {
    let mut devices = match (family, alarmed) {
        (_, true) => port.alarmed()?,
        (Some(family), false) => port.enumerate_family(family)?,
        (None, false) => port.enumerate()?,
    };
    devices.retain(|d| family.is_none_or(|f| d.family() == f));
    log::info!("Found {} devices", devices.len());
    Ok(devices)
}

fn print_rows(base: usize, data: &[u8]) {
    for (i, row) in data.chunks(16).enumerate() {
        let hex: Vec<String> = row.iter().map(|b| format!("{:02x}", b)).collect();
        println!("  {:04x}: {}", base + i * 16, hex.join(" "));
    }
}

fn print_page(base: usize, data: &PageData) {
    print_rows(base, data.page());
    if let Some(extra) = data.extra() {
        let hex: Vec<String> = extra.iter().map(|b| format!("{:02x}", b)).collect();
        println!("  extra: {}", hex.join(" "));
    }
}

fn print_device<T: Transport, C: Catalog>(dev: &Device<'_, T, C>) {
    println!("{}  {:<8} {}", dev.serial(), dev.name(), dev.describe());
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match args.verbose {
        0 => {}
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let adapter = demo_bus();
    let port = Port::open(&adapter, &args.path)?;
    log::info!("Opened 1-Wire port {}", port.path());

    match args.command {
        Command::Scan { family, alarmed } => {
            for dev in scan(&port, family, alarmed)? {
                print_device(&dev);
            }
        }
        Command::Info { serial } => {
            let dev = Device::new(&port, serial);
            print_device(&dev);
            println!("  id:    {}", serial.show_serial());
            if !serial.has_valid_crc() {
                log::warn!("{}: serial number CRC mismatch", serial);
            }
            println!("  clock: {}", if dev.capabilities().clock { "yes" } else { "no" });
            for (i, name) in dev.banks().into_iter().enumerate() {
                let info = dev.bank_info(i)?;
                println!(
                    "  bank {}: {} ({} x {} bytes{}{})",
                    i,
                    name,
                    info.page_count,
                    info.page_len,
                    if info.has_extra_info { ", extra info" } else { "" },
                    if info.has_auto_crc { ", auto CRC" } else { "" },
                );
            }
        }
        Command::Read { serial, bank, page } => {
            let dev = Device::new(&port, serial);
            let data = dev.read_page(bank, page)?;
            print_page(page * data.page().len(), &data);
        }
        Command::Dump { serial, bank } => {
            let dev = Device::new(&port, serial);
            print_rows(0, &dev.read_bank(bank)?);
        }
        Command::Write {
            serial,
            bank,
            addr,
            data: HexBytes(data),
        } => {
            let dev = Device::new(&port, serial);
            dev.write_block(bank, addr, &data)?;
            log::info!("Wrote {} bytes to bank {} at 0x{:x}", data.len(), bank, addr);
            let page_len = dev.bank_info(bank)?.page_len;
            for page in touched_pages(addr, data.len(), page_len) {
                print_page(page * page_len, &dev.read_page(bank, page)?);
            }
        }
        Command::Clock { serial, action } => {
            let dev = Device::new(&port, serial);
            match action {
                ClockAction::Get => println!("{}", dev.get_rtc()?),
                ClockAction::Set { seconds } => {
                    dev.set_rtc(seconds)?;
                    log::info!("{}: clock set to {}", serial, seconds);
                }
                ClockAction::Stop => {
                    dev.stop_rtc()?;
                    log::info!("{}: clock stopped", serial);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("00a1FF").unwrap().0, vec![0x00, 0xa1, 0xff]);
        assert_eq!(parse_hex("0x0102").unwrap().0, vec![1, 2]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn test_parse_family() {
        assert_eq!(parse_family("04"), Ok(0x04));
        assert_eq!(parse_family("0x28"), Ok(0x28));
        assert!(parse_family("100").is_err());
    }

    #[test]
    fn test_args() {
        let args =
            Args::try_parse_from(["owtool", "clock", "0411223344556602", "set", "5"]).unwrap();
        assert_eq!(args.path, "sim");
        assert!(matches!(
            args.command,
            Command::Clock {
                action: ClockAction::Set { seconds: 5 },
                ..
            }
        ));
    }

    #[test]
    fn test_demo_bus_serials_are_valid() {
        let adapter = demo_bus();
        let port = Port::open(&adapter, "sim").unwrap();
        let devices = port.enumerate().unwrap();
        assert_eq!(devices.len(), 4);
        assert!(devices.iter().all(|d| d.serial().has_valid_crc()));
        assert_eq!(port.alarmed().unwrap().len(), 1);
    }

    #[test]
    fn test_touched_pages() {
        assert_eq!(touched_pages(0, 1, 32), 0..1);
        assert_eq!(touched_pages(30, 4, 32), 0..2);
        assert_eq!(touched_pages(64, 32, 32), 2..3);
        // empty write at the end of a 16 page bank reads nothing back
        assert!(touched_pages(512, 0, 32).is_empty());
    }

    #[test]
    fn test_scan_filters_before_counting() {
        let adapter = demo_bus();
        let port = Port::open(&adapter, "sim").unwrap();
        assert!(scan(&port, Some(0x04), true).unwrap().is_empty());
        assert_eq!(scan(&port, Some(0x24), true).unwrap().len(), 1);
        assert_eq!(scan(&port, Some(0x04), false).unwrap().len(), 1);
        assert_eq!(scan(&port, None, false).unwrap().len(), 4);
    }
}
