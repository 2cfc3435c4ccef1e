mod common;

use common::*;
use onewire_host::{
    CLOCK_BANK, CLOCK_OFFSET, Device, Fault, Feature, OneWireError, Port, PortBuilder, ReadMode,
    sim::{SimAdapter, SimCall},
};
use rand::Rng;

fn clock_bus() -> SimAdapter {
    init_logger();
    let adapter = SimAdapter::new();
    adapter.attach(DS18S20);
    adapter.attach(DS1994);
    adapter.attach(DS1904);
    adapter
}

#[test]
fn set_then_get_round_trips() {
    let adapter = clock_bus();
    let port = Port::open(&adapter, "sim").unwrap();
    let mut rng = rand::rng();

    for serial in [DS1994, DS1904] {
        let dev = Device::new(&port, serial);
        let mut samples = vec![0, 1, 0xff, 0x100, 1_700_000_000, u32::MAX];
        samples.extend((0..64).map(|_| rng.random::<u32>()));
        for t in samples {
            dev.set_rtc(t).unwrap();
            assert_eq!(dev.get_rtc().unwrap(), t, "{serial} at {t}");
        }
    }
}

#[test]
fn set_writes_counter_then_starts_oscillator() {
    let adapter = clock_bus();
    let port = Port::open(&adapter, "sim").unwrap();
    let dev = Device::new(&port, DS1994);
    adapter.clear_calls();

    dev.set_rtc(0x1234_5678).unwrap();
    assert_eq!(
        adapter.calls(),
        vec![
            SimCall::WriteNv {
                serial: DS1994,
                bank: CLOCK_BANK,
                addr: CLOCK_OFFSET,
                data: vec![0x78, 0x56, 0x34, 0x12],
            },
            SimCall::SetOscillator {
                serial: DS1994,
                enable: true,
            },
        ]
    );
    // DS1994 keeps its clock registers in memory bank 2
    assert_eq!(
        &adapter.memory(&DS1994, 2).unwrap()[3..7],
        &[0x78, 0x56, 0x34, 0x12]
    );
    assert_eq!(adapter.oscillator(&DS1994), Some(true));
}

#[test]
fn stop_then_set_leaves_clock_running() {
    let adapter = clock_bus();
    let port = Port::open(&adapter, "sim").unwrap();
    let dev = Device::new(&port, DS1904);

    dev.stop_rtc().unwrap();
    assert_eq!(adapter.oscillator(&DS1904), Some(false));
    dev.set_rtc(500).unwrap();
    assert_eq!(adapter.oscillator(&DS1904), Some(true));

    let last = adapter
        .calls()
        .into_iter()
        .filter(|c| matches!(c, SimCall::SetOscillator { .. }))
        .last();
    assert_eq!(
        last,
        Some(SimCall::SetOscillator {
            serial: DS1904,
            enable: true
        })
    );
}

#[test]
fn stopped_clock_holds_its_value() {
    let adapter = clock_bus();
    let port = Port::open(&adapter, "sim").unwrap();
    let dev = Device::new(&port, DS1994);

    dev.set_rtc(1_000).unwrap();
    adapter.advance(60);
    assert_eq!(dev.get_rtc().unwrap(), 1_060);
    dev.stop_rtc().unwrap();
    adapter.advance(60);
    assert_eq!(dev.get_rtc().unwrap(), 1_060);
}

fn unsupported<R>(r: Result<R, OneWireError>) -> bool {
    matches!(
        r,
        Err(OneWireError::UnsupportedFeature {
            family: 0x10,
            feature: Feature::Clock
        })
    )
}

#[test]
fn non_clock_family_is_rejected_without_io() {
    let adapter = clock_bus();
    let port = Port::open(&adapter, "sim").unwrap();
    let dev = Device::new(&port, DS18S20);
    adapter.clear_calls();

    assert!(unsupported(dev.set_rtc(1)));
    assert!(unsupported(dev.get_rtc()));
    assert!(unsupported(dev.stop_rtc()));
    assert!(adapter.calls().is_empty());
}

#[test]
fn family_gate_precedes_port_state() {
    let adapter = clock_bus();
    let mut port = Port::open(&adapter, "sim").unwrap();
    port.close();

    assert!(matches!(
        Device::new(&port, DS18S20).get_rtc(),
        Err(OneWireError::UnsupportedFeature { .. })
    ));
    assert!(matches!(
        Device::new(&port, DS1994).get_rtc(),
        Err(OneWireError::InvalidState)
    ));
}

#[test]
fn failed_counter_write_skips_oscillator() {
    let adapter = clock_bus();
    let port = Port::open(&adapter, "sim").unwrap();
    let dev = Device::new(&port, DS1994);
    adapter.clear_calls();

    adapter.inject_fault(Fault::new(17, "bus error"));
    assert!(matches!(
        dev.set_rtc(99),
        Err(OneWireError::Io(Fault { code: 17, .. }))
    ));
    assert_eq!(adapter.calls().len(), 1);
    assert_eq!(adapter.oscillator(&DS1994), Some(false));
}

#[test]
fn failed_oscillator_start_fails_set() {
    let adapter = clock_bus();
    let port = Port::open(&adapter, "sim").unwrap();
    let dev = Device::new(&port, DS1904);
    adapter.clear_calls();

    adapter.inject_fault_after(1, Fault::new(9, "oscillator not responding"));
    let err = dev.set_rtc(5).unwrap_err();
    assert!(matches!(err, OneWireError::Io(Fault { code: 9, .. })));
    let calls = adapter.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[0], SimCall::WriteNv { .. }));
    assert!(matches!(calls[1], SimCall::SetOscillator { enable: true, .. }));
    // the counter was written, the clock never started
    assert_eq!(adapter.clock(&DS1904), Some(5));
    assert_eq!(adapter.oscillator(&DS1904), Some(false));
}

#[test]
fn failed_oscillator_stop_is_io_error() {
    let adapter = clock_bus();
    let port = Port::open(&adapter, "sim").unwrap();
    let dev = Device::new(&port, DS1994);
    dev.set_rtc(42).unwrap();

    adapter.inject_fault(Fault::new(9, "oscillator not responding"));
    let err = dev.stop_rtc().unwrap_err();
    assert!(matches!(err, OneWireError::Io(Fault { code: 9, .. })));
    assert_eq!(adapter.oscillator(&DS1994), Some(true));
    dev.stop_rtc().unwrap();
    assert_eq!(adapter.oscillator(&DS1994), Some(false));
}

#[test]
fn get_uses_configured_read_mode() {
    let adapter = clock_bus();
    let port = PortBuilder::new("sim")
        .with_clock_read(ReadMode::Fresh)
        .open(&adapter)
        .unwrap();
    let dev = Device::new(&port, DS1904);
    adapter.clear_calls();

    dev.get_rtc().unwrap();
    dev.get_rtc_with(ReadMode::Cached).unwrap();
    let modes: Vec<ReadMode> = adapter
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            SimCall::ReadNv {
                bank: CLOCK_BANK,
                addr: CLOCK_OFFSET,
                len: 4,
                mode,
                ..
            } => Some(mode),
            _ => None,
        })
        .collect();
    assert_eq!(modes, vec![ReadMode::Fresh, ReadMode::Cached]);
}

#[test]
fn default_read_mode_is_cached() {
    let adapter = clock_bus();
    let port = Port::open(&adapter, "sim").unwrap();
    Device::new(&port, DS1994).get_rtc().unwrap();
    assert!(adapter.calls().iter().any(|c| matches!(
        c,
        SimCall::ReadNv {
            mode: ReadMode::Cached,
            ..
        }
    )));
}
