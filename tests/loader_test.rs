//! Tests for the image loaders: raw binaries, Motorola S-records, Intel hex
//! and extension-based file loading.

use std::fs;
use std::path::PathBuf;

use lib6809::{loader, AddressMap, LoadError, LoadSummary, Machine, RunOutcome, SystemBus};

fn setup_bus() -> SystemBus {
    SystemBus::new(AddressMap::default())
}

/// A per-test scratch file path in the system temp directory.
fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("lib6809-{}-{}", std::process::id(), name))
}

const SRECORD: &str = "\
S00600004844521B
S106100086423EE3
S106F0007E10007B
S5030002FA
S9031000EC
";

const INTEL_HEX: &str = "\
:020000040000FA
:0310000086423EE7
:02FFFE001000F1
:0400000500001000E7
:00000001FF
";

// ========== Raw ==========

#[test]
fn test_raw_without_origin_ends_at_top() {
    let mut bus = setup_bus();
    let summary = loader::load_raw(&mut bus, &[0xAA, 0xBB, 0x10, 0x00], None).unwrap();
    assert_eq!(summary.low, 0xFFFC);
    assert_eq!(summary.high, 0xFFFF);
    assert_eq!(bus.peek(0xFFFC), 0xAA);
    assert_eq!(bus.peek(0xFFFF), 0x00);
}

#[test]
fn test_raw_that_does_not_fit() {
    let mut bus = setup_bus();
    assert!(matches!(
        loader::load_raw(&mut bus, &[0; 4], Some(0xFFFE)),
        Err(LoadError::Range { origin: 0xFFFE, len: 4 })
    ));
    let huge = vec![0u8; 0x10001];
    assert!(matches!(
        loader::load_raw(&mut bus, &huge, None),
        Err(LoadError::Range { .. })
    ));
}

#[test]
fn test_raw_full_image() {
    let mut bus = setup_bus();
    let mut image = vec![0u8; 0x10000];
    image[0xFFFE] = 0x12;
    let summary = loader::load_raw(&mut bus, &image, None).unwrap();
    assert_eq!(summary.bytes, 0x10000);
    assert_eq!((summary.low, summary.high), (0x0000, 0xFFFF));
    assert_eq!(bus.peek(0xFFFE), 0x12);
}

// ========== S-records ==========

#[test]
fn test_srecord_loads_data_and_start() {
    let mut bus = setup_bus();
    let summary = loader::load_srecord(&mut bus, SRECORD).unwrap();
    assert_eq!(
        summary,
        LoadSummary {
            bytes: 6,
            low: 0x1000,
            high: 0xF002,
            start: Some(0x1000),
        }
    );
    assert_eq!(bus.peek(0x1001), 0x42);
    // ROM is written while loading
    assert_eq!(bus.peek(0xF000), 0x7E);
    assert!(!bus.is_loading());
}

#[test]
fn test_srecord_checksum_error() {
    let mut bus = setup_bus();
    let err = loader::load_srecord(&mut bus, "S106100086423EE4\n").unwrap_err();
    assert!(matches!(err, LoadError::Checksum { line: 1 }));
}

#[test]
fn test_srecord_rejects_wide_addresses() {
    let mut bus = setup_bus();
    let text = "S00600004844521B\nS20501000012E7\n";
    assert!(matches!(
        loader::load_srecord(&mut bus, text),
        Err(LoadError::Syntax { line: 2, .. })
    ));
}

#[test]
fn test_srecord_bad_length_and_prefix() {
    let mut bus = setup_bus();
    assert!(matches!(
        loader::load_srecord(&mut bus, "S107100086423EE3"),
        Err(LoadError::Syntax { line: 1, .. })
    ));
    assert!(matches!(
        loader::load_srecord(&mut bus, "\nX106100086423EE3"),
        Err(LoadError::Syntax { line: 2, .. })
    ));
}

// ========== Intel hex ==========

#[test]
fn test_intel_hex_loads_data_and_start() {
    let mut bus = setup_bus();
    let summary = loader::load_intel_hex(&mut bus, INTEL_HEX).unwrap();
    assert_eq!(summary.bytes, 5);
    assert_eq!(summary.low, 0x1000);
    assert_eq!(summary.high, 0xFFFF);
    assert_eq!(summary.start, Some(0x1000));
    assert_eq!(bus.peek(0x1002), 0x3E);
    assert_eq!(bus.peek(0xFFFE), 0x10);
}

#[test]
fn test_intel_hex_rejects_nonzero_base() {
    let mut bus = setup_bus();
    assert!(matches!(
        loader::load_intel_hex(&mut bus, ":020000040001F9\n"),
        Err(LoadError::Syntax { line: 1, .. })
    ));
}

#[test]
fn test_intel_hex_checksum_error() {
    let mut bus = setup_bus();
    assert!(matches!(
        loader::load_intel_hex(&mut bus, ":0310000086423EE8"),
        Err(LoadError::Checksum { line: 1 })
    ));
}

#[test]
fn test_intel_hex_stops_at_end_of_file() {
    let mut bus = setup_bus();
    let text = ":00000001FF\n:0310000086423EE7\n";
    let summary = loader::load_intel_hex(&mut bus, text).unwrap();
    assert_eq!(summary.bytes, 0);
    assert_eq!(bus.peek(0x1000), 0);
}

// ========== Files ==========

#[test]
fn test_load_file_by_extension() {
    let s19 = temp_path("prog.s19");
    let hex = temp_path("prog.hex");
    let bin = temp_path("prog.bin");
    fs::write(&s19, SRECORD).unwrap();
    fs::write(&hex, INTEL_HEX).unwrap();
    fs::write(&bin, [0x12, 0x12]).unwrap();

    let mut bus = setup_bus();
    let summary = loader::load_file(&mut bus, &s19, None).unwrap();
    assert_eq!(summary.start, Some(0x1000));

    let summary = loader::load_file(&mut bus, &hex, Some(0x4000)).unwrap();
    assert_eq!(summary.low, 0x1000);

    let summary = loader::load_file(&mut bus, &bin, Some(0x4000)).unwrap();
    assert_eq!((summary.low, summary.high), (0x4000, 0x4001));

    for path in [s19, hex, bin] {
        let _ = fs::remove_file(path);
    }
}

#[test]
fn test_load_file_errors() {
    let mut bus = setup_bus();
    let missing = temp_path("missing.s19");
    assert!(matches!(
        loader::load_file(&mut bus, &missing, None),
        Err(LoadError::Io(_))
    ));

    let unknown = temp_path("notes.txt");
    fs::write(&unknown, "hello").unwrap();
    assert!(matches!(
        loader::load_file(&mut bus, &unknown, None),
        Err(LoadError::UnknownFormat(_))
    ));
    let _ = fs::remove_file(unknown);
}

#[test]
fn test_loaded_program_runs() {
    // LDA #0 ; SYS (terminate), reset vector from a raw image at the top
    let mut bus = setup_bus();
    loader::load_raw(&mut bus, &[0x86, 0x00, 0x3E], Some(0x1000)).unwrap();
    loader::load_raw(&mut bus, &[0x10, 0x00], None).unwrap();
    let mut machine = Machine::new(bus).with_host(lib6809::BufferedHost::new());
    machine.cpu_mut().set_s(0x8000);
    assert_eq!(machine.run().unwrap(), RunOutcome::Terminated);
}
