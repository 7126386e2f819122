use std::collections::HashSet;
use std::time::{Duration, Instant};

use blelogger_core::config::DeviceConfig;
use blelogger_core::datalog::INFO_FILE_NAME;
use blelogger_core::device::{Device, DeviceContext, DeviceError};
use blelogger_core::link::MemoryLink;
use blelogger_core::protocol::frame::{split_fields, TAG_FILES, TAG_INFO};
use blelogger_core::protocol::{Command, MAX_COMMAND_LEN};
use blelogger_core::sensor::{FixedBattery, ScriptedSensor};
use blelogger_core::storage::{MemStorage, Storage};
use blelogger_core::time::{CalendarTime, ManualClock};
use pretty_assertions::assert_eq;

type TestDevice = Device<ManualClock, MemStorage, MemoryLink, ScriptedSensor, FixedBattery>;

const MARCH_7: CalendarTime = CalendarTime::new(2024, 3, 7, 10, 0, 0);

fn device_with(storage: MemStorage) -> TestDevice {
    let ctx = DeviceContext::new(
        ManualClock::new(MARCH_7),
        storage,
        MemoryLink::connected(),
        ScriptedSensor::new(100..200),
        FixedBattery(3.7),
    );
    let config = DeviceConfig {
        sample_interval_ms: 0,
        ..DeviceConfig::default()
    };
    Device::initialize(ctx, &config).unwrap()
}

fn device() -> TestDevice {
    device_with(MemStorage::default())
}

/// Send a request and run ticks until it is served
fn request(device: &mut TestDevice, text: &str) -> String {
    device.context_mut().radio.push_inbound(text);
    let report = device.tick().unwrap();
    assert!(report.command.is_some(), "no command served for {:?}", text);
    String::from_utf8(device.context_mut().radio.take_sent()).unwrap()
}

#[test]
fn test_info_request_has_four_fields() {
    let mut device = device();
    let response = request(&mut device, "REQ+DATA");

    assert!(response.starts_with("%INFO%&"));
    assert!(response.ends_with("%END%"));
    let fields = split_fields(&response, TAG_INFO).unwrap();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[0], "3/7/2024");
    assert_eq!(fields[1], "3.70");

    let ctx = device.context();
    let accounting = device.accounting();
    assert_eq!(
        fields[2],
        accounting.current_storage_kb(&ctx.storage).unwrap().to_string()
    );
    assert_eq!(fields[3], accounting.max_storage_kb().to_string());
}

#[test]
fn test_info_request_without_info_file() {
    let mut device = device();
    device.context_mut().storage.remove(INFO_FILE_NAME).unwrap();

    let response = request(&mut device, "REQ+DATA");
    let fields = split_fields(&response, TAG_INFO).unwrap();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[0], "");
}

#[test]
fn test_info_request_with_single_open_file() {
    let mut device = device_with(MemStorage::default().with_max_open_files(1));
    device.tick().unwrap();

    let response = request(&mut device, "REQ+DATA");
    let fields = split_fields(&response, TAG_INFO).unwrap();
    assert_eq!(fields[0], "3/7/2024");

    // The log file is held again and the write counter kept its place.
    assert!(device.context().storage.is_open("03072024.txt"));
    assert_eq!(device.context().storage.open_handles(), 1);
    assert!(device.tick().unwrap().record.is_some());
    assert_eq!(device.logger().stats().records_since_rotation, 3);
}

#[test]
fn test_unknown_command_echo() {
    let mut device = device();
    assert_eq!(request(&mut device, "HELLO WORLD"), "%BADCMD%&HELLO WORLD&%END%");
    assert_eq!(request(&mut device, "REQ+FILE"), "%BADCMD%&REQ+FILE&%END%");
    assert_eq!(request(&mut device, "REQ+DATA2"), "%BADCMD%&REQ+DATA2&%END%");
}

#[test]
fn test_download_lists_every_file_but_info() {
    let mut storage = MemStorage::default();
    storage.insert("notes.txt", "hello");
    let mut device = device_with(storage);

    // Four days of logging, one rotation per day.
    for day in 7..11 {
        device
            .context()
            .clock
            .set(CalendarTime::new(2024, 3, day, 12, 0, 0));
        for _ in 0..10 {
            device.tick().unwrap();
        }
    }

    let response = request(&mut device, "REQ+DOWNLOAD");
    let names = split_fields(&response, TAG_FILES).unwrap();
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(unique.len(), names.len(), "duplicate names in {}", response);
    assert!(!unique.contains(INFO_FILE_NAME));

    let expected: HashSet<String> = device
        .context()
        .storage
        .entries()
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .filter(|n| n != INFO_FILE_NAME)
        .collect();
    let listed: HashSet<String> = unique.into_iter().map(str::to_string).collect();
    assert_eq!(listed, expected);
    // Each rotation opens a file named for the day it happened on.
    for name in ["03072024.txt", "03082024.txt", "03092024.txt", "03102024.txt"] {
        assert!(listed.contains(name), "{} missing from {}", name, response);
    }
    assert!(listed.contains("notes.txt"));
}

#[test]
fn test_download_on_fresh_card() {
    let mut device = device();
    // Only the info file and today's log exist.
    let response = request(&mut device, "REQ+DOWNLOAD");
    assert_eq!(response, "%FILES%&03072024.txt&%END%");
}

#[test]
fn test_file_request_for_active_file() {
    let mut device = device_with(MemStorage::default().with_max_open_files(1));
    for _ in 0..3 {
        device.tick().unwrap();
    }

    let response = request(&mut device, "REQ+FILE&03072024.txt");
    // The tick that served the request logged first, so four records.
    let snapshot = device
        .context()
        .storage
        .contents_str("03072024.txt")
        .unwrap();
    assert_eq!(snapshot.matches("Sharp Sensor Value").count(), 4);
    assert_eq!(
        response,
        format!("%FILEDL%&03072024.txt&{}&%END%", snapshot)
    );

    // Logging carries on in the same file without losing its place.
    assert!(device.context().storage.is_open("03072024.txt"));
    let report = device.tick().unwrap();
    assert!(report.record.is_some());
    assert_eq!(device.logger().stats().records_since_rotation, 5);
}

#[test]
fn test_file_request_missing_file() {
    let mut device = device();
    assert_eq!(
        request(&mut device, "REQ+FILE&01011999.txt"),
        "%FILEERR%&01011999.txt&%END%"
    );
    // The logger got its file back.
    assert_eq!(device.logger().active_file_name(), Some("03072024.txt"));
    assert!(device.tick().unwrap().record.is_some());
}

#[test]
fn test_file_request_rejects_paths() {
    let mut device = device();
    assert_eq!(
        request(&mut device, "REQ+FILE&../secret"),
        "%FILEERR%&../secret&%END%"
    );
}

#[test]
fn test_one_command_per_tick() {
    let mut device = device();
    device
        .context_mut()
        .radio
        .push_inbound("REQ+DATA\nREQ+DOWNLOAD\n");

    let first = device.tick().unwrap();
    assert_eq!(first.command, Some(Command::InfoRequest));
    let second = device.tick().unwrap();
    assert_eq!(second.command, Some(Command::DownloadRequest));
    let third = device.tick().unwrap();
    assert_eq!(third.command, None);
    assert_eq!(device.engine().commands_handled(), 2);
}

#[test]
fn test_oversized_input_is_echoed_in_bounded_pieces() {
    let mut device = device();
    device
        .context_mut()
        .radio
        .push_inbound(format!("REQ+DATA\n{}", "x".repeat(10_000)));

    assert_eq!(device.tick().unwrap().command, Some(Command::InfoRequest));
    device.context_mut().radio.take_sent();

    let report = device.tick().unwrap();
    assert!(matches!(report.command, Some(Command::Unknown(ref text)) if text.len() == MAX_COMMAND_LEN));
    assert_eq!(
        device.context().radio.sent_str(),
        format!("%BADCMD%&{}&%END%", "x".repeat(MAX_COMMAND_LEN))
    );
    assert!(device.context().radio.inbound_len() > 0);
}

#[test]
fn test_disconnected_peer_is_ignored() {
    let mut device = device();
    device.context_mut().radio.set_connected(false);
    device.context_mut().radio.push_inbound("REQ+DATA");

    let report = device.tick().unwrap();
    assert!(report.record.is_some());
    assert!(report.command.is_none());
    assert!(device.context().radio.sent().is_empty());
    assert!(!device.is_connected());
}

#[test]
fn test_disconnect_discards_partial_command() {
    let mut device = device();
    device
        .context_mut()
        .radio
        .push_inbound("REQ+DATA\nREQ+DOWN");
    assert_eq!(device.tick().unwrap().command, Some(Command::InfoRequest));

    device.context_mut().radio.set_connected(false);
    device.tick().unwrap();

    device.context_mut().radio.set_connected(true);
    device.context_mut().radio.take_sent();
    device.context_mut().radio.push_inbound("REQ+DOWNLOAD");
    assert_eq!(device.tick().unwrap().command, Some(Command::DownloadRequest));
}

#[test]
fn test_file_request_with_medium_removed_is_fatal() {
    let ctx = DeviceContext::new(
        ManualClock::new(MARCH_7),
        MemStorage::default(),
        MemoryLink::connected(),
        ScriptedSensor::constant(1),
        FixedBattery(3.7),
    );
    let config = DeviceConfig {
        sample_interval_ms: 1000,
        ..DeviceConfig::default()
    };
    let mut device = Device::initialize(ctx, &config).unwrap();
    let start = Instant::now();
    assert!(device.tick_at(start).unwrap().record.is_some());

    // No sample is due on the next tick, so only the request runs.
    device.context_mut().storage.set_present(false);
    device
        .context_mut()
        .radio
        .push_inbound("REQ+FILE&03072024.txt");

    match device.tick_at(start + Duration::from_millis(10)) {
        Err(DeviceError::Protocol(e)) => assert!(e.is_fatal()),
        other => panic!("Expected fatal protocol error, got {:?}", other),
    }
}
