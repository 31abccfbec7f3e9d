// End-to-end decoding of a captured blackbox dump against the mock platform's
// plugin data. The dump is stored as hexdump lines so it can be read and
// edited by hand.
use dpm_log_decoder::{
    get_reboot_cause, Adm1266, Adm1266PlatformSpec, DpmLogHistory, MemoryDevice, NvmemDevice,
    RebootCause, RECORD_SIZE,
};
use serde_json::Value;
use std::path::PathBuf;

struct Fixture {
    plugin: Value,
    blackbox: Vec<u8>,
    expected_records: Vec<Value>,
    expected_reboot_cause: Value,
}

fn parse_hexdump_lines(lines: &[Value]) -> Vec<u8> {
    lines
        .iter()
        .filter_map(Value::as_str)
        .flat_map(str::split_whitespace)
        .filter(|tok| tok.len() == 2 && tok.chars().all(|c| c.is_ascii_hexdigit()))
        .map(|tok| u8::from_str_radix(tok, 16).unwrap())
        .collect()
}

fn load_fixture() -> Fixture {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/adm1266_test_spec.json");
    let spec: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

    Fixture {
        plugin: spec["pddf_plugin"].clone(),
        blackbox: parse_hexdump_lines(spec["hexdump_lines"].as_array().unwrap()),
        expected_records: spec["expected_blackbox_records"].as_array().unwrap().clone(),
        expected_reboot_cause: spec["expected_reboot_cause"].clone(),
    }
}

fn mock_dpm(fixture: &Fixture) -> Adm1266 {
    let spec = Adm1266PlatformSpec::from_store("dpm-mock", &fixture.plugin).unwrap();
    Adm1266::new(spec, Box::new(MemoryDevice::new("dpm-mock", fixture.blackbox.clone())))
}

#[test]
fn test_read_blackbox() {
    let fixture = load_fixture();
    let adm = mock_dpm(&fixture);

    let data = adm.read_blackbox().unwrap();
    assert_eq!(data.len(), 276);
    assert_eq!(data, fixture.blackbox);
}

#[test]
fn test_parse_blackbox_drops_tail() {
    let fixture = load_fixture();
    let adm = mock_dpm(&fixture);

    let records = adm.parse_blackbox(&fixture.blackbox);
    assert_eq!(records.trailing_bytes(), fixture.blackbox.len() % RECORD_SIZE);

    let uids: Vec<u16> = records.map(|r| r.uid).collect();
    assert_eq!(uids, vec![0x10, 0x11, 0x12, 0x13]);
}

#[test]
fn test_get_blackbox_records_match_expectations() {
    let fixture = load_fixture();
    let adm = mock_dpm(&fixture);

    let records = adm.get_blackbox_records().unwrap();
    assert_eq!(records.len(), fixture.expected_records.len());

    for (i, (record, expected)) in records.iter().zip(&fixture.expected_records).enumerate() {
        let actual = serde_json::to_value(record).unwrap();
        for (key, value) in expected.as_object().unwrap() {
            assert_eq!(&actual[key], value, "[{}] {} mismatch", i, key);
        }
    }
}

#[test]
fn test_channels_rendered_with_rail_names() {
    let fixture = load_fixture();
    let records = mock_dpm(&fixture).get_blackbox_records().unwrap();

    assert_eq!(
        records[0].channels["gpio_in"],
        "GPIO1, GPIO2, GPIO3, GPIO6, GPIO7, GPIO8, GPIO9, 0b11000"
    );
    assert_eq!(records[0].channels["vp_uv"], "VP6 (POS0V75_S5)");
    assert_eq!(records[0].channels["pdio_in"], "PDIO1");
    assert_eq!(records[1].channels["vh_ov"], "VH5 (POS5V0_S0)");
    assert_eq!(records[1].channels["pdio_in"], "PDIO2, PDIO5");
}

#[test]
fn test_get_all_faults() {
    let fixture = load_fixture();
    let faults = mock_dpm(&fixture).get_all_faults().unwrap();

    assert_eq!(faults.len(), 4);
    for fault in &faults {
        assert_eq!(fault.dpm_name, "dpm-mock");
        assert!(fault.fault_uid.starts_with("0x"));
        assert_eq!(fault.raw_bytes().map(|b| b.len()), Some(RECORD_SIZE));
    }
    assert_eq!(faults[0].power_loss, "Yes");
    assert_eq!(faults[3].dpm_fault, "Watchdog timeout");
}

#[test]
fn test_clear_blackbox() {
    let fixture = load_fixture();
    let mut adm = mock_dpm(&fixture);

    assert!(!adm.read_blackbox().unwrap().is_empty());
    adm.clear_blackbox().unwrap();
    assert_eq!(adm.read_blackbox().unwrap(), b"1");
}

#[test]
fn test_nvmem_backed_reboot_cause() {
    let fixture = load_fixture();
    let dir = tempfile::tempdir().unwrap();
    let nvmem = dir.path().join("nvmem");
    std::fs::write(&nvmem, &fixture.blackbox).unwrap();

    let mut plugin = fixture.plugin.clone();
    plugin["DPM"]["dpm-mock"]["nvmem_path"] = Value::String(nvmem.display().to_string());

    let reason = get_reboot_cause(&plugin).unwrap().unwrap();
    assert_eq!(reason.cause, RebootCause::Watchdog);
    assert_eq!(
        reason.cause.to_string(),
        fixture.expected_reboot_cause["cause"].as_str().unwrap()
    );
    assert_eq!(
        reason.description,
        fixture.expected_reboot_cause["description"].as_str().unwrap()
    );

    // Once cleared, nothing is left to report
    let mut device = NvmemDevice::new(&nvmem);
    dpm_log_decoder::BlackboxDevice::clear_blackbox(&mut device).unwrap();
    assert!(get_reboot_cause(&plugin).unwrap().is_none());
}

#[test]
fn test_save_history_snapshot() {
    let fixture = load_fixture();
    let dir = tempfile::tempdir().unwrap();
    let history = DpmLogHistory::new(dir.path());

    let faults = mock_dpm(&fixture).get_all_faults().unwrap();
    let now = chrono::NaiveDate::from_ymd_opt(2025, 1, 15)
        .and_then(|d| d.and_hms_opt(10, 30, 45))
        .unwrap();
    history.save(faults.clone(), now).unwrap();

    let current = history.current().unwrap().unwrap();
    assert!(current.is_supported());
    assert_eq!(current.records_json, faults);
}
