#![no_main]
use libfuzzer_sys::fuzz_target;
use telemetry_dump::capture;

fuzz_target!(|data: &[u8]| {
    let mut lines = capture::LineReader::new(std::io::Cursor::new(data));
    let mut writer = capture::record_writer_builder().from_writer(Vec::new());
    let summary = capture::capture(&mut lines, &mut writer, |record| {
        assert!(!record.starts_with(telemetry_dump::protocol::ECHO_PREFIX));
    })
    .expect("writing to a Vec can't fail");
    assert!(summary.header.is_some() || summary.rows == 0);
});
