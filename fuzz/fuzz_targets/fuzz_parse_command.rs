#![no_main]
use libfuzzer_sys::fuzz_target;
use std::str::FromStr;

fuzz_target!(|data: &[u8]| {
    let Ok(str) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(command) = telemetry_dump::protocol::Command::from_str(str) {
        assert_eq!(
            telemetry_dump::protocol::Command::from_str(&command.to_wire()),
            Ok(command)
        );
    }
});
