use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use emu_6502::logging::{LogCategory, LogConfig, LogLevel};
use emu_6502::Bus;

fn temp_log_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("emu6502-{}-{}.log", name, std::process::id()))
}

fn wait_for_contents(path: &Path, needle: &str) -> String {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let text = fs::read_to_string(path).unwrap_or_default();
        if text.contains(needle) || Instant::now() > deadline {
            return text;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

// The global config is shared by every test in this binary, so everything
// that touches it lives in one test.
#[test]
fn settings_route_cpu_activity_to_file() {
    let path = temp_log_path("activity");
    let _ = fs::remove_file(&path);

    let path_str = path.to_string_lossy().into_owned();
    let vars: HashMap<&str, String> = [
        ("EMU6502_LOG_STUBS", "warn".to_string()),
        ("EMU6502_LOG_CPU", "trace".to_string()),
        ("EMU6502_LOG_RATE", "10000".to_string()),
        ("EMU6502_LOG_FILE", path_str),
    ]
    .into_iter()
    .collect();

    let config = LogConfig::global();
    config
        .apply_settings(|name| vars.get(name).cloned())
        .expect("log file opens");
    assert_eq!(config.level(LogCategory::Stubs), LogLevel::Warn);
    assert_eq!(config.level(LogCategory::Bus), LogLevel::Off);
    assert_eq!(config.rate_limit(), 10000);

    // $02 is undocumented, $EA is NOP
    let bus = Bus::new().unwrap();
    bus.load(0x0000, &[0x02, 0xEA]).unwrap();
    bus.step_instruction();
    bus.step_instruction();

    let text = wait_for_contents(&path, "NOP");
    config.clear_log_file();
    config.reset();
    let _ = fs::remove_file(&path);

    assert!(text.contains("unemulated opcode 02"), "log was: {text}");
    assert!(text.contains("0000  02  ???"), "log was: {text}");
    assert!(text.contains("0001  EA  NOP IMP"), "log was: {text}");
    // Bus stayed Off
    assert!(!text.contains("Bus:"), "log was: {text}");
}
