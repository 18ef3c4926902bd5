//! Process-wide logging for the 6502 core.
//!
//! # Architecture
//!
//! - **LogConfig**: global configuration held in atomics, so the clock loop can
//!   check whether a message is wanted without taking a lock
//! - **LogLevel**: Off < Error < Warn < Info < Debug < Trace
//! - **LogCategory**: Cpu, Bus, Memory, Stubs
//! - **log()**: the single output path; messages are built lazily and rate
//!   limited per category
//!
//! File output goes through a background writer thread fed by a channel, so a
//! trace of every instruction does not stall the emulated clock on disk I/O.
//!
//! # Configuration
//!
//! Hosts call [`configure_from_env`] once at startup. Recognised variables:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `EMU6502_LOG` | global level |
//! | `EMU6502_LOG_CPU`, `EMU6502_LOG_BUS`, `EMU6502_LOG_MEMORY`, `EMU6502_LOG_STUBS` | category level |
//! | `EMU6502_LOG_RATE` | max messages per second per category |
//! | `EMU6502_LOG_FILE` | append messages to this file instead of stderr |
//!
//! # Usage
//!
//! ```rust
//! use emu_6502::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Cpu, LogLevel::Debug, || {
//!     format!("CPU: BRK at PC={:04X}", 0x1234)
//! });
//! ```

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

const CATEGORY_COUNT: usize = 4;
const DEFAULT_RATE_LIMIT: usize = 60;

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse a level name or digit (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Which part of the core emitted a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Instruction fetch/execute, reset, bus wiring
    Cpu,
    /// Bus construction and routing
    Bus,
    /// Memory backends
    Memory,
    /// Placeholder opcodes and other unemulated behavior
    Stubs,
}

impl LogCategory {
    pub const ALL: [LogCategory; CATEGORY_COUNT] = [
        LogCategory::Cpu,
        LogCategory::Bus,
        LogCategory::Memory,
        LogCategory::Stubs,
    ];

    fn index(self) -> usize {
        match self {
            LogCategory::Cpu => 0,
            LogCategory::Bus => 1,
            LogCategory::Memory => 2,
            LogCategory::Stubs => 3,
        }
    }

    fn env_var(self) -> &'static str {
        match self {
            LogCategory::Cpu => "EMU6502_LOG_CPU",
            LogCategory::Bus => "EMU6502_LOG_BUS",
            LogCategory::Memory => "EMU6502_LOG_MEMORY",
            LogCategory::Stubs => "EMU6502_LOG_STUBS",
        }
    }
}

/// Sliding one-second window per category
struct RateLimiter {
    max_logs_per_second: AtomicUsize,
    window_duration: Duration,
    state: Mutex<[WindowState; CATEGORY_COUNT]>,
}

#[derive(Default)]
struct WindowState {
    timestamps: VecDeque<Instant>,
    dropped: usize,
    last_drop_report: Option<Instant>,
}

impl RateLimiter {
    fn new(max_logs_per_second: usize) -> Self {
        Self {
            max_logs_per_second: AtomicUsize::new(max_logs_per_second),
            window_duration: Duration::from_secs(1),
            state: Mutex::new(Default::default()),
        }
    }

    fn set_max_logs_per_second(&self, max: usize) {
        self.max_logs_per_second.store(max, Ordering::Relaxed);
    }

    fn max_logs_per_second(&self) -> usize {
        self.max_logs_per_second.load(Ordering::Relaxed)
    }

    /// Returns (allowed, dropped_count) where dropped_count is Some(n) when a
    /// drop summary is due
    fn should_allow(&self, category: LogCategory) -> (bool, Option<usize>) {
        let now = Instant::now();
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let window = &mut state[category.index()];

        while let Some(&front) = window.timestamps.front() {
            if now.duration_since(front) > self.window_duration {
                window.timestamps.pop_front();
            } else {
                break;
            }
        }

        if window.timestamps.len() < self.max_logs_per_second() {
            window.timestamps.push_back(now);
            if window.dropped > 0 {
                let dropped = std::mem::take(&mut window.dropped);
                window.last_drop_report = Some(now);
                return (true, Some(dropped));
            }
            return (true, None);
        }

        window.dropped += 1;
        let report_due = match window.last_drop_report {
            None => true,
            Some(last) => now.duration_since(last) >= self.window_duration,
        };
        if report_due {
            let dropped = std::mem::take(&mut window.dropped);
            window.last_drop_report = Some(now);
            (false, Some(dropped))
        } else {
            (false, None)
        }
    }
}

/// Global logging configuration
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; CATEGORY_COUNT],
    log_sender: Mutex<Option<Sender<String>>>,
    file_logging_enabled: AtomicBool,
    rate_limiter: RateLimiter,
}

impl LogConfig {
    fn new() -> Self {
        Self {
            global_level: AtomicU8::new(LogLevel::Off as u8),
            category_levels: Default::default(),
            log_sender: Mutex::new(None),
            file_logging_enabled: AtomicBool::new(false),
            rate_limiter: RateLimiter::new(DEFAULT_RATE_LIMIT),
        }
    }

    /// The process-wide instance
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    pub fn global_level(&self) -> LogLevel {
        LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self, category: LogCategory) -> LogLevel {
        LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed))
    }

    /// A category level other than Off wins over the global level.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        if level == LogLevel::Off {
            return false;
        }
        match self.level(category) {
            LogLevel::Off => level <= self.global_level(),
            category_level => level <= category_level,
        }
    }

    /// Turn every level back to Off
    pub fn reset(&self) {
        self.set_global_level(LogLevel::Off);
        for category in LogCategory::ALL {
            self.set_level(category, LogLevel::Off);
        }
    }

    pub fn set_rate_limit(&self, max_logs_per_second: usize) {
        self.rate_limiter
            .set_max_logs_per_second(max_logs_per_second);
    }

    pub fn rate_limit(&self) -> usize {
        self.rate_limiter.max_logs_per_second()
    }

    /// Append log output to `path`, written by a background thread.
    ///
    /// Replaces any previous log file; the old writer thread exits once its
    /// sender is dropped.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                let mut file = file;
                while let Ok(message) = receiver.recv() {
                    let _ = writeln!(file, "{}", message);
                    let _ = file.flush();
                }
                let _ = file.flush();
            })?;

        *self.sender_slot() = Some(sender);
        self.file_logging_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop writing to the log file and fall back to stderr
    pub fn clear_log_file(&self) {
        *self.sender_slot() = None;
        self.file_logging_enabled.store(false, Ordering::Relaxed);
    }

    /// Apply settings from a variable lookup (see the module docs for names).
    ///
    /// Unparseable values are ignored and leave the current setting alone.
    pub fn apply_settings<F>(&self, lookup: F) -> std::io::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("EMU6502_LOG").as_deref().and_then(LogLevel::parse) {
            self.set_global_level(level);
        }
        for category in LogCategory::ALL {
            if let Some(level) = lookup(category.env_var())
                .as_deref()
                .and_then(LogLevel::parse)
            {
                self.set_level(category, level);
            }
        }
        if let Some(rate) = lookup("EMU6502_LOG_RATE").and_then(|v| v.trim().parse().ok()) {
            self.set_rate_limit(rate);
        }
        if let Some(path) = lookup("EMU6502_LOG_FILE").filter(|p| !p.is_empty()) {
            self.set_log_file(PathBuf::from(path))?;
        }
        Ok(())
    }

    fn sender_slot(&self) -> std::sync::MutexGuard<'_, Option<Sender<String>>> {
        match self.log_sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_message(&self, message: &str) {
        if self.file_logging_enabled.load(Ordering::Relaxed) {
            if let Some(sender) = self.sender_slot().as_ref() {
                if sender.send(message.to_string()).is_ok() {
                    return;
                }
            }
        }
        eprintln!("{}", message);
    }
}

/// Configure the global [`LogConfig`] from `EMU6502_LOG*` environment variables.
pub fn configure_from_env() -> std::io::Result<()> {
    LogConfig::global().apply_settings(|name| std::env::var(name).ok())
}

/// Log a message with the specified category and level
///
/// The closure only runs when the message passes both the level check and
/// the category's rate limit. When messages get dropped, a one-line summary
/// is emitted at most once per second.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if !config.should_log(category, level) {
        return;
    }

    let (allowed, dropped) = config.rate_limiter.should_allow(category);
    if let Some(count) = dropped.filter(|&n| n > 0) {
        config.write_message(&format!(
            "[{:?}] WARNING: Rate limit exceeded, {} log message(s) dropped in the last second",
            category, count
        ));
    }
    if allowed {
        config.write_message(&message_fn());
    }
}
