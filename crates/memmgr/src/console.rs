//! Log sink that writes records to stderr.
//!
//! The memory manager only emits records through the `log` facade. Hosts that want to see them
//! can install this console, or any other logger.

use std::io::Write;

use log::LevelFilter;
use spin::Once;

pub struct Console {
    level: LevelFilter,
}

static DEFAULT: Once<Console> = Once::new();

impl Console {
    /// Installs the console as the global logger, if no logger is installed yet.
    ///
    /// Debug builds log everything; release builds log `info` and above.
    pub fn init() -> &'static Self {
        let console = Self::default();
        console.install();
        console
    }

    pub fn default() -> &'static Self {
        DEFAULT.call_once(|| Console {
            #[cfg(debug_assertions)]
            level: LevelFilter::Trace,
            #[cfg(not(debug_assertions))]
            level: LevelFilter::Info,
        })
    }

    pub fn install(&'static self) {
        // Another logger winning the race is fine; records go there instead.
        if log::set_logger(self).is_ok() {
            log::set_max_level(self.level);
        }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

impl log::Log for Console {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        // Nowhere to report a failed write to stderr.
        let _ = write_log_entry_to(&mut stderr, record);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn write_log_entry_to(writer: &mut impl Write, record: &log::Record) -> std::io::Result<()> {
    #[cfg(feature = "detailed-logging")]
    return writeln!(
        writer,
        "[{} {}:{} {} {:?}] {}",
        record.level(),
        record.file().unwrap_or("unknown"),
        record.line().unwrap_or(0),
        record.target(),
        std::thread::current().id(),
        record.args()
    );
    #[cfg(not(feature = "detailed-logging"))]
    return writeln!(writer, "[{:5}] {}", record.level(), record.args());
}
