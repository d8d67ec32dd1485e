//! Serial console logger.
//!
//! Routes the `log` facade to COM1 through a 16550 UART. Boot runs with
//! interrupts masked, so the port lock is never taken from an interrupt
//! handler.

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;
use uart_16550::SerialPort;

/// COM1 base address.
const COM1_BASE: u16 = 0x3F8;

static SERIAL1: Mutex<Option<SerialPort>> = Mutex::new(None);

static LOGGER: SerialLogger = SerialLogger;

struct SerialLogger;

struct SerialWriter<'a>(&'a mut SerialPort);

impl fmt::Write for SerialWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.0.send(byte);
        }
        Ok(())
    }
}

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let prefix = match record.level() {
            Level::Trace => "[TRACE]",
            Level::Debug => "[DEBUG]",
            Level::Info => "[INFO ]",
            Level::Warn => "[WARN ]",
            Level::Error => "[ERROR]",
        };
        if let Some(ref mut port) = *SERIAL1.lock() {
            // Nothing to report a console failure to.
            let _ = writeln!(SerialWriter(port), "{} {}", prefix, record.args());
        }
    }

    fn flush(&self) {}
}

/// Bring up COM1 and install it as the global logger.
///
/// Later calls only change the level.
pub fn init_logger(level: LevelFilter) {
    let mut slot = SERIAL1.lock();
    if slot.is_none() {
        // SAFETY: COM1 is a standard port and nothing else drives it.
        let mut port = unsafe { SerialPort::new(COM1_BASE) };
        port.init();
        *slot = Some(port);
    }
    drop(slot);

    log::set_max_level(level);
    if log::set_logger(&LOGGER).is_ok() {
        log::info!("[serial] logger on COM1");
    }
}
