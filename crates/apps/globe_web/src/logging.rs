//! `tracing` output routed to the browser console.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsValue;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ConsoleSink {
    Error,
    Warn,
    Log,
    Debug,
}

impl ConsoleSink {
    fn for_level(level: Level) -> Self {
        match level {
            Level::ERROR => ConsoleSink::Error,
            Level::WARN => ConsoleSink::Warn,
            Level::INFO => ConsoleSink::Log,
            _ => ConsoleSink::Debug,
        }
    }
}

/// Buffers one formatted event and hands it to `console.*` on drop.
pub struct ConsoleWriter {
    sink: ConsoleSink,
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        let line = JsValue::from_str(text.trim_end());
        match self.sink {
            ConsoleSink::Error => web_sys::console::error_1(&line),
            ConsoleSink::Warn => web_sys::console::warn_1(&line),
            ConsoleSink::Log => web_sys::console::log_1(&line),
            ConsoleSink::Debug => web_sys::console::debug_1(&line),
        }
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            sink: ConsoleSink::Log,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            sink: ConsoleSink::for_level(*meta.level()),
            buf: Vec::new(),
        }
    }
}

fn filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Later calls (remounts) keep the first one.
pub fn init(directives: &str) {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(directives))
        .with_writer(ConsoleMakeWriter)
        .with_ansi(false)
        .without_time()
        .with_target(true)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(filter = directives, "console logging ready");
    }
}

#[cfg(test)]
mod tests {
    use super::ConsoleSink;
    use tracing::Level;

    #[test]
    fn levels_map_to_console_methods() {
        assert_eq!(ConsoleSink::for_level(Level::ERROR), ConsoleSink::Error);
        assert_eq!(ConsoleSink::for_level(Level::WARN), ConsoleSink::Warn);
        assert_eq!(ConsoleSink::for_level(Level::INFO), ConsoleSink::Log);
        assert_eq!(ConsoleSink::for_level(Level::TRACE), ConsoleSink::Debug);
    }
}
