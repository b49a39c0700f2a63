use std::any::Any;
use std::fs::OpenOptions;
use std::io::Write;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

pub const DEBUG_ENV: &str = "RYD_SYNC_DEBUG";
pub const DEBUG_LOG_ENV: &str = "RYD_SYNC_DEBUG_LOG";

/// Sink for failures caught at the hook boundary.
///
/// `tag` names the component that failed (`"coordinator"`, `"hooks"`, ...).
pub trait ErrorLog: Send + Sync {
    fn print_exception(&self, tag: &str, message: &str, cause: Option<&anyhow::Error>);

    fn print_debug(&self, tag: &str, message: &str) {
        debug_log(format!("[{tag}] {message}"));
    }
}

/// Default logger: `tracing` events plus the env-gated debug log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl ErrorLog for TracingLog {
    fn print_exception(&self, tag: &str, message: &str, cause: Option<&anyhow::Error>) {
        match cause {
            Some(err) => tracing::error!(component = tag, error = %format!("{err:#}"), "{message}"),
            None => tracing::error!(component = tag, "{message}"),
        }
        debug_log(match cause {
            Some(err) => format!("[{tag}] {message}: {err:#}"),
            None => format!("[{tag}] {message}"),
        });
    }

    fn print_debug(&self, tag: &str, message: &str) {
        tracing::debug!(component = tag, "{message}");
        debug_log(format!("[{tag}] {message}"));
    }
}

fn debug_enabled() -> bool {
    static FLAG: OnceCell<bool> = OnceCell::new();
    *FLAG.get_or_init(|| {
        std::env::var(DEBUG_ENV)
            .map(|val| parse_flag(&val))
            .unwrap_or(false)
    })
}

pub(crate) fn parse_flag(val: &str) -> bool {
    let trimmed = val.trim();
    !(trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("0")
        || trimmed.eq_ignore_ascii_case("false")
        || trimmed.eq_ignore_ascii_case("no")
        || trimmed.eq_ignore_ascii_case("off"))
}

fn debug_writer() -> Option<&'static Mutex<std::fs::File>> {
    static WRITER: OnceCell<Option<Mutex<std::fs::File>>> = OnceCell::new();
    WRITER
        .get_or_init(|| {
            std::env::var(DEBUG_LOG_ENV).ok().and_then(|path| {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map(Mutex::new)
                    .ok()
            })
        })
        .as_ref()
}

pub fn debug_log(message: impl AsRef<str>) {
    if !debug_enabled() {
        return;
    }
    if let Some(writer) = debug_writer() {
        let mut file = writer.lock();
        let _ = writeln!(file, "{}", message.as_ref());
        return;
    }
    eprintln!("{}", message.as_ref());
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
