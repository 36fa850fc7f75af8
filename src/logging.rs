use cfg_if::cfg_if;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

/// Renderer crates are chatty at info; keep them to warnings unless RUST_LOG says otherwise.
const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        /// Browser console logging. Safe to call more than once.
        pub fn init() {
            let wasm_layer = tracing_wasm::WASMLayer::new(tracing_wasm::WASMLayerConfig::default());
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(wasm_layer)
                .try_init();

            #[cfg(feature = "console_error_panic_hook")]
            console_error_panic_hook::set_once();
        }
    } else {
        use std::path::{Path, PathBuf};

        use once_cell::sync::OnceCell;
        use tracing_appender::non_blocking::WorkerGuard;
        use tracing_subscriber::fmt;

        const DEFAULT_LOG_FILE: &str = "logs/abyss.log";

        static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

        /// Directory and file-name prefix for the daily rolling log.
        fn log_location(path: &str) -> (PathBuf, PathBuf) {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file = path.file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("abyss.log"));
            (dir.to_path_buf(), file)
        }

        fn log_panic(info: &std::panic::PanicHookInfo<'_>) {
            let payload = info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
                .unwrap_or("<non-string panic>");
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_default();
            let backtrace = std::backtrace::Backtrace::force_capture();
            tracing::error!(%location, "panic: {payload}\n{backtrace}");
        }

        /// Stderr plus a daily file under RUST_LOG_FILE (default logs/abyss.log).
        pub fn init() {
            let log_path = std::env::var("RUST_LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
            let (dir, file) = log_location(&log_path);
            let (file_writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file));

            let console_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .compact();
            let file_layer = fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact();

            if tracing_subscriber::registry()
                .with(env_filter())
                .with(console_layer)
                .with(file_layer)
                .try_init()
                .is_ok()
            {
                let _ = FILE_GUARD.set(guard);
                std::panic::set_hook(Box::new(log_panic));
            }
        }

        #[cfg(test)]
        mod tests {
            use super::*;

            #[test]
            fn bare_file_name_logs_to_cwd() {
                let (dir, file) = log_location("abyss.log");
                assert_eq!(dir, PathBuf::from("."));
                assert_eq!(file, PathBuf::from("abyss.log"));
            }

            #[test]
            fn nested_path_is_split() {
                let (dir, file) = log_location("var/log/game.log");
                assert_eq!(dir, PathBuf::from("var/log"));
                assert_eq!(file, PathBuf::from("game.log"));
            }
        }
    }
}
