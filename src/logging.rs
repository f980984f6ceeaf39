use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialise logging. With `debug` the default level is `debug` and
/// `RUST_LOG` may override it; otherwise the level is forced to `info`.
/// When `file` is given, output is mirrored to that file.
pub fn init(debug: bool, file: Option<PathBuf>) {
    // Without debug, `RUST_LOG` is ignored.
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let file_layer = file.and_then(|path| {
        let name = path.file_name()?.to_owned();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        if let Err(err) = std::fs::create_dir_all(&dir) {
            eprintln!("failed to create log folder {}: {err}", dir.display());
            return None;
        }
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
        let _ = FILE_GUARD.set(guard);
        Some(fmt::layer().with_writer(writer).with_ansi(false))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
}
