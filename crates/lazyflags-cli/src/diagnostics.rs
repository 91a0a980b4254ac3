use std::backtrace::Backtrace;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::{error, info};

static HOOK_ONCE: Once = Once::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Optional log file for one run. When enabled, every `log` record at or
/// above the `RUST_LOG` filter (default `info`) lands in
/// `~/.config/lazyflags/diagnostics/<epoch_ms>.log`; otherwise logging stays
/// off so nothing competes with the terminal UI.
pub struct DiagnosticsSession {
    path: Option<PathBuf>,
}

impl DiagnosticsSession {
    pub fn initialize(enabled: bool) -> Result<Self> {
        install_panic_hook();
        if !enabled {
            return Ok(Self { path: None });
        }

        let diagnostics_dir = lazyflags_core::settings::resolve_settings_dir()
            .context("failed to resolve lazyflags settings directory for diagnostics")?
            .join("diagnostics");
        let path = start_log_file(&diagnostics_dir)?;

        info!(
            "lazyflags diagnostics start version={} pid={}",
            env!("CARGO_PKG_VERSION"),
            std::process::id()
        );
        info!("argv={:?}", std::env::args().collect::<Vec<String>>());

        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

fn start_log_file(diagnostics_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(diagnostics_dir).with_context(|| {
        format!(
            "failed to create diagnostics directory {}",
            diagnostics_dir.display()
        )
    })?;

    let path = diagnostics_dir.join(format!("{}.log", epoch_millis()));
    let file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to create diagnostics log at {}", path.display()))?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("failed to initialize diagnostics logger")?;

    let _ = LOG_PATH.set(path.clone());
    Ok(path)
}

fn install_panic_hook() {
    HOOK_ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|panic_info| {
            let payload = panic_payload(panic_info);
            let location = panic_info
                .location()
                .map(|value| format!("{}:{}:{}", value.file(), value.line(), value.column()))
                .unwrap_or_else(|| "unknown".to_string());
            let thread = std::thread::current()
                .name()
                .unwrap_or("unnamed")
                .to_string();

            error!("panic on thread {thread}: {payload}");
            error!("panic_location={location}");
            error!("panic_backtrace={:?}", Backtrace::force_capture());

            // Worker threads catch their own panics.
            if thread != "main" {
                return;
            }

            eprintln!("Fatal internal error in lazyflags.");
            match LOG_PATH.get() {
                Some(path) => eprintln!("Diagnostics written to {}", path.display()),
                None => eprintln!("Run `lazyflags --diagnostics` to capture a diagnostics log."),
            }
        }));
    });
}

fn panic_payload(panic_info: &std::panic::PanicHookInfo<'_>) -> String {
    if let Some(payload) = panic_info.payload().downcast_ref::<&str>() {
        return (*payload).to_string();
    }
    if let Some(payload) = panic_info.payload().downcast_ref::<String>() {
        return payload.clone();
    }
    "unknown panic payload".to_string()
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
