use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing_subscriber::{Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Logging setup requested by the application (usually from its config file).
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// `None` picks INFO in debug builds and WARN in release builds.
    pub level: Option<LevelFilter>,
    pub console: bool,
    pub file: bool,
    /// `None` uses [`default_log_dir`].
    pub directory: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: None,
            console: true,
            file: true,
            directory: None,
        }
    }
}

impl LoggingOptions {
    /// Parses a level name (`"debug"`, `"WARN"`, `"off"`, ...).
    pub fn parse_level(name: &str) -> Option<LevelFilter> {
        name.trim().parse().ok()
    }

    pub fn effective_level(&self) -> LevelFilter {
        self.level.unwrap_or(default_level())
    }
}

#[cfg(debug_assertions)]
fn default_level() -> LevelFilter {
    LevelFilter::INFO
}

#[cfg(not(debug_assertions))]
fn default_level() -> LevelFilter {
    LevelFilter::WARN
}

/// Application infrastructure context.
///
/// Contains version info and logging infrastructure.
pub struct AppContext {
    app_id: &'static str,
    pub version: &'static str,
    log_file: Option<PathBuf>,
    /// The log guard must be kept alive for the duration of the application
    /// to ensure log messages are properly flushed.
    _log_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl AppContext {
    pub fn app_id(&self) -> &str {
        self.app_id
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    /// Path of the current log file, if file logging is enabled.
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Application metadata trait.
///
/// Define your application's identity by implementing this trait.
/// This is a pure marker trait - no logic, just constants.
pub trait Application: Sized + 'static {
    const APP_ID: &'static str;
    const STUDIO: &'static str = "chicken105";
    const PROJECT_ID: &'static str = "forge_of_stories";
}

/// `<local data dir>/<studio>/<project>/<app>/logs`; in debug builds the
/// workspace-local `.out` directory is used instead.
pub fn default_log_dir<A: Application>() -> Option<PathBuf> {
    #[cfg(debug_assertions)]
    let base = Some(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..").join(".out"));
    #[cfg(not(debug_assertions))]
    let base = dirs::data_local_dir();

    base.map(|base| base.join(A::STUDIO).join(A::PROJECT_ID).join(A::APP_ID).join("logs"))
}

/// `<app_id>.<timestamp>.log`
pub fn log_file_name<A: Application>() -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    format!("{}.{}.log", A::APP_ID, timestamp)
}

/// Builder for creating applications with proper initialization.
pub struct AppBuilder<A: Application> {
    context: AppContext,
    _marker: PhantomData<A>,
}

impl<A: Application> AppBuilder<A> {
    /// Create a new application builder.
    ///
    /// This performs all the common initialization:
    /// - Resolves and creates the log directory
    /// - Initializes logging (file + console)
    ///
    /// Fails if a global subscriber is already installed.
    pub fn new(version: &'static str, options: LoggingOptions) -> Result<Self, BoxError> {
        let level = options.effective_level();

        let mut log_file = None;
        let mut guard = None;
        let file_layer = if options.file {
            let dir = options
                .directory
                .clone()
                .or_else(default_log_dir::<A>)
                .ok_or("no local data directory available for log files")?;
            fs::create_dir_all(&dir)?;
            let name = log_file_name::<A>();
            let file_appender = tracing_appender::rolling::never(&dir, &name);
            let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
            log_file = Some(dir.join(name));
            guard = Some(worker_guard);

            Some(
                fmt::Layer::default()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(non_blocking)
                    .with_filter(level),
            )
        } else {
            None
        };

        let console_layer = options
            .console
            .then(|| fmt::Layer::default().with_target(false).with_filter(level));

        tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer)
            .with(tracing_error::ErrorLayer::default())
            .try_init()?;

        tracing::debug!(app = A::APP_ID, version, ?level, log_file = ?log_file, "logging initialised");

        Ok(Self {
            context: AppContext {
                app_id: A::APP_ID,
                version,
                log_file,
                _log_guard: guard,
            },
            _marker: PhantomData,
        })
    }

    /// Build a simple application.
    pub fn build_simple(self) -> AppContext {
        self.context
    }
}
