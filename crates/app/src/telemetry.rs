use metrics::describe_counter;
use metrics_exporter_prometheus::{
    BuildError as PrometheusBuildError, PrometheusBuilder, PrometheusHandle,
};
use std::{
    fmt as stdfmt, io,
    path::Path,
    sync::{Mutex, OnceLock},
    time::Instant,
};
use tracing_subscriber::{
    fmt::{self as tracing_fmt, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use category_actions_util::{AppConfig, Environment};

#[derive(Debug)]
pub enum TelemetryError {
    Tracing(tracing_subscriber::util::TryInitError),
    Metrics(PrometheusBuildError),
    MetricsFile(io::Error),
}

impl stdfmt::Display for TelemetryError {
    fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
        match self {
            Self::Tracing(err) => write!(f, "failed to initialize tracing: {err}"),
            Self::Metrics(err) => write!(f, "failed to initialize prometheus recorder: {err}"),
            Self::MetricsFile(err) => write!(f, "failed to write metrics file: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {}

impl From<tracing_subscriber::util::TryInitError> for TelemetryError {
    fn from(value: tracing_subscriber::util::TryInitError) -> Self {
        Self::Tracing(value)
    }
}

impl From<PrometheusBuildError> for TelemetryError {
    fn from(value: PrometheusBuildError) -> Self {
        Self::Metrics(value)
    }
}

impl From<io::Error> for TelemetryError {
    fn from(value: io::Error) -> Self {
        Self::MetricsFile(value)
    }
}

static TRACING_INIT: OnceLock<()> = OnceLock::new();
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static METRICS_INSTALL_GUARD: OnceLock<Mutex<()>> = OnceLock::new();
static START_TIME: OnceLock<Instant> = OnceLock::new();

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

fn build_git_sha() -> &'static str {
    option_env!("GIT_SHA").unwrap_or("unknown")
}

/// Installs the global subscriber. Output goes to stderr; stdout carries actions.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryError> {
    if TRACING_INIT.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match config.environment {
        Environment::Development | Environment::Test => {
            let fmt_layer = tracing_fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_timer(UtcTime::rfc_3339())
                .event_format(tracing_fmt::format().pretty());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        Environment::Production => {
            let fmt_layer = tracing_fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_timer(UtcTime::rfc_3339())
                .json();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    TRACING_INIT.set(()).ok();
    tracing::info!(stage = "telemetry", env = %config.environment.as_str(), version = BUILD_VERSION, git_sha = build_git_sha(), "tracing initialized");
    Ok(())
}

/// Installs the Prometheus recorder without an HTTP listener.
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let guard = METRICS_INSTALL_GUARD
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(handle) = METRICS_HANDLE.get() {
        drop(guard);
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    METRICS_HANDLE.set(handle.clone()).ok();
    drop(guard);

    describe_counter!(
        "category_actions_total",
        "Count of category actions emitted, labelled by action type"
    );
    describe_counter!(
        "category_intents_rejected_total",
        "Count of input lines that could not be decoded into a category intent"
    );
    START_TIME.get_or_init(Instant::now);

    Ok(handle)
}

pub fn render_metrics(handle: &PrometheusHandle) -> String {
    let mut body = handle.render();
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }

    body.push_str("# TYPE app_build_info gauge\n");
    body.push_str(&format!(
        "app_build_info{{version=\"{}\",git=\"{}\"}} 1\n",
        BUILD_VERSION,
        build_git_sha()
    ));

    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs_f64())
        .unwrap_or_default();
    body.push_str("# TYPE app_uptime_seconds gauge\n");
    body.push_str(&format!("app_uptime_seconds {}\n", uptime));

    body
}

/// Writes the rendered metrics to `path` for a textfile collector.
///
/// The body is written to a sibling temp file first and renamed into place so
/// collectors never observe a partial exposition.
pub fn write_metrics_file(handle: &PrometheusHandle, path: &Path) -> Result<(), TelemetryError> {
    let body = render_metrics(handle);
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");

    std::fs::write(&staging, body)?;
    std::fs::rename(&staging, path)?;
    tracing::info!(stage = "telemetry", path = %path.display(), "metrics written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_file_contains_build_info_and_counters() {
        let handle = init_metrics().expect("recorder installs once");
        metrics::counter!("category_actions_total", "type" => "CATEGORY_RESET").increment(1);

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("categories.prom");
        write_metrics_file(&handle, &path).expect("metrics file written");

        let body = std::fs::read_to_string(&path).expect("metrics file readable");
        assert!(body.contains("app_build_info{version=\""));
        assert!(body.contains("app_uptime_seconds"));
        assert!(body.contains("category_actions_total"));
        assert!(!dir.path().join("categories.prom.tmp").exists());
    }

    #[test]
    fn metrics_file_errors_surface_as_telemetry_errors() {
        let handle = init_metrics().expect("recorder installs once");
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing").join("categories.prom");

        let err = write_metrics_file(&handle, &path).expect_err("parent directory is missing");
        assert!(matches!(err, TelemetryError::MetricsFile(_)));
        assert!(err.to_string().starts_with("failed to write metrics file"));
    }

    #[test]
    fn init_metrics_is_idempotent() {
        let first = init_metrics().expect("first install");
        let second = init_metrics().expect("second install reuses handle");
        metrics::counter!("category_intents_rejected_total").increment(1);
        assert!(render_metrics(&first).contains("category_intents_rejected_total"));
        assert!(render_metrics(&second).contains("category_intents_rejected_total"));
    }
}
