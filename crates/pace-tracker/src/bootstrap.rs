use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directory name under the home directory for configuration and logs.
const APP_DIR: &str = ".pace-tracker";

/// Directory name the download step writes activities into.
const ACTIVITIES_DIR: &str = "activities";

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure `~/.pace-tracker/` and `~/.pace-tracker/logs/` exist.
pub fn ensure_directories() -> anyhow::Result<()> {
    let dir = app_dir();
    std::fs::create_dir_all(&dir)?;
    std::fs::create_dir_all(dir.join("logs"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map Python-style level names onto `tracing` filter directives.
///
/// Anything else is passed through untouched so `RUST_LOG`-style directives
/// such as `tracker_data=debug` keep working.
pub fn normalise_level(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr; when `log_file` is given, the same events are also
/// appended to that file without ANSI colours. Unrecognised levels fall back
/// to `info`.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(normalise_level(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

// ── Activities-directory discovery ─────────────────────────────────────────────

/// Pick the activities directory to scan.
///
/// An explicit path always wins, even if it does not exist (the scan then
/// reports it). Otherwise the first existing of `./activities` and
/// `~/.pace-tracker/activities` is used, falling back to `./activities`.
pub fn discover_activities_dir(explicit: Option<&Path>) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    discover_activities_dir_in(explicit, &cwd, dirs::home_dir().as_deref())
}

fn discover_activities_dir_in(
    explicit: Option<&Path>,
    cwd: &Path,
    home: Option<&Path>,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = cwd.join(ACTIVITIES_DIR);
    let candidates = [
        Some(local.clone()),
        home.map(|h| h.join(APP_DIR).join(ACTIVITIES_DIR)),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|p| p.is_dir())
        .unwrap_or(local)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // ── test_ensure_directories ───────────────────────────────────────────────

    #[test]
    fn test_ensure_directories() {
        let tmp = TempDir::new().expect("tempdir");

        // Override HOME so that dirs::home_dir() resolves to our temp dir.
        let original_home = std::env::var_os("HOME");
        std::env::set_var("HOME", tmp.path());

        let result = ensure_directories();

        match original_home {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }

        result.expect("ensure_directories should succeed");

        let dir = tmp.path().join(".pace-tracker");
        assert!(dir.is_dir(), ".pace-tracker dir must exist");
        assert!(dir.join("logs").is_dir(), "logs subdir must exist");
    }

    // ── normalise_level ───────────────────────────────────────────────────────

    #[test]
    fn test_normalise_level() {
        assert_eq!(normalise_level("DEBUG"), "debug");
        assert_eq!(normalise_level("warning"), "warn");
        assert_eq!(normalise_level("CRITICAL"), "error");
        assert_eq!(normalise_level("tracker_data=trace"), "tracker_data=trace");
    }

    // ── discover_activities_dir ───────────────────────────────────────────────

    #[test]
    fn test_discover_explicit_path_wins() {
        let tmp = TempDir::new().expect("tempdir");
        let explicit = Path::new("/data/garmin");
        let found = discover_activities_dir_in(Some(explicit), tmp.path(), Some(tmp.path()));
        assert_eq!(found, explicit);
    }

    #[test]
    fn test_discover_prefers_local_activities() {
        let tmp = TempDir::new().expect("tempdir");
        let cwd = tmp.path().join("project");
        let home = tmp.path().join("home");
        std::fs::create_dir_all(cwd.join("activities")).expect("create local");
        std::fs::create_dir_all(home.join(".pace-tracker").join("activities"))
            .expect("create home");

        let found = discover_activities_dir_in(None, &cwd, Some(&home));
        assert_eq!(found, cwd.join("activities"));
    }

    #[test]
    fn test_discover_falls_back_to_home() {
        let tmp = TempDir::new().expect("tempdir");
        let cwd = tmp.path().join("project");
        let home = tmp.path().join("home");
        let in_home = home.join(".pace-tracker").join("activities");
        std::fs::create_dir_all(&in_home).expect("create home");

        let found = discover_activities_dir_in(None, &cwd, Some(&home));
        assert_eq!(found, in_home);
    }

    #[test]
    fn test_discover_defaults_to_local_when_nothing_exists() {
        let tmp = TempDir::new().expect("tempdir");
        let found = discover_activities_dir_in(None, tmp.path(), None);
        assert_eq!(found, tmp.path().join("activities"));
    }
}
