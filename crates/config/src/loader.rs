use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::StugaConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["stuga.toml", "stuga.yaml", "stuga.yml", "stuga.json"];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, config discovery only looks in
/// this directory (project-local and user-global paths are skipped).
/// Can be called multiple times (e.g. in tests) — each call replaces the
/// previous override.
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE.lock().unwrap() = Some(path);
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE.lock().unwrap() = None;
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE.lock().unwrap().clone()
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<StugaConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./stuga.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/stuga/stuga.{toml,yaml,yml,json}` (user-global)
///
/// Returns `StugaConfig::default()` if no config file is found.
pub fn discover_and_load() -> StugaConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, writing default config");
        let config = StugaConfig::default();
        if let Err(e) = write_default_config(&config) {
            warn!(error = %e, "failed to write default config file");
        }
        return config;
    }
    StugaConfig::default()
}

/// Find the first config file in standard locations.
///
/// When a config dir override is set, only that directory is searched —
/// project-local and user-global paths are skipped for isolation.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
        // Override is set — don't fall through to other locations.
        return None;
    }

    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/stuga/
    if let Some(dir) = home_dir().map(|h| h.join(".config").join("stuga")) {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the config directory: override, or `~/.config/stuga/` on all platforms.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return Some(dir);
    }
    home_dir().map(|h| h.join(".config").join("stuga"))
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stuga.toml")
}

/// Write the default config file to the user-global config path.
/// Only called when no config file exists yet.
fn write_default_config(config: &StugaConfig) -> anyhow::Result<()> {
    let path = find_or_default_config_path();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(&path, &toml_str)?;
    debug!(path = %path.display(), "wrote default config file");
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<StugaConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test drives the whole override cycle: the override is a process
    // global, so splitting these into separate #[test] fns would race.
    #[test]
    fn discovery_honors_override_dir() {
        let dir = tempfile::tempdir().unwrap();
        set_config_dir(dir.path().to_path_buf());

        // Empty override dir → defaults, and a default file gets written.
        let cfg = discover_and_load();
        assert_eq!(cfg.gateway.port, 3000);
        assert!(dir.path().join("stuga.toml").exists());

        std::fs::write(
            dir.path().join("stuga.toml"),
            "[gateway]\nport = 4100\n\n[rooms]\ndefaults = [\"general\", \"games\"]\n",
        )
        .unwrap();
        let cfg = discover_and_load();
        assert_eq!(cfg.gateway.port, 4100);
        assert_eq!(cfg.rooms.defaults, vec!["general", "games"]);

        // Broken file → warn and fall back to defaults.
        std::fs::write(dir.path().join("stuga.toml"), "not = [valid").unwrap();
        let cfg = discover_and_load();
        assert_eq!(cfg.gateway.port, 3000);

        // YAML is picked up once the TOML candidate is gone.
        std::fs::remove_file(dir.path().join("stuga.toml")).unwrap();
        std::fs::write(dir.path().join("stuga.yaml"), "gateway:\n  port: 4200\n").unwrap();
        let cfg = discover_and_load();
        assert_eq!(cfg.gateway.port, 4200);

        clear_config_dir();
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config(Path::new("/nonexistent/stuga.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
