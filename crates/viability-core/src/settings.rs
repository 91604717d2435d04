use clap::Parser;
use std::path::PathBuf;

/// Default directory holding `clientes.json` and `transacoes_*.json`.
pub const DEFAULT_DATA_DIR: &str = "dados_api";

/// Default lifetime of a cached load, in seconds (one hour).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Economic viability reports from raw transaction exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "viability-report",
    about = "Economic viability reports from raw transaction exports",
    version
)]
pub struct Settings {
    /// Directory containing clientes.json and transacoes_*.json
    #[arg(long, env = "VIABILITY_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Year to report on (defaults to the latest year found)
    #[arg(long)]
    pub year: Option<i32>,

    /// Output mode
    #[arg(long, default_value = "text", value_parser = ["text", "interactive"])]
    pub view: String,

    /// Display theme for the interactive view
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Seconds a loaded dataset stays cached (0-86400)
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS, value_parser = clap::value_parser!(u64).range(0..=86_400))]
    pub cache_ttl: u64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path (logs go to stderr when absent)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and resolve derived values.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`load`](Self::load) but from an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Settings::try_parse_from(args).map(Self::resolve)
    }

    /// `true` when the interactive terminal view was requested.
    pub fn is_interactive(&self) -> bool {
        self.view == "interactive"
    }

    /// Apply the `--debug` flag.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["viability-report"]);

        assert_eq!(settings.year, None);
        assert_eq!(settings.view, "text");
        assert_eq!(settings.theme, "auto");
        assert_eq!(settings.cache_ttl, 3600);
        assert_eq!(settings.log_level, "INFO");
        assert!(settings.log_file.is_none());
        assert!(!settings.debug);
        assert!(!settings.is_interactive());
    }

    #[test]
    fn test_settings_explicit_values() {
        let settings = Settings::load_from_args([
            "viability-report",
            "--data-dir",
            "/srv/exports",
            "--year",
            "2023",
            "--view",
            "interactive",
            "--theme",
            "dark",
            "--cache-ttl",
            "60",
        ])
        .unwrap();

        assert_eq!(settings.data_dir, PathBuf::from("/srv/exports"));
        assert_eq!(settings.year, Some(2023));
        assert!(settings.is_interactive());
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.cache_ttl, 60);
    }

    #[test]
    fn test_debug_flag_overrides_log_level() {
        let settings =
            Settings::load_from_args(["viability-report", "--log-level", "ERROR", "--debug"])
                .unwrap();
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_invalid_view_rejected() {
        let result = Settings::load_from_args(["viability-report", "--view", "pdf"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cache_ttl_out_of_range_rejected() {
        let result = Settings::load_from_args(["viability-report", "--cache-ttl", "999999"]);
        assert!(result.is_err());
    }
}
