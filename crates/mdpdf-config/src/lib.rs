//! Configuration management for mdpdf.
//!
//! Parses `mdpdf.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `renderer.command`
//! - `pdf.command`
//! - `pdf.options`
//! - `workspace.root`
//! - `cache.dir`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Override workspace root.
    pub workspace_root: Option<PathBuf>,
    /// Override renderer timeout in seconds.
    pub renderer_timeout_secs: Option<u64>,
    /// Override number of render workers.
    pub workers: Option<usize>,
    /// Override PDF engine name.
    pub engine: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdpdf.toml";

/// Project directory holding mdpdf data, relative to the config file.
const PROJECT_DIR: &str = ".mdpdf";

/// Image formats the renderer may be asked for.
const FORMATS: &[&str] = &["svg", "png", "pdf"];

/// Upper bound for `renderer.workers`.
const MAX_WORKERS: usize = 64;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Diagram renderer configuration.
    pub renderer: RendererConfig,
    /// PDF engine configuration.
    pub pdf: PdfConfig,
    /// Document limits.
    pub document: DocumentConfig,
    /// Workspace configuration (paths are strings from TOML).
    workspace: WorkspaceConfigRaw,
    /// Cache configuration (paths are strings from TOML).
    cache: CacheConfigRaw,

    /// Resolved workspace configuration (set after loading).
    #[serde(skip)]
    pub workspace_resolved: WorkspaceConfig,
    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Diagram renderer configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Program and arguments; `{input}` and `{output}` are substituted.
    pub command: Vec<String>,
    /// Output image format: `svg`, `png` or `pdf`.
    pub format: String,
    /// Per-diagram time budget in seconds.
    pub timeout_secs: u64,
    /// Extra string mixed into fingerprints, e.g. the renderer version.
    pub version: String,
    /// Parallel render workers. Defaults to available parallelism.
    pub workers: Option<usize>,
    /// Retries after a failed spawn.
    pub spawn_retries: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: strings(&["mmdc", "-i", "{input}", "-o", "{output}"]),
            format: "svg".to_owned(),
            timeout_secs: 60,
            version: String::new(),
            workers: None,
            spawn_retries: 2,
        }
    }
}

impl RendererConfig {
    /// Per-diagram time budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Identity string for fingerprints: the command line plus `version`.
    ///
    /// Changing either invalidates previously cached artifacts.
    #[must_use]
    pub fn identity(&self) -> String {
        let command = self.command.join(" ");
        if self.version.is_empty() {
            command
        } else {
            format!("{command} {}", self.version)
        }
    }
}

/// PDF engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Program and arguments; `{input}`, `{output}` and `{engine}` are
    /// substituted.
    pub command: Vec<String>,
    /// Engine name substituted for `{engine}`.
    pub engine: String,
    /// Options appended to the command.
    pub options: Vec<String>,
    /// Time budget in seconds.
    pub timeout_secs: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            command: strings(&[
                "pandoc",
                "{input}",
                "-o",
                "{output}",
                "--pdf-engine={engine}",
                "--standalone",
            ]),
            engine: "xelatex".to_owned(),
            options: strings(&[
                "-V",
                "geometry:margin=1in",
                "-V",
                "documentclass:article",
                "-V",
                "papersize:a4",
            ]),
            timeout_secs: 300,
        }
    }
}

impl PdfConfig {
    /// Time budget for one generation.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Document limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Maximum input size in bytes.
    pub max_size: u64,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_size: 10 * 1024 * 1024,
        }
    }
}

/// Raw workspace configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WorkspaceConfigRaw {
    root: Option<String>,
}

/// Resolved workspace configuration.
#[derive(Debug, Default)]
pub struct WorkspaceConfig {
    /// Directory run workspaces are created in; system temp dir when `None`.
    pub root: Option<PathBuf>,
}

/// Raw cache configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    dir: Option<String>,
    max_entries: Option<usize>,
}

/// Resolved cache configuration with absolute paths.
#[derive(Debug, Default)]
pub struct CacheConfig {
    /// Whether rendered diagrams are cached across runs.
    pub enabled: bool,
    /// Cache directory.
    pub dir: PathBuf,
    /// Maximum number of cached diagrams.
    ///
    /// `None` means unbounded: the cache grows with every distinct diagram
    /// until `mdpdf cache clear` is run.
    pub max_entries: Option<usize>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`cache.dir`").
        field: String,
        /// Error message (e.g., "${`MDPDF_CACHE`} not set").
        message: String,
    },
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a command with a program and the given placeholders.
fn require_command(command: &[String], field: &str, placeholders: &[&str]) -> Result<(), ConfigError> {
    let Some(program) = command.first() else {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    };
    require_non_empty(program, field)?;

    for placeholder in placeholders {
        let needle = format!("{{{placeholder}}}");
        if !command[1..].iter().any(|arg| arg.contains(&needle)) {
            return Err(ConfigError::Validation(format!(
                "{field} must reference {needle}"
            )));
        }
    }
    Ok(())
}

/// Require a timeout to be positive.
fn require_positive(value: u64, field: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdpdf.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The result is
    /// validated again so overrides obey the same rules.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(cache_enabled) = settings.cache_enabled {
            self.cache_resolved.enabled = cache_enabled;
        }
        if let Some(cache_dir) = &settings.cache_dir {
            self.cache_resolved.dir.clone_from(cache_dir);
        }
        if let Some(root) = &settings.workspace_root {
            self.workspace_resolved.root = Some(root.clone());
        }
        if let Some(timeout) = settings.renderer_timeout_secs {
            self.renderer.timeout_secs = timeout;
        }
        if let Some(workers) = settings.workers {
            self.renderer.workers = Some(workers);
        }
        if let Some(engine) = &settings.engine {
            self.pdf.engine.clone_from(engine);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            renderer: RendererConfig::default(),
            pdf: PdfConfig::default(),
            document: DocumentConfig::default(),
            workspace: WorkspaceConfigRaw::default(),
            cache: CacheConfigRaw::default(),
            workspace_resolved: WorkspaceConfig::default(),
            cache_resolved: CacheConfig {
                enabled: true,
                dir: base.join(PROJECT_DIR).join("cache"),
                max_entries: None,
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading and resolution
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Checks that all required fields are properly set and contain valid values.
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_renderer()?;
        self.validate_pdf()?;
        self.validate_limits()?;
        Ok(())
    }

    /// Validate renderer configuration.
    fn validate_renderer(&self) -> Result<(), ConfigError> {
        let renderer = &self.renderer;
        require_command(&renderer.command, "renderer.command", &["input", "output"])?;
        require_positive(renderer.timeout_secs, "renderer.timeout_secs")?;

        if !FORMATS.contains(&renderer.format.as_str()) {
            return Err(ConfigError::Validation(format!(
                "renderer.format must be one of {}, got `{}`",
                FORMATS.join(", "),
                renderer.format
            )));
        }

        if let Some(workers) = renderer.workers
            && !(1..=MAX_WORKERS).contains(&workers)
        {
            return Err(ConfigError::Validation(format!(
                "renderer.workers must be between 1 and {MAX_WORKERS}"
            )));
        }

        Ok(())
    }

    /// Validate PDF engine configuration.
    fn validate_pdf(&self) -> Result<(), ConfigError> {
        require_command(&self.pdf.command, "pdf.command", &["input", "output"])?;
        require_non_empty(&self.pdf.engine, "pdf.engine")?;
        require_positive(self.pdf.timeout_secs, "pdf.timeout_secs")?;
        Ok(())
    }

    /// Validate size and count limits.
    fn validate_limits(&self) -> Result<(), ConfigError> {
        require_positive(self.document.max_size, "document.max_size")?;
        if self.cache_resolved.max_entries == Some(0) {
            return Err(ConfigError::Validation(
                "cache.max_entries must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        for arg in &mut self.renderer.command {
            *arg = expand::expand_env(arg, "renderer.command")?;
        }
        for arg in &mut self.pdf.command {
            *arg = expand::expand_env(arg, "pdf.command")?;
        }
        for option in &mut self.pdf.options {
            *option = expand::expand_env(option, "pdf.options")?;
        }

        if let Some(ref root) = self.workspace.root {
            self.workspace.root = Some(expand::expand_env(root, "workspace.root")?);
        }
        if let Some(ref dir) = self.cache.dir {
            self.cache.dir = Some(expand::expand_env(dir, "cache.dir")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.workspace_resolved = WorkspaceConfig {
            root: self.workspace.root.as_deref().map(|root| config_dir.join(root)),
        };

        let default_dir = config_dir.join(PROJECT_DIR).join("cache");
        self.cache_resolved = CacheConfig {
            enabled: self.cache.enabled.unwrap_or(true),
            dir: self
                .cache
                .dir
                .as_deref()
                .map_or(default_dir, |dir| config_dir.join(dir)),
            max_entries: self.cache.max_entries,
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(
            config.renderer.command,
            vec!["mmdc", "-i", "{input}", "-o", "{output}"]
        );
        assert_eq!(config.renderer.format, "svg");
        assert_eq!(config.renderer.timeout(), Duration::from_secs(60));
        assert_eq!(config.renderer.spawn_retries, 2);
        assert_eq!(config.pdf.engine, "xelatex");
        assert_eq!(config.pdf.timeout(), Duration::from_secs(300));
        assert_eq!(
            config.cache_resolved.dir,
            PathBuf::from("/test/.mdpdf/cache")
        );
        assert!(config.cache_resolved.enabled);
        assert!(config.cache_resolved.max_entries.is_none());
        assert!(config.workspace_resolved.root.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.renderer.format, "svg");
        assert_eq!(config.document.max_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_parse_renderer_config() {
        let toml = r#"
[renderer]
command = ["npx", "mmdc", "-i", "{input}", "-o", "{output}", "-b", "transparent"]
format = "png"
timeout_secs = 15
version = "11.4.0"
workers = 2
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.renderer.command.len(), 8);
        assert_eq!(config.renderer.format, "png");
        assert_eq!(config.renderer.timeout(), Duration::from_secs(15));
        assert_eq!(config.renderer.workers, Some(2));
        assert_eq!(config.renderer.spawn_retries, 2);
        assert_eq!(
            config.renderer.identity(),
            "npx mmdc -i {input} -o {output} -b transparent 11.4.0"
        );
    }

    #[test]
    fn test_parse_pdf_config() {
        let toml = r#"
[pdf]
engine = "lualatex"
options = ["--toc"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.pdf.engine, "lualatex");
        assert_eq!(config.pdf.options, vec!["--toc"]);
        assert_eq!(config.pdf.command[0], "pandoc");
    }

    #[test]
    fn test_identity_without_version() {
        let renderer = RendererConfig::default();
        assert_eq!(renderer.identity(), "mmdc -i {input} -o {output}");
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[workspace]
root = "scratch"

[cache]
dir = "build/diagrams"
max_entries = 50
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.workspace_resolved.root,
            Some(PathBuf::from("/project/scratch"))
        );
        assert_eq!(
            config.cache_resolved.dir,
            PathBuf::from("/project/build/diagrams")
        );
        assert_eq!(config.cache_resolved.max_entries, Some(50));
    }

    #[test]
    fn test_resolve_absolute_paths_kept() {
        let toml = r#"
[cache]
dir = "/var/cache/mdpdf"
enabled = false
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.cache_resolved.dir, PathBuf::from("/var/cache/mdpdf"));
        assert!(!config.cache_resolved.enabled);
    }

    #[test]
    fn test_apply_cli_settings_cache() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            cache_enabled: Some(false),
            cache_dir: Some(PathBuf::from("/tmp/cache")),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert!(!config.cache_resolved.enabled);
        assert_eq!(config.cache_resolved.dir, PathBuf::from("/tmp/cache"));
    }

    #[test]
    fn test_apply_cli_settings_renderer_and_engine() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            renderer_timeout_secs: Some(5),
            workers: Some(3),
            engine: Some("pdflatex".to_owned()),
            workspace_root: Some(PathBuf::from("/scratch")),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.renderer.timeout_secs, 5);
        assert_eq!(config.renderer.workers, Some(3));
        assert_eq!(config.pdf.engine, "pdflatex");
        assert_eq!(
            config.workspace_resolved.root,
            Some(PathBuf::from("/scratch"))
        );
        assert_eq!(config.renderer.format, "svg"); // Unchanged
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_cli_settings(&CliSettings::default());

        assert!(config.cache_resolved.enabled);
        assert_eq!(config.renderer.timeout_secs, 60);
        assert_eq!(config.pdf.engine, "xelatex");
    }

    #[test]
    fn test_expand_env_vars_paths() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MDPDF_TEST_CACHE_ROOT", "/srv/cache");
        }

        let toml = r#"
[cache]
dir = "${MDPDF_TEST_CACHE_ROOT}/mdpdf"

[workspace]
root = "${MDPDF_TEST_UNSET_ROOT:-/tmp}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.cache_resolved.dir, PathBuf::from("/srv/cache/mdpdf"));
        assert_eq!(config.workspace_resolved.root, Some(PathBuf::from("/tmp")));

        unsafe {
            std::env::remove_var("MDPDF_TEST_CACHE_ROOT");
        }
    }

    #[test]
    fn test_expand_env_vars_command() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MDPDF_TEST_MMDC", "/opt/mmdc/bin/mmdc");
        }

        let toml = r#"
[renderer]
command = ["${MDPDF_TEST_MMDC}", "-i", "{input}", "-o", "{output}"]
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.renderer.command[0], "/opt/mmdc/bin/mmdc");
        assert_eq!(config.renderer.command[2], "{input}");

        unsafe {
            std::env::remove_var("MDPDF_TEST_MMDC");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MDPDF_TEST_MISSING_DIR");
        }

        let toml = r#"
[cache]
dir = "${MDPDF_TEST_MISSING_DIR}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { ref field, .. } if field == "cache.dir"));
    }

    #[test]
    fn test_validate_renderer_command_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.renderer.command = Vec::new();

        let err = config.validate().unwrap_err();

        assert_eq!(
            err.to_string(),
            "Configuration error: renderer.command cannot be empty"
        );
    }

    #[test]
    fn test_validate_renderer_command_without_output() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.renderer.command = strings(&["mmdc", "-i", "{input}"]);

        let err = config.validate().unwrap_err();

        assert!(err.to_string().contains("renderer.command must reference {output}"));
    }

    #[test]
    fn test_validate_pdf_command_placeholder_in_program_not_enough() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.pdf.command = strings(&["{input}", "{output}"]);

        let err = config.validate().unwrap_err();

        assert!(err.to_string().contains("pdf.command must reference {input}"));
    }

    #[test]
    fn test_validate_format() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.renderer.format = "gif".to_owned();

        let err = config.validate().unwrap_err();

        assert!(err.to_string().contains("renderer.format"));
    }

    #[test]
    fn test_validate_timeouts() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.renderer.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default_with_base(Path::new("/test"));
        config.pdf.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_workers_range() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.renderer.workers = Some(0);
        assert!(config.validate().is_err());

        config.renderer.workers = Some(65);
        assert!(config.validate().is_err());

        config.renderer.workers = Some(64);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_engine_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.pdf.engine = "  ".to_owned();

        let err = config.validate().unwrap_err();

        assert_eq!(err.to_string(), "Configuration error: pdf.engine cannot be empty");
    }

    #[test]
    fn test_validate_max_entries_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.cache_resolved.max_entries = Some(0);

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[renderer]
timeout_secs = 30

[cache]
dir = "cache"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.renderer.timeout_secs, 30);
        assert_eq!(config.cache_resolved.dir, dir.path().join("cache"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_invalid_file_fails_validation() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[renderer]\ncommand = [\"mmdc\"]\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[renderer\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = Config::load(Some(Path::new("/nonexistent/mdpdf.toml")), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_cli_overrides_validated() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "").unwrap();
        let overrides = CliSettings {
            workers: Some(0),
            ..Default::default()
        };

        let err = Config::load(Some(&path), Some(&overrides)).unwrap_err();

        assert!(err.to_string().contains("renderer.workers"));
    }
}
