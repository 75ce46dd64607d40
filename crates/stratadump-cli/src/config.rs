//! Settings for one run: TOML file defaults merged under command-line arguments.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use stratadump_core::{BackupOptions, Dialect};
use thiserror::Error;

use crate::cli::{Args, DialectArg, ReportFormat};

/// Invalid or incomplete configuration. The binary exits with status 66.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no database URL given; pass --url, set DATABASE_URL or add `url` to the config file")]
    MissingUrl,

    #[error("unsupported database URL scheme in {0}; expected postgres://, postgresql://, mysql:// or mariadb://")]
    UnsupportedUrl(String),

    #[error("--dialect {expected} does not match the {actual} connection URL")]
    DialectMismatch { expected: Dialect, actual: Dialect },

    #[error("`output` and `output_dir` cannot both be set")]
    OutputConflict,
}

/// Contents of a `--config` file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub url: Option<String>,
    pub dialect: Option<DialectArg>,
    pub schema: Option<String>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub exclude_system_tables: Option<bool>,
    pub output: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub report_format: Option<ReportFormat>,
    pub report_file: Option<PathBuf>,
    pub strict: Option<bool>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Where the script goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
    /// A default-named file, `<schema>-<timestamp>.sql`, in this directory.
    Directory(PathBuf),
}

impl OutputTarget {
    fn from_path(path: PathBuf) -> Self {
        if path.as_os_str() == "-" {
            Self::Stdout
        } else {
            Self::File(path)
        }
    }
}

/// Fully merged settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub url: String,
    pub dialect: Dialect,
    pub options: BackupOptions,
    pub output: OutputTarget,
    pub report_format: ReportFormat,
    pub report_file: Option<PathBuf>,
    pub compact: bool,
    pub verify: bool,
    pub strict: bool,
    pub quiet: bool,
}

impl Settings {
    /// Merge `args` over `file`. Lists from the command line replace, not extend,
    /// lists from the file.
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self, ConfigError> {
        let url = args
            .url
            .clone()
            .or(file.url)
            .filter(|u| !u.trim().is_empty())
            .ok_or(ConfigError::MissingUrl)?;
        let actual =
            Dialect::from_url(&url).ok_or_else(|| ConfigError::UnsupportedUrl(redact_url(&url)))?;

        if let Some(expected) = args.dialect.or(file.dialect).map(Dialect::from) {
            if expected != actual {
                return Err(ConfigError::DialectMismatch { expected, actual });
            }
        }

        let include = pick_list(&args.include, file.include);
        let exclude = pick_list(&args.exclude, file.exclude);
        let keep_system_tables =
            args.no_exclude_system_tables || !file.exclude_system_tables.unwrap_or(true);

        let mut options = BackupOptions::default()
            .with_include(include)
            .with_exclude(exclude);
        if keep_system_tables {
            options = options.with_system_tables();
        }
        options.configured_schema = args.schema.clone().or(file.schema);

        let output = match (&args.output, &args.output_dir) {
            (Some(path), _) => OutputTarget::from_path(path.clone()),
            (None, Some(dir)) => OutputTarget::Directory(dir.clone()),
            (None, None) => match (file.output, file.output_dir) {
                (Some(_), Some(_)) => return Err(ConfigError::OutputConflict),
                (Some(path), None) => OutputTarget::from_path(path),
                (None, Some(dir)) => OutputTarget::Directory(dir),
                (None, None) => OutputTarget::Directory(PathBuf::from(".")),
            },
        };

        Ok(Self {
            url,
            dialect: actual,
            options,
            output,
            report_format: args.report_format.or(file.report_format).unwrap_or_default(),
            report_file: args.report_file.clone().or(file.report_file),
            compact: args.compact,
            verify: args.verify,
            strict: args.strict || file.strict.unwrap_or(false),
            quiet: args.quiet,
        })
    }
}

fn pick_list(cli: &[String], file: Option<Vec<String>>) -> Vec<String> {
    if cli.is_empty() {
        file.unwrap_or_default()
    } else {
        cli.to_vec()
    }
}

/// True when the URL carries a password (`user:pass@host`).
pub fn url_has_password(url: &str) -> bool {
    url_credentials(url).is_some_and(|userinfo| userinfo.contains(':'))
}

fn url_credentials(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    authority.rsplit_once('@').map(|(userinfo, _)| userinfo)
}

/// The URL with any password replaced by `***`, for messages and logs.
pub fn redact_url(url: &str) -> String {
    let Some(userinfo) = url_credentials(url) else {
        return url.to_string();
    };
    let Some((user, _)) = userinfo.split_once(':') else {
        return url.to_string();
    };
    url.replacen(userinfo, &format!("{user}:***"), 1)
}
