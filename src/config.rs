use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Backend dialect whose translators and store types are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Generic,
    Sqlite,
}

#[derive(Debug, Error)]
#[error("Unknown dialect '{0}' (supported: generic, sqlite)")]
pub struct UnknownDialect(String);

impl FromStr for SqlDialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "generic" | "ansi" => Ok(SqlDialect::Generic),
            "sqlite" => Ok(SqlDialect::Sqlite),
            other => Err(UnknownDialect(other.to_string())),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::Generic => f.write_str("generic"),
            SqlDialect::Sqlite => f.write_str("sqlite"),
        }
    }
}

fn validate_parameter_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.chars().all(|c| matches!(c, '@' | ':' | '$' | '?')) {
        Ok(())
    } else {
        Err(ValidationError::new("parameter_prefix")
            .with_message("Parameter prefix may only contain '@', ':', '$' or '?'".into()))
    }
}

/// Translator configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Emit naive `=`/`<>` comparisons instead of null-compensated ones
    pub use_relational_nulls: bool,

    /// Prefix the renderer puts in front of parameter names
    #[validate(
        length(min = 1, max = 2, message = "Parameter prefix must be 1 or 2 characters"),
        custom(function = "validate_parameter_prefix")
    )]
    pub parameter_prefix: String,

    /// Maximum nesting depth of a translated expression
    #[validate(range(
        min = 1,
        max = 10000,
        message = "Max expression depth must be between 1 and 10000"
    ))]
    pub max_expression_depth: u32,

    /// Whether rendered columns carry their table alias
    pub qualify_columns: bool,

    /// Dialect whose translators and store types are registered
    pub dialect: SqlDialect,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            use_relational_nulls: false,
            parameter_prefix: "@".to_string(),
            max_expression_depth: 256,
            qualify_columns: true,
            dialect: SqlDialect::Generic,
        }
    }
}

impl TranslatorConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            use_relational_nulls: parse_env_var("EXPRSQL_RELATIONAL_NULLS", "false")?,
            parameter_prefix: env_var_or("EXPRSQL_PARAMETER_PREFIX", "@")?,
            max_expression_depth: parse_env_var("EXPRSQL_MAX_EXPRESSION_DEPTH", "256")?,
            qualify_columns: parse_env_var("EXPRSQL_QUALIFY_COLUMNS", "true")?,
            dialect: parse_env_var("EXPRSQL_DIALECT", "generic")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Layer command-line overrides on top of this configuration.
    ///
    /// Flags that were not given keep the value loaded from the environment
    /// or the configuration file.
    pub fn merge(mut self, cli: CliConfig) -> Result<Self, ConfigError> {
        if cli.use_relational_nulls {
            self.use_relational_nulls = true;
        }
        if let Some(prefix) = cli.parameter_prefix {
            self.parameter_prefix = prefix;
        }
        if let Some(depth) = cli.max_expression_depth {
            self.max_expression_depth = depth;
        }
        if cli.unqualified_columns {
            self.qualify_columns = false;
        }
        if let Some(dialect) = cli.dialect {
            self.dialect = dialect;
        }

        self.validate()?;
        Ok(self)
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub use_relational_nulls: bool,
    pub parameter_prefix: Option<String>,
    pub max_expression_depth: Option<u32>,
    pub unqualified_columns: bool,
    pub dialect: Option<SqlDialect>,
}

/// Read an environment variable, falling back to `default` when it is unset
fn env_var_or(key: &str, default: &str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) => Ok(value),
        Err(env::VarError::NotPresent) => Ok(default.to_string()),
        Err(e) => Err(e.into()),
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env_var_or(key, default)?;
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
