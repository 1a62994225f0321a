use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Root application configuration. Loaded from an optional TOML file, then
/// environment variables with the prefix `AB_READOUT__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub impact: ImpactConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input_path")]
    pub path: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    #[serde(default = "default_has_headers")]
    pub has_headers: bool,
}

/// Traffic and revenue assumptions used to translate lift into money.
/// Raw values; validated before any computation uses them.
#[derive(Debug, Clone, Deserialize)]
pub struct ImpactConfig {
    #[serde(default = "default_monthly_visitors")]
    pub monthly_visitors: f64,
    #[serde(default = "default_revenue_per_conversion")]
    pub revenue_per_conversion: f64,
}

/// Absolute-lift thresholds for the ship recommendation.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_ship_lift_threshold")]
    pub ship_lift_threshold: f64,
    #[serde(default = "default_borderline_lift_threshold")]
    pub borderline_lift_threshold: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "text" => Ok(OutputFormat::Text),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Text => f.write_str("text"),
        }
    }
}

// Default functions
fn default_input_path() -> String {
    "ab_data.csv".to_string()
}
fn default_delimiter() -> String {
    ",".to_string()
}
fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S%.f".to_string()
}
fn default_has_headers() -> bool {
    true
}
fn default_monthly_visitors() -> f64 {
    100_000.0
}
fn default_revenue_per_conversion() -> f64 {
    50.0
}
fn default_ship_lift_threshold() -> f64 {
    0.005
}
fn default_borderline_lift_threshold() -> f64 {
    0.001
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            delimiter: default_delimiter(),
            timestamp_format: default_timestamp_format(),
            has_headers: default_has_headers(),
        }
    }
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            monthly_visitors: default_monthly_visitors(),
            revenue_per_conversion: default_revenue_per_conversion(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            ship_lift_threshold: default_ship_lift_threshold(),
            borderline_lift_threshold: default_borderline_lift_threshold(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file overlaid with environment
    /// variables (`AB_READOUT__IMPACT__MONTHLY_VISITORS=250000`).
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("AB_READOUT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let parsed: AppConfig = config.try_deserialize()?;
        tracing::debug!(
            input = %parsed.input.path,
            format = %parsed.output.format,
            "Configuration parsed"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.input.path, "ab_data.csv");
        assert_eq!(config.input.delimiter, ",");
        assert!(config.input.has_headers);
        assert_eq!(config.impact.monthly_visitors, 100_000.0);
        assert_eq!(config.impact.revenue_per_conversion, 50.0);
        assert_eq!(config.policy.ship_lift_threshold, 0.005);
        assert_eq!(config.policy.borderline_lift_threshold, 0.001);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.path.is_none());
    }

    #[test]
    #[serial]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[impact]\nmonthly_visitors = 250000.0\n\n[output]\nformat = \"text\"\n"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.impact.monthly_visitors, 250_000.0);
        assert_eq!(config.impact.revenue_per_conversion, 50.0);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.policy.ship_lift_threshold, 0.005);
    }

    #[test]
    #[serial]
    fn test_missing_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/ab_readout.toml")));
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_malformed_env_value_is_an_error() {
        std::env::set_var("AB_READOUT__IMPACT__MONTHLY_VISITORS", "abc");
        let result = AppConfig::load(None);
        std::env::remove_var("AB_READOUT__IMPACT__MONTHLY_VISITORS");
        assert!(result.is_err());

        std::env::set_var("AB_READOUT__IMPACT__MONTHLY_VISITORS", "42000");
        let result = AppConfig::load(None);
        std::env::remove_var("AB_READOUT__IMPACT__MONTHLY_VISITORS");
        assert_eq!(result.unwrap().impact.monthly_visitors, 42_000.0);
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
