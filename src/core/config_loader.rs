//! Configuration file loader for release-publisher
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::PublishError;
use regex::Regex;
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Configuration file name
const CONFIG_FILENAME: &str = ".release-config.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Configuration load options
#[derive(Debug, Clone)]
pub struct ConfigLoadOptions {
    /// Explicit configuration file (must exist when given)
    pub config_path: Option<PathBuf>,

    /// Directory searched for `.release-config.yaml` when no explicit path is given
    pub project_path: PathBuf,

    /// Environment variables
    pub env: HashMap<String, String>,
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    /// Is configuration valid?
    pub valid: bool,

    /// Validation errors
    pub errors: Vec<ConfigValidationError>,

    /// Validation warnings
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "sonatype.uploadThreads")
    pub field: String,

    /// Error message
    pub message: String,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    /// Field path
    pub field: String,

    /// Warning message
    pub message: String,

    /// Suggestion
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. Environment variables
    /// 2. Configuration file (explicit path, or ./.release-config.yaml)
    /// 3. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<ReleaseConfig, PublishError> {
        let file_config = match &options.config_path {
            Some(path) => {
                let config = Self::load_config_file(path, &options.env).await?;
                Some(config.ok_or_else(|| {
                    PublishError::Config(format!("Config file {} not found", path.display()))
                })?)
            }
            None => {
                let path = options.project_path.join(CONFIG_FILENAME);
                Self::load_config_file(&path, &options.env).await?
            }
        };

        let mut config = file_config.unwrap_or_default();
        Self::merge_into(&mut config, Self::load_env_config(&options.env));

        let result = Self::validate(&config);
        for warning in &result.warnings {
            warn!(field = %warning.field, "{}", warning.message);
        }
        if !result.valid {
            return Err(PublishError::Config(Self::format_validation_result(&result)));
        }

        Ok(config)
    }

    /// Load configuration from a YAML file, expanding ${VAR} placeholders first
    async fn load_config_file(
        file_path: &Path,
        env: &HashMap<String, String>,
    ) -> Result<Option<ReleaseConfig>, PublishError> {
        if !file_path.exists() {
            debug!(path = %file_path.display(), "No config file");
            return Ok(None);
        }

        let content = fs::read_to_string(file_path)
            .await
            .map_err(|e| PublishError::Config(format!("Failed to read config file: {}", e)))?;

        let expanded = Self::expand_string(&content, env)?;

        let config: ReleaseConfig = serde_yaml::from_str(&expanded)
            .map_err(|e| PublishError::Config(format!("Failed to parse YAML config: {}", e)))?;

        debug!(path = %file_path.display(), "Loaded config file");
        Ok(Some(config))
    }

    /// Load configuration overrides from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> ReleaseConfig {
        let value = |name: &str| env.get(name).filter(|v| !v.is_empty()).cloned();
        let secret = |name: &str| value(name).map(|v| SecretString::new(v.into()));

        ReleaseConfig {
            sonatype: SonatypeConfig {
                url: value("SONATYPE_URL"),
                username: value("SONATYPE_USERNAME"),
                password: secret("SONATYPE_PASSWORD"),
                staging_profile: value("SONATYPE_STAGING_PROFILE"),
                ..Default::default()
            },
            artifactory: ArtifactoryConfig {
                url: value("ARTIFACTORY_URL"),
                username: value("ARTIFACTORY_USERNAME"),
                password: secret("ARTIFACTORY_PASSWORD"),
                ..Default::default()
            },
            state_file: None,
        }
    }

    /// Merge source config into target, values present in source win
    fn merge_into(target: &mut ReleaseConfig, source: ReleaseConfig) {
        let sonatype = source.sonatype;
        let target_sonatype = &mut target.sonatype;
        merge_option(&mut target_sonatype.url, sonatype.url);
        merge_option(&mut target_sonatype.username, sonatype.username);
        merge_option(&mut target_sonatype.password, sonatype.password);
        merge_option(&mut target_sonatype.staging_profile, sonatype.staging_profile);
        merge_option(
            &mut target_sonatype.staging_profile_id,
            sonatype.staging_profile_id,
        );
        merge_option(
            &mut target_sonatype.polling_interval_secs,
            sonatype.polling_interval_secs,
        );
        merge_option(&mut target_sonatype.max_polls, sonatype.max_polls);
        merge_option(&mut target_sonatype.poll_retries, sonatype.poll_retries);
        merge_option(&mut target_sonatype.upload_threads, sonatype.upload_threads);
        merge_option(
            &mut target_sonatype.request_timeout_secs,
            sonatype.request_timeout_secs,
        );
        if !sonatype.exclude.is_empty() {
            target_sonatype.exclude = sonatype.exclude;
        }

        let artifactory = source.artifactory;
        let target_artifactory = &mut target.artifactory;
        merge_option(&mut target_artifactory.url, artifactory.url);
        merge_option(&mut target_artifactory.username, artifactory.username);
        merge_option(&mut target_artifactory.password, artifactory.password);
        merge_option(&mut target_artifactory.staging_repo, artifactory.staging_repo);
        merge_option(
            &mut target_artifactory.request_timeout_secs,
            artifactory.request_timeout_secs,
        );

        merge_option(&mut target.state_file, source.state_file);
    }

    /// Expand environment variables in a single string
    ///
    /// Unknown variables are left untouched.
    fn expand_string(input: &str, env: &HashMap<String, String>) -> Result<String, PublishError> {
        let env_var_regex = Regex::new(ENV_VAR_PATTERN)
            .map_err(|e| PublishError::Config(format!("Invalid variable pattern: {}", e)))?;

        let expanded = env_var_regex.replace_all(input, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match env.get(var_name) {
                Some(value) => value.clone(),
                None => {
                    warn!(variable = var_name, "Environment variable not found");
                    caps[0].to_string()
                }
            }
        });

        Ok(expanded.into_owned())
    }

    /// Validate configuration
    pub fn validate(config: &ReleaseConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        Self::validate_sonatype(&config.sonatype, &mut errors, &mut warnings);
        Self::validate_artifactory(&config.artifactory, &mut errors, &mut warnings);

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    fn validate_sonatype(
        sonatype: &SonatypeConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        validate_url("sonatype.url", sonatype.url(), errors);
        validate_credentials(
            "sonatype",
            sonatype.username.as_deref(),
            sonatype.password.is_some(),
            errors,
            warnings,
        );

        if sonatype.upload_threads() == 0 {
            errors.push(ConfigValidationError {
                field: "sonatype.uploadThreads".to_string(),
                message: "uploadThreads must be at least 1".to_string(),
            });
        }

        if sonatype.max_polls() == 0 {
            errors.push(ConfigValidationError {
                field: "sonatype.maxPolls".to_string(),
                message: "maxPolls must be at least 1".to_string(),
            });
        }

        if sonatype.polling_interval().is_zero() {
            warnings.push(ConfigValidationWarning {
                field: "sonatype.pollingIntervalSecs".to_string(),
                message: "Polling without delay hammers the repository manager".to_string(),
                suggestion: Some("Use an interval of a few seconds".to_string()),
            });
        }

        for (i, pattern) in sonatype.exclude.iter().enumerate() {
            if let Err(e) = Regex::new(pattern) {
                errors.push(ConfigValidationError {
                    field: format!("sonatype.exclude[{}]", i),
                    message: format!("Invalid regular expression: {}", e),
                });
            }
        }
    }

    fn validate_artifactory(
        artifactory: &ArtifactoryConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        validate_url("artifactory.url", artifactory.url(), errors);
        validate_credentials(
            "artifactory",
            artifactory.username.as_deref(),
            artifactory.password.is_some(),
            errors,
            warnings,
        );

        if artifactory.staging_repo().trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "artifactory.stagingRepo".to_string(),
                message: "stagingRepo must not be empty".to_string(),
            });
        }
    }

    /// Format validation result as human-readable string
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("✅ Configuration validation succeeded".to_string());
        } else {
            lines.push("❌ Configuration has errors".to_string());
        }

        if !result.errors.is_empty() {
            lines.push("\n🔴 Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  - [{}] {}", error.field, error.message));
            }
        }

        if !result.warnings.is_empty() {
            lines.push("\n🟡 Warnings:".to_string());
            for warning in &result.warnings {
                lines.push(format!("  - [{}] {}", warning.field, warning.message));
                if let Some(suggestion) = &warning.suggestion {
                    lines.push(format!("    Suggestion: {}", suggestion));
                }
            }
        }

        lines.join("\n")
    }
}

fn merge_option<T>(target: &mut Option<T>, source: Option<T>) {
    if source.is_some() {
        *target = source;
    }
}

fn validate_url(field: &str, url: &str, errors: &mut Vec<ConfigValidationError>) {
    if url.trim().is_empty() {
        errors.push(ConfigValidationError {
            field: field.to_string(),
            message: "URL is required".to_string(),
        });
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ConfigValidationError {
            field: field.to_string(),
            message: format!("'{}' is not an http(s) URL", url),
        });
    }
}

fn validate_credentials(
    section: &str,
    username: Option<&str>,
    has_password: bool,
    errors: &mut Vec<ConfigValidationError>,
    warnings: &mut Vec<ConfigValidationWarning>,
) {
    let has_username = username.is_some_and(|u| !u.trim().is_empty());

    if has_password && !has_username {
        errors.push(ConfigValidationError {
            field: format!("{}.username", section),
            message: "password is set but username is missing".to_string(),
        });
    } else if !has_username {
        warnings.push(ConfigValidationWarning {
            field: format!("{}.username", section),
            message: "No credentials configured, requests are sent unauthenticated".to_string(),
            suggestion: Some(format!(
                "Set {}_USERNAME and {}_PASSWORD",
                section.to_uppercase(),
                section.to_uppercase()
            )),
        });
    }
}
