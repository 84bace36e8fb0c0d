//! Environment and file settings.
//!
//! Sources, lowest priority first:
//!
//! 1. built-in defaults
//! 2. `fob-lambda.toml` in the working directory, when present
//! 3. `FOB_LAMBDA_*` environment variables (`FOB_LAMBDA_MODE`,
//!    `FOB_LAMBDA_NODE_VERSION`, `FOB_LAMBDA_ZIP`)
//!
//! Fields set on a [`BuildRequest`](crate::BuildRequest) override all of them.

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::Result;
use crate::config::{BuildMode, NodeVersion};

/// Settings file looked up in the working directory.
pub const SETTINGS_FILE: &str = "fob-lambda.toml";

/// Prefix of the environment variables read into [`Settings`].
pub const ENV_PREFIX: &str = "FOB_LAMBDA_";

/// Build defaults taken from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Only `development` selects development mode; anything else is production.
    #[serde(default, deserialize_with = "lenient_mode")]
    pub mode: BuildMode,
    #[serde(default, deserialize_with = "lenient_version")]
    pub node_version: Option<NodeVersion>,
    #[serde(default)]
    pub zip: bool,
}

impl Settings {
    /// The layered provider, for callers that want to add their own sources.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(SETTINGS_FILE))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load settings from the default sources.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Settings`](crate::Error::Settings) when a source is
    /// malformed, for example an unsupported `node_version`.
    pub fn load() -> Result<Self> {
        Ok(Self::figment().extract()?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(f64),
    Flag(bool),
}

fn lenient_mode<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<BuildMode, D::Error> {
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(match value {
        Some(Scalar::Text(text)) => BuildMode::from_toggle(Some(&text)),
        _ => BuildMode::Production,
    })
}

/// Environment values like `20.18` arrive as numbers, so accept both forms.
fn lenient_version<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<NodeVersion>, D::Error> {
    use serde::de::Error as _;

    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Scalar::Text(text)) => NodeVersion::parse(&text)
            .map(Some)
            .map_err(D::Error::custom),
        Some(Scalar::Number(number)) => NodeVersion::supported()
            .find(|v| v.as_str().parse::<f64>().ok() == Some(number))
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("Unsupported node version '{}'", number))),
        Some(Scalar::Flag(flag)) => Err(D::Error::custom(format!(
            "expected a node version, found '{}'",
            flag
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let settings: Settings = Settings::figment().extract()?;
            assert_eq!(settings, Settings::default());
            assert_eq!(settings.mode, BuildMode::Production);
            assert_eq!(settings.node_version, None);
            assert!(!settings.zip);
            Ok(())
        });
    }

    #[test]
    fn test_mode_development_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("FOB_LAMBDA_MODE", "development");
            let settings: Settings = Settings::figment().extract()?;
            assert_eq!(settings.mode, BuildMode::Development);
            Ok(())
        });
    }

    #[test]
    fn test_other_mode_values_are_production() {
        Jail::expect_with(|jail| {
            jail.set_env("FOB_LAMBDA_MODE", "staging");
            let settings: Settings = Settings::figment().extract()?;
            assert_eq!(settings.mode, BuildMode::Production);

            jail.set_env("FOB_LAMBDA_MODE", "1");
            let settings: Settings = Settings::figment().extract()?;
            assert_eq!(settings.mode, BuildMode::Production);
            Ok(())
        });
    }

    #[test]
    fn test_node_version_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("FOB_LAMBDA_NODE_VERSION", "18.20");
            let settings: Settings = Settings::figment().extract()?;
            assert_eq!(settings.node_version.map(|v| v.to_string()), Some("18.20".into()));

            jail.set_env("FOB_LAMBDA_NODE_VERSION", "20.18");
            let settings: Settings = Settings::figment().extract()?;
            assert_eq!(settings.node_version.map(|v| v.to_string()), Some("20.18".into()));
            Ok(())
        });
    }

    #[test]
    fn test_unsupported_node_version_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("FOB_LAMBDA_NODE_VERSION", "6.10");
            assert!(Settings::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                SETTINGS_FILE,
                r#"
                    mode = "development"
                    node_version = "20.18"
                    zip = true
                "#,
            )?;

            let settings: Settings = Settings::figment().extract()?;
            assert_eq!(settings.mode, BuildMode::Development);
            assert_eq!(settings.node_version.as_ref().map(NodeVersion::as_str), Some("20.18"));
            assert!(settings.zip);

            jail.set_env("FOB_LAMBDA_MODE", "production");
            jail.set_env("FOB_LAMBDA_ZIP", "false");
            let settings: Settings = Settings::figment().extract()?;
            assert_eq!(settings.mode, BuildMode::Production);
            assert!(!settings.zip);
            Ok(())
        });
    }
}
