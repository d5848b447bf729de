use semver::Version;
use thiserror::Error;

pub const APP_NAME: &str = "Hangar Stores";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_TAG: Option<&str> = option_env!("GIT_TAG");

#[derive(Error, Debug, PartialEq)]
pub enum VersionError {
    #[error("invalid version format: {0}")]
    InvalidVersion(String),
}

/// Parses `1.2.3`, tolerating the `v` prefix used on release tags.
pub fn parse_version_str(input: &str) -> Result<Version, VersionError> {
    let trimmed = input.trim().trim_start_matches(['v', 'V']);
    Version::parse(trimmed).map_err(|err| VersionError::InvalidVersion(err.to_string()))
}

pub fn current_version() -> Result<Version, VersionError> {
    if let Some(tag) = GIT_TAG {
        return parse_version_str(tag);
    }

    parse_version_str(APP_VERSION)
}

pub fn version_label() -> String {
    if let Some(tag) = GIT_TAG {
        tag.to_string()
    } else {
        format!("v{}", APP_VERSION)
    }
}
