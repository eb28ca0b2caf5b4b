//! Use-case and account metadata files.
//!
//! A use case is a JSON document with a `services` array in which
//! applications and services are mixed; entries are split by `category`.
//! Unknown top-level keys are ignored.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::domain::{AccountMetadata, DefinitionRegistry, ResourceDefinition};
use crate::error::{ConfigError, Result};

#[derive(Debug, Deserialize)]
struct UsecaseFile {
    #[serde(default)]
    services: Vec<ResourceDefinition>,
}

/// Parse a use case into a validated registry.
///
/// # Errors
///
/// Returns [`ConfigError::ParseUsecase`] for malformed JSON or unknown
/// categories and environments, and the registry's validation errors.
pub fn parse_usecase(content: &str) -> Result<DefinitionRegistry> {
    let file: UsecaseFile = serde_json::from_str(content).map_err(ConfigError::ParseUsecase)?;
    let registry = DefinitionRegistry::from_definitions(file.services)?;
    debug!(
        applications = registry.applications().len(),
        services = registry.services().len(),
        "Use case parsed"
    );
    Ok(registry)
}

/// Read and parse a use case file.
///
/// # Errors
///
/// Returns [`ConfigError::ReadFile`] if the file cannot be read, otherwise
/// the errors of [`parse_usecase`].
pub fn load_usecase<P: AsRef<Path>>(path: P) -> Result<DefinitionRegistry> {
    let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
    parse_usecase(&content)
}

/// Parse account metadata; it must be a JSON object.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for anything but a JSON object.
pub fn parse_metadata(content: &str) -> Result<AccountMetadata> {
    serde_json::from_str(content).map_err(|e| {
        ConfigError::InvalidValue {
            field: "metadata",
            reason: e.to_string(),
        }
        .into()
    })
}

/// Read and parse an account metadata file.
///
/// # Errors
///
/// Returns [`ConfigError::ReadFile`] if the file cannot be read, otherwise
/// the errors of [`parse_metadata`].
pub fn load_metadata<P: AsRef<Path>>(path: P) -> Result<AccountMetadata> {
    let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
    parse_metadata(&content)
}

/// Write `metadata` as pretty printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_metadata<P: AsRef<Path>>(path: P, metadata: &AccountMetadata) -> Result<()> {
    let mut content = serde_json::to_string_pretty(metadata)?;
    content.push('\n');
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Kind, TargetEnvironment};
    use crate::error::Error;

    const USECASE: &str = r#"{
        "aboutThisUseCase": {"name": "Demo"},
        "services": [
            {"name": "xsuaa", "category": "SERVICE", "plan": "application"},
            {"name": "workzone", "category": "APPLICATION", "plan": "standard",
             "requiredServices": ["xsuaa"]},
            {"name": "kymaruntime", "category": "ELASTIC_SERVICE", "plan": "aws",
             "targetenvironment": "sapbtp", "repeatstatusrequest": 60}
        ]
    }"#;

    #[test]
    fn splits_services_by_category() {
        let registry = parse_usecase(USECASE).unwrap();

        assert_eq!(registry.applications().len(), 1);
        assert_eq!(registry.services().len(), 2);
        let kyma = &registry.services()[1];
        assert_eq!(kyma.category, Category::ElasticService);
        assert_eq!(kyma.target_environment, TargetEnvironment::SapBtp);
        assert_eq!(kyma.repeat_status_request, Some(60));
    }

    #[test]
    fn missing_services_key_is_empty() {
        assert!(parse_usecase("{}").unwrap().is_empty());
    }

    #[test]
    fn unknown_category_is_a_parse_error() {
        let result = parse_usecase(r#"{"services": [{"name": "x", "category": "ROBOT"}]}"#);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::ParseUsecase(_)))
        ));
    }

    #[test]
    fn duplicate_service_is_rejected() {
        let result = parse_usecase(
            r#"{"services": [
                {"name": "x", "category": "SERVICE"},
                {"name": "x", "category": "ELASTIC_SERVICE"}
            ]}"#,
        );
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::DuplicateName {
                kind: Kind::Service,
                ..
            }))
        ));
    }

    #[test]
    fn metadata_must_be_an_object() {
        assert!(parse_metadata(r#"{"subaccountid": "abc"}"#).is_ok());
        assert!(matches!(
            parse_metadata("[1, 2]"),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "metadata",
                ..
            }))
        ));
    }
}
