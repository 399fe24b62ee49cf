//! Desired-state templates
//!
//! The desired StorageCluster is described by a YAML manifest compiled into
//! the binary (`templates/storagecluster.yaml`), optionally replaced at
//! startup by a file. Templates are parsed on every instantiation so a bad
//! override surfaces as a [`Error::Template`] on the pass that needs it
//! instead of taking the process down.
//!
//! Each resource kind gets its own typed factory on [`TemplateProvider`], so
//! callers receive the concrete type and there is no downcast to get wrong.

use std::path::Path;

use kube::api::TypeMeta;
use kube::Resource;
use serde::de::DeserializeOwned;

#[cfg(test)]
use mockall::automock;

use crate::crd::StorageCluster;
use crate::Error;

/// StorageCluster manifest shipped with the operator
pub const STORAGE_CLUSTER_TEMPLATE: &str = include_str!("../../templates/storagecluster.yaml");

/// Source of template-derived desired state
#[cfg_attr(test, automock)]
pub trait TemplateProvider: Send + Sync {
    /// Instantiate a fresh StorageCluster from its template
    fn storage_cluster(&self) -> Result<StorageCluster, Error>;
}

/// Templates held as raw YAML
#[derive(Clone, Debug)]
pub struct YamlTemplates {
    source: String,
    storage_cluster: String,
}

impl YamlTemplates {
    /// Templates compiled into the binary
    pub fn embedded() -> Self {
        Self::from_yaml("embedded:storagecluster.yaml", STORAGE_CLUSTER_TEMPLATE)
    }

    /// Load the StorageCluster template from a file
    ///
    /// Only reading happens here; the content is validated when instantiated.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml(path.display().to_string(), yaml))
    }

    /// Use the given YAML as the StorageCluster template
    pub fn from_yaml(source: impl Into<String>, yaml: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            storage_cluster: yaml.into(),
        }
    }

    /// Where the templates came from (file path or embedded marker)
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Default for YamlTemplates {
    fn default() -> Self {
        Self::embedded()
    }
}

impl TemplateProvider for YamlTemplates {
    fn storage_cluster(&self) -> Result<StorageCluster, Error> {
        instantiate(&self.source, &self.storage_cluster)
    }
}

/// Decode a manifest into `K`, checking it really describes a `K`
fn instantiate<K>(template: &str, yaml: &str) -> Result<K, Error>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)
        .map_err(|e| Error::template(template, format!("invalid YAML: {}", e)))?;

    let types: TypeMeta = serde_yaml::from_value(value.clone())
        .map_err(|e| Error::template(template, format!("missing apiVersion/kind: {}", e)))?;

    let expected_api_version = K::api_version(&());
    let expected_kind = K::kind(&());
    if types.api_version != expected_api_version || types.kind != expected_kind {
        return Err(Error::template(
            template,
            format!(
                "expected {}/{}, found {}/{}",
                expected_api_version, expected_kind, types.api_version, types.kind
            ),
        ));
    }

    if value.get("spec").is_none() {
        return Err(Error::template(template, "template has no spec"));
    }

    serde_yaml::from_value(value).map_err(|e| {
        Error::template(
            template,
            format!("cannot decode {}: {}", expected_kind, e),
        )
    })
}
