//! Data models for service manifests.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{SpecError, SpecResult};
use crate::quantity;

/// Placeholder marking an environment value that lives in the secret store.
pub const SECRET_SENTINEL: &str = "IN_VAULT";

/// An environment variable value as declared in a manifest or region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    /// Used verbatim.
    Literal(String),
    /// Fetched from the region's secret store under the variable's name.
    ExternalSecret,
}

impl EnvValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Self::ExternalSecret)
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            Self::ExternalSecret => None,
        }
    }
}

impl Serialize for EnvValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(value) => serializer.serialize_str(value),
            Self::ExternalSecret => serializer.serialize_str(SECRET_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for EnvValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = deserializer.deserialize_any(ScalarVisitor)?;
        if raw == SECRET_SENTINEL {
            Ok(Self::ExternalSecret)
        } else {
            Ok(Self::Literal(raw))
        }
    }
}

/// Accepts any YAML scalar and keeps its textual form, so `PORT: 8080`
/// and `cpu: 1` read the same as their quoted versions.
struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        Ok(v.to_string())
    }
}

fn relaxed_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    deserializer.deserialize_any(ScalarVisitor)
}

/// Like [`ScalarVisitor`] but refuses floats. `version: 1.10` reaches serde
/// as `1.1`, so the original text cannot be recovered.
struct VersionVisitor;

impl<'de> Visitor<'de> for VersionVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a quoted version string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        ScalarVisitor.visit_str(v)
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        ScalarVisitor.visit_string(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        ScalarVisitor.visit_i64(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        ScalarVisitor.visit_u64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        Err(E::custom(format!(
            "unquoted version parsed as the number {}, quote it to keep every digit",
            v
        )))
    }
}

fn version_string_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    deserializer.deserialize_any(VersionVisitor).map(Some)
}

/// Team ownership metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
}

/// A cpu/memory pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceRequest {
    #[serde(deserialize_with = "relaxed_string")]
    pub cpu: String,
    #[serde(deserialize_with = "relaxed_string")]
    pub memory: String,
}

impl ResourceRequest {
    pub fn new(cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            cpu: cpu.into(),
            memory: memory.into(),
        }
    }

    /// CPU in cores.
    pub fn cpu_cores(&self) -> Option<f64> {
        quantity::parse_cpu(&self.cpu)
    }

    /// Memory in bytes.
    pub fn memory_bytes(&self) -> Option<f64> {
        quantity::parse_memory(&self.memory)
    }
}

/// Kubernetes style resource requests and limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceRequirements {
    pub requests: ResourceRequest,
    pub limits: ResourceRequest,
}

impl ResourceRequirements {
    /// Check that every quantity parses and no request exceeds its limit.
    pub fn verify(&self) -> SpecResult<()> {
        let req_cpu = parsed(self.requests.cpu_cores(), "resources.requests.cpu", &self.requests.cpu)?;
        let req_mem = parsed(
            self.requests.memory_bytes(),
            "resources.requests.memory",
            &self.requests.memory,
        )?;
        let lim_cpu = parsed(self.limits.cpu_cores(), "resources.limits.cpu", &self.limits.cpu)?;
        let lim_mem = parsed(
            self.limits.memory_bytes(),
            "resources.limits.memory",
            &self.limits.memory,
        )?;

        if req_cpu > lim_cpu {
            return Err(SpecError::validation(
                "resources.requests.cpu",
                format!("request {} exceeds limit {}", self.requests.cpu, self.limits.cpu),
            ));
        }
        if req_mem > lim_mem {
            return Err(SpecError::validation(
                "resources.requests.memory",
                format!(
                    "request {} exceeds limit {}",
                    self.requests.memory, self.limits.memory
                ),
            ));
        }
        Ok(())
    }
}

fn parsed(value: Option<f64>, field: &str, raw: &str) -> SpecResult<f64> {
    value.ok_or_else(|| SpecError::validation(field, format!("cannot parse quantity '{}'", raw)))
}

/// Health check descriptor; becomes the readiness check on the workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthCheck {
    pub uri: String,
    /// Seconds to wait before the first check.
    #[serde(default)]
    pub wait: u32,
}

/// A template bound to a file inside the config mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Template source name.
    pub name: String,
    /// Destination file name under the mount.
    pub dest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigMap {
    pub mount: String,
    #[serde(default)]
    pub files: Vec<ConfigFile>,
}

/// Service manifest, deserialized from `manifest.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServiceManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(
        default,
        deserialize_with = "version_string_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
    pub metadata: Metadata,
    pub resources: ResourceRequirements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configs: Option<ConfigMap>,
    pub regions: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, EnvValue>,
}

impl ServiceManifest {
    /// Names of environment variables that must come from the secret store.
    pub fn secret_keys(&self) -> Vec<&str> {
        self.env
            .iter()
            .filter(|(_, v)| v.is_secret())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Template bindings declared under `configs.files`.
    pub fn config_files(&self) -> &[ConfigFile] {
        self.configs.as_ref().map(|c| c.files.as_slice()).unwrap_or(&[])
    }

    /// Whether this service is declared for the given region.
    pub fn deploys_to(&self, region: &str) -> bool {
        self.regions.iter().any(|r| r == region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_value_sentinel() {
        let env: BTreeMap<String, EnvValue> = serde_yaml::from_str(
            "DB_PASSWORD: IN_VAULT\nRUST_LOG: info\nPORT: 8080\nDEBUG: true\n",
        )
        .unwrap();

        assert_eq!(env["DB_PASSWORD"], EnvValue::ExternalSecret);
        assert_eq!(env["RUST_LOG"], EnvValue::literal("info"));
        assert_eq!(env["PORT"], EnvValue::literal("8080"));
        assert_eq!(env["DEBUG"], EnvValue::literal("true"));
    }

    #[test]
    fn test_float_version_rejected() {
        #[derive(Debug, Deserialize)]
        struct Versioned {
            #[serde(default, deserialize_with = "version_string_opt")]
            version: Option<String>,
        }

        let quoted: Versioned = serde_yaml::from_str("version: \"1.10\"\n").unwrap();
        assert_eq!(quoted.version.as_deref(), Some("1.10"));
        let integer: Versioned = serde_yaml::from_str("version: 2\n").unwrap();
        assert_eq!(integer.version.as_deref(), Some("2"));

        let err = serde_yaml::from_str::<Versioned>("version: 1.10\n").unwrap_err();
        assert!(err.to_string().contains("quote it"));
    }

    #[test]
    fn test_env_value_serializes_sentinel() {
        let yaml = serde_yaml::to_string(&EnvValue::ExternalSecret).unwrap();
        assert_eq!(yaml.trim(), "IN_VAULT");
    }

    #[test]
    fn test_resources_verify() {
        let ok = ResourceRequirements {
            requests: ResourceRequest::new("200m", "300Mi"),
            limits: ResourceRequest::new("500m", "500Mi"),
        };
        assert!(ok.verify().is_ok());

        let inverted = ResourceRequirements {
            requests: ResourceRequest::new("1", "300Mi"),
            limits: ResourceRequest::new("500m", "500Mi"),
        };
        match inverted.verify() {
            Err(SpecError::Validation { field, .. }) => assert_eq!(field, "resources.requests.cpu"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_resources_bad_quantity() {
        let bad = ResourceRequirements {
            requests: ResourceRequest::new("200m", "lots"),
            limits: ResourceRequest::new("500m", "500Mi"),
        };
        match bad.verify() {
            Err(SpecError::Validation { field, .. }) => {
                assert_eq!(field, "resources.requests.memory")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
