//! Lowering of resolved deployments to Kubernetes objects.
//!
//! Objects are typed `k8s-openapi` resources, so `apiVersion` and `kind`
//! come from the resource definitions and field names follow the upstream
//! schema. They serialize to either YAML or JSON.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EnvVar, EnvVarSource,
    HTTPGetAction, PodSpec, PodTemplateSpec, Probe, ResourceRequirements, Secret,
    SecretKeySelector, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::Resource;
use serde::Serialize;
use stevedore_spec::ResourceRequest;

use crate::deployment::ResolvedDeployment;

/// Volume name used for the rendered config files.
const CONFIG_VOLUME: &str = "config";

/// One lowered object. Serializes as the wrapped resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KubeObject {
    ConfigMap(ConfigMap),
    Secret(Secret),
    Deployment(Deployment),
}

impl KubeObject {
    pub fn kind(&self) -> &'static str {
        match self {
            KubeObject::ConfigMap(_) => ConfigMap::KIND,
            KubeObject::Secret(_) => Secret::KIND,
            KubeObject::Deployment(_) => Deployment::KIND,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            KubeObject::ConfigMap(o) => &o.metadata,
            KubeObject::Secret(o) => &o.metadata,
            KubeObject::Deployment(o) => &o.metadata,
        }
    }
}

/// Objects for one deployment: an optional ConfigMap, an optional Secret,
/// then the Deployment.
pub fn lower(deployment: &ResolvedDeployment) -> Vec<KubeObject> {
    let mut objects = Vec::with_capacity(3);
    if let Some(config_map) = config_map(deployment) {
        objects.push(KubeObject::ConfigMap(config_map));
    }
    if let Some(secret) = secret(deployment) {
        objects.push(KubeObject::Secret(secret));
    }
    objects.push(KubeObject::Deployment(workload(deployment)));
    objects
}

fn metadata(deployment: &ResolvedDeployment, name: String) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: Some(deployment.namespace.clone()),
        labels: Some(labels(deployment)),
        ..Default::default()
    }
}

fn labels(deployment: &ResolvedDeployment) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), deployment.service.clone()),
        ("team".to_string(), deployment.team.clone()),
        ("region".to_string(), deployment.region.clone()),
    ])
}

fn quantities(request: &ResourceRequest) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(request.cpu.clone())),
        ("memory".to_string(), Quantity(request.memory.clone())),
    ])
}

fn int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// ConfigMap with the rendered files, if the service has any.
pub fn config_map(deployment: &ResolvedDeployment) -> Option<ConfigMap> {
    if deployment.config_files.is_empty() {
        return None;
    }
    Some(ConfigMap {
        metadata: metadata(deployment, deployment.config_map_name()),
        data: Some(deployment.config_files.clone()),
        ..Default::default()
    })
}

/// Secret with the resolved secret values, if the service has any.
pub fn secret(deployment: &ResolvedDeployment) -> Option<Secret> {
    if deployment.secrets.is_empty() {
        return None;
    }
    Some(Secret {
        metadata: metadata(deployment, deployment.secret_name()),
        type_: Some("Opaque".to_string()),
        string_data: Some(deployment.secrets.clone()),
        ..Default::default()
    })
}

fn env(deployment: &ResolvedDeployment) -> Vec<EnvVar> {
    let plain = deployment.env.iter().map(|(name, value)| EnvVar {
        name: name.clone(),
        value: Some(value.clone()),
        ..Default::default()
    });
    let secret = deployment.secrets.keys().map(|name| EnvVar {
        name: name.clone(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: deployment.secret_name().into(),
                key: name.clone(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    });
    plain.chain(secret).collect()
}

fn readiness(deployment: &ResolvedDeployment) -> Option<Probe> {
    let health = deployment.health.as_ref()?;
    let port = match deployment.http_port {
        Some(port) => IntOrString::Int(int(port)),
        None => IntOrString::String("http".to_string()),
    };
    Some(Probe {
        http_get: Some(HTTPGetAction {
            path: Some(health.uri.clone()),
            port,
            ..Default::default()
        }),
        initial_delay_seconds: Some(int(health.wait)),
        ..Default::default()
    })
}

/// The apps/v1 Deployment.
pub fn workload(deployment: &ResolvedDeployment) -> Deployment {
    let mut container = Container {
        name: deployment.service.clone(),
        image: Some(deployment.image_ref()),
        resources: Some(ResourceRequirements {
            requests: Some(quantities(&deployment.resources.requests)),
            limits: Some(quantities(&deployment.resources.limits)),
            ..Default::default()
        }),
        env: Some(env(deployment)),
        ports: deployment.http_port.map(|port| {
            vec![ContainerPort {
                name: Some("http".to_string()),
                container_port: int(port),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]
        }),
        readiness_probe: readiness(deployment),
        ..Default::default()
    };

    let mut volumes = None;
    if let (Some(mount), false) = (&deployment.config_mount, deployment.config_files.is_empty()) {
        container.volume_mounts = Some(vec![VolumeMount {
            name: CONFIG_VOLUME.to_string(),
            mount_path: mount.clone(),
            ..Default::default()
        }]);
        volumes = Some(vec![Volume {
            name: CONFIG_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: deployment.config_map_name().into(),
                ..Default::default()
            }),
            ..Default::default()
        }]);
    }

    Deployment {
        metadata: metadata(deployment, deployment.service.clone()),
        spec: Some(DeploymentSpec {
            replicas: Some(int(deployment.replica_count)),
            selector: LabelSelector {
                match_labels: Some(BTreeMap::from([(
                    "app".to_string(),
                    deployment.service.clone(),
                )])),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(deployment)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes,
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use stevedore_spec::{HealthCheck, ReconciliationMode, ResourceRequirements};

    fn deployment() -> ResolvedDeployment {
        let mut env = BTreeMap::new();
        env.insert("LOG_LEVEL".to_string(), "info".to_string());
        let mut secrets = BTreeMap::new();
        secrets.insert("DATABASE_URL".to_string(), "postgres://db".to_string());
        let mut config_files = BTreeMap::new();
        config_files.insert("settings.json".to_string(), "{}".to_string());

        ResolvedDeployment {
            service: "webapp".to_string(),
            region: "minikube".to_string(),
            environment: "dev".to_string(),
            cluster: "minikube".to_string(),
            api_server: "https://192.168.99.100:8443".to_string(),
            namespace: "apps".to_string(),
            reconciliation_mode: ReconciliationMode::CrdOwned,
            vault_folder: "minikube".to_string(),
            team: "devops".to_string(),
            image: "quay.io/babylonhealth/webapp".to_string(),
            version: "0.1.0".to_string(),
            replica_count: 2,
            resources: ResourceRequirements {
                requests: ResourceRequest::new("200m", "300Mi"),
                limits: ResourceRequest::new("500m", "500Mi"),
            },
            health: Some(HealthCheck {
                uri: "/health".to_string(),
                wait: 15,
            }),
            http_port: Some(8000),
            config_mount: Some("/config/".to_string()),
            config_files,
            env,
            secrets,
        }
    }

    fn json(object: &KubeObject) -> Value {
        serde_json::to_value(object).unwrap()
    }

    #[test]
    fn test_lower_emits_three_objects() {
        let objects = lower(&deployment());
        let kinds: Vec<_> = objects.iter().map(KubeObject::kind).collect();
        assert_eq!(kinds, vec!["ConfigMap", "Secret", "Deployment"]);
        assert_eq!(objects[0].metadata().name.as_deref(), Some("webapp-config"));

        let secret = json(&objects[1]);
        assert_eq!(secret["apiVersion"], "v1");
        assert_eq!(secret["kind"], "Secret");
        assert_eq!(secret["type"], "Opaque");
        assert_eq!(secret["stringData"]["DATABASE_URL"], "postgres://db");
    }

    #[test]
    fn test_workload_container() {
        let workload = serde_json::to_value(workload(&deployment())).unwrap();
        assert_eq!(workload["apiVersion"], "apps/v1");
        assert_eq!(workload["kind"], "Deployment");
        assert_eq!(workload["spec"]["replicas"], 2);
        assert_eq!(workload["metadata"]["namespace"], "apps");
        assert_eq!(workload["spec"]["selector"]["matchLabels"]["app"], "webapp");

        let container = &workload["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["image"], "quay.io/babylonhealth/webapp:0.1.0");
        assert_eq!(container["resources"]["requests"]["cpu"], "200m");
        assert_eq!(container["resources"]["limits"]["memory"], "500Mi");
        assert_eq!(container["ports"][0]["containerPort"], 8000);
        assert_eq!(container["readinessProbe"]["httpGet"]["path"], "/health");
        assert_eq!(container["readinessProbe"]["httpGet"]["port"], 8000);
        assert_eq!(container["readinessProbe"]["initialDelaySeconds"], 15);
        assert_eq!(container["volumeMounts"][0]["mountPath"], "/config/");

        let env = container["env"].as_array().unwrap();
        assert_eq!(env[0]["name"], "LOG_LEVEL");
        assert_eq!(env[0]["value"], "info");
        assert_eq!(env[1]["valueFrom"]["secretKeyRef"]["name"], "webapp-secrets");
        assert_eq!(env[1]["valueFrom"]["secretKeyRef"]["key"], "DATABASE_URL");

        let volumes = &workload["spec"]["template"]["spec"]["volumes"];
        assert_eq!(volumes[0]["configMap"]["name"], "webapp-config");
    }

    #[test]
    fn test_readiness_falls_back_to_named_port() {
        let mut d = deployment();
        d.http_port = None;

        let workload = serde_json::to_value(workload(&d)).unwrap();
        let container = &workload["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["readinessProbe"]["httpGet"]["port"], "http");
        assert!(container.get("ports").is_none());
    }

    #[test]
    fn test_no_optional_objects() {
        let mut d = deployment();
        d.secrets.clear();
        d.config_files.clear();
        d.health = None;

        let objects = lower(&d);
        assert_eq!(objects.len(), 1);
        let workload = json(&objects[0]);
        let container = &workload["spec"]["template"]["spec"]["containers"][0];
        assert!(container.get("readinessProbe").is_none());
        assert!(container.get("volumeMounts").is_none());
        assert!(workload["spec"]["template"]["spec"].get("volumes").is_none());
    }

    #[test]
    fn test_redacted_lowering_hides_secrets() {
        let mut d = deployment();
        d.config_files
            .insert("db.conf".to_string(), "url=postgres://db\n".to_string());

        let objects = lower(&d.redacted());
        let rendered = serde_json::to_string(&objects).unwrap();
        assert!(!rendered.contains("postgres://db"));
        assert_eq!(json(&objects[0])["data"]["db.conf"], "url=<redacted>\n");
        assert_eq!(json(&objects[1])["stringData"]["DATABASE_URL"], "<redacted>");
    }
}
