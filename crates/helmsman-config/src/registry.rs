use crate::ConfigError;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Bundled registry document, compiled into the binary. Never user-editable
/// at runtime.
const BUNDLED_REGISTRY: &str = include_str!("registry.json");

/// How this deployment handles services outside the built-in default set.
///
/// Replaces the original build-time variant selection: a single registry is
/// parameterized with the profile at construction, not at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentProfile {
    /// Only the shipped default services may be enabled or disabled.
    DefaultsOnly,
    /// Unknown declared services may be provisioned from registry templates.
    DynamicProvisioning,
}

/// Canonical definition of a service the host knows how to run.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServiceTemplate {
    #[serde(default)]
    pub name: String,
    /// systemd unit text with `{{service}}`, `{{image}}`, and
    /// `{{privileged}}` substitution tokens.
    pub unit_file: String,
    #[serde(default)]
    pub privileged: bool,
}

impl ServiceTemplate {
    /// Render the unit text for a concrete service and image reference.
    pub fn render(&self, service: &str, image: &str) -> String {
        let privileged = if self.privileged { "--privileged " } else { "" };
        self.unit_file
            .replace("{{service}}", service)
            .replace("{{image}}", image)
            .replace("{{privileged}}", privileged)
    }
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    /// Built-in services whose units ship with the host image.
    #[serde(default)]
    defaults: Vec<String>,
    /// Templates for dynamically provisionable services.
    #[serde(default)]
    services: BTreeMap<String, ServiceTemplate>,
}

/// Read-only set of known services: the host's built-in defaults plus the
/// registry templates available for dynamic provisioning.
#[derive(Debug)]
pub struct ServiceRegistry {
    defaults: BTreeSet<String>,
    templates: BTreeMap<String, ServiceTemplate>,
    profile: DeploymentProfile,
}

impl ServiceRegistry {
    /// Load the bundled registry document.
    pub fn bundled(profile: DeploymentProfile) -> Result<Self, ConfigError> {
        Self::from_document(BUNDLED_REGISTRY, profile)
    }

    pub fn from_document(text: &str, profile: DeploymentProfile) -> Result<Self, ConfigError> {
        let doc: RegistryDocument = serde_json::from_str(text)?;
        let mut templates = doc.services;
        for (name, template) in &mut templates {
            template.name.clone_from(name);
        }
        Ok(Self {
            defaults: doc.defaults.into_iter().collect(),
            templates,
            profile,
        })
    }

    /// Construct from explicit parts; used by tests.
    pub fn new(
        defaults: impl IntoIterator<Item = String>,
        templates: impl IntoIterator<Item = ServiceTemplate>,
        profile: DeploymentProfile,
    ) -> Self {
        Self {
            defaults: defaults.into_iter().collect(),
            templates: templates
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
            profile,
        }
    }

    pub fn is_default(&self, service: &str) -> bool {
        self.defaults.contains(service)
    }

    pub fn template(&self, service: &str) -> Option<&ServiceTemplate> {
        self.templates.get(service)
    }

    pub fn profile(&self) -> DeploymentProfile {
        self.profile
    }
}
