use crate::executor::CommandExecutor;
use crate::HostError;
use tracing::{debug, info};

/// Environment override for the image registry host.
pub const REGISTRY_ENV: &str = "HELMSMAN_REGISTRY";
/// Environment override for the image namespace under the registry.
pub const NAMESPACE_ENV: &str = "HELMSMAN_REGISTRY_NAMESPACE";

const DEFAULT_REGISTRY: &str = "docker.io";
const DEFAULT_NAMESPACE: &str = "helmsman";

/// Where service images are pulled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub registry: String,
    pub namespace: String,
}

impl Default for ImageSource {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_owned(),
            namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }
}

impl ImageSource {
    /// Source with registry and namespace taken from the environment,
    /// falling back to the built-in defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            registry: std::env::var(REGISTRY_ENV).unwrap_or(defaults.registry),
            namespace: std::env::var(NAMESPACE_ENV).unwrap_or(defaults.namespace),
        }
    }

    /// Fully qualified image reference for a service, tagged for the host's
    /// CPU architecture.
    pub fn service_image(&self, service: &str) -> String {
        format!("{}/{}/{service}:{}", self.registry, self.namespace, arch_tag())
    }
}

/// Architecture-specific image tag for the running host.
pub fn arch_tag() -> &'static str {
    match std::env::consts::ARCH {
        "arm" | "aarch64" => "latest-arm",
        _ => "latest-amd",
    }
}

/// Whether an image is already present in the local podman storage.
///
/// `podman images -q` prints one image id per matching image; a failure to
/// query is treated as absent, which at worst causes a redundant pull.
pub fn image_present(exec: &dyn CommandExecutor, image: &str) -> bool {
    let resp = exec.run("podman", &["images", "-q", image]);
    if !resp.ok {
        return false;
    }
    let id = resp.output.trim();
    !id.is_empty() && id.lines().all(|l| l.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Digest of the locally stored image, if any.
pub fn local_digest(exec: &dyn CommandExecutor, image: &str) -> Option<String> {
    let resp = exec.run("podman", &["images", "--format", "{{.Digest}}", image]);
    if !resp.ok {
        return None;
    }
    let digest = resp.output.trim();
    if digest.is_empty() {
        None
    } else {
        Some(digest.to_owned())
    }
}

/// Digest of the image currently published on the registry.
pub fn remote_digest(exec: &dyn CommandExecutor, image: &str) -> Result<String, HostError> {
    let reference = format!("docker://{image}");
    let resp = exec.run("skopeo", &["inspect", &reference]);
    if !resp.ok {
        return Err(HostError::RemoteInspect {
            image: image.to_owned(),
            detail: resp.message,
        });
    }
    let doc: serde_json::Value =
        serde_json::from_str(&resp.output).map_err(|e| HostError::RemoteInspect {
            image: image.to_owned(),
            detail: format!("unparseable inspect output: {e}"),
        })?;
    doc.get("Digest")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| HostError::RemoteInspect {
            image: image.to_owned(),
            detail: "inspect output carries no Digest field".to_owned(),
        })
}

/// Pull an image into the local podman storage.
pub fn pull(exec: &dyn CommandExecutor, image: &str) -> Result<(), HostError> {
    info!("pulling {image}");
    let resp = exec.run("podman", &["pull", image]);
    if resp.ok {
        Ok(())
    } else {
        Err(HostError::ImagePull {
            image: image.to_owned(),
            detail: format!("{}: {}", resp.message, resp.output.trim()),
        })
    }
}

/// Log in to the registry when credentials are present in the environment.
///
/// Appliances pulling from a public registry carry no credentials; in that
/// case this is a no-op.
pub fn login(exec: &dyn CommandExecutor, source: &ImageSource) -> Result<(), HostError> {
    let (Ok(user), Ok(password)) = (
        std::env::var("HELMSMAN_REGISTRY_USER"),
        std::env::var("HELMSMAN_REGISTRY_PASSWORD"),
    ) else {
        debug!("no registry credentials in environment, skipping login");
        return Ok(());
    };
    let resp = exec.run(
        "podman",
        &["login", "-u", &user, "-p", &password, &source.registry],
    );
    if resp.ok {
        Ok(())
    } else {
        Err(HostError::Login(resp.message))
    }
}
