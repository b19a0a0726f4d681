use std::fmt;

/// Everything the decision rule needs to know about one declared service.
#[derive(Debug, Clone, Copy)]
pub struct ServiceFacts {
    /// Declared desired state.
    pub enabled: bool,
    /// Ships with the image, no provisioning ever needed.
    pub is_default: bool,
    /// Image already present in local podman storage.
    pub image_present: bool,
    /// A provisioning template exists and the deployment profile allows
    /// using it.
    pub has_template: bool,
}

/// What reconciliation will do for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileDecision {
    Enable,
    Disable,
    /// Materialize the service offline, then enable it.
    ProvisionAndEnable,
    /// Materialize the service offline but leave it disabled, so a later
    /// flip to enabled needs no network.
    ProvisionAndDisable,
    /// Declared and wanted, but not a default, no image, no template.
    /// Recorded as a per-service failure, the run continues.
    TemplateMissing,
}

impl fmt::Display for ReconcileDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::ProvisionAndEnable => "provision+enable",
            Self::ProvisionAndDisable => "provision+disable",
            Self::TemplateMissing => "template-missing",
        };
        f.write_str(s)
    }
}

/// Decide what to do for one service.
///
/// Defaults and services whose image is already local are flipped directly;
/// anything else is provisioned first when a template allows it. A disabled
/// unknown service still gets a plain disable, which handles a unit left
/// behind by a registry entry that has since been removed and is a no-op
/// otherwise.
pub fn decide(facts: ServiceFacts) -> ReconcileDecision {
    if facts.enabled {
        if facts.is_default || facts.image_present {
            ReconcileDecision::Enable
        } else if facts.has_template {
            ReconcileDecision::ProvisionAndEnable
        } else {
            ReconcileDecision::TemplateMissing
        }
    } else if facts.is_default || facts.image_present {
        ReconcileDecision::Disable
    } else if facts.has_template {
        ReconcileDecision::ProvisionAndDisable
    } else {
        ReconcileDecision::Disable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(enabled: bool, is_default: bool, image_present: bool, has_template: bool) -> ServiceFacts {
        ServiceFacts {
            enabled,
            is_default,
            image_present,
            has_template,
        }
    }

    #[test]
    fn enabled_default_is_enabled_directly() {
        assert_eq!(decide(facts(true, true, false, false)), ReconcileDecision::Enable);
    }

    #[test]
    fn enabled_with_local_image_is_enabled_directly() {
        assert_eq!(decide(facts(true, false, true, true)), ReconcileDecision::Enable);
    }

    #[test]
    fn enabled_without_image_is_provisioned_first() {
        assert_eq!(
            decide(facts(true, false, false, true)),
            ReconcileDecision::ProvisionAndEnable
        );
    }

    #[test]
    fn enabled_unknown_service_reports_missing_template() {
        assert_eq!(
            decide(facts(true, false, false, false)),
            ReconcileDecision::TemplateMissing
        );
    }

    #[test]
    fn disabled_default_is_disabled() {
        assert_eq!(decide(facts(false, true, false, false)), ReconcileDecision::Disable);
    }

    #[test]
    fn disabled_without_image_is_provisioned_offline() {
        assert_eq!(
            decide(facts(false, false, false, true)),
            ReconcileDecision::ProvisionAndDisable
        );
    }

    #[test]
    fn disabled_unknown_service_still_gets_a_disable() {
        assert_eq!(decide(facts(false, false, false, false)), ReconcileDecision::Disable);
    }
}
