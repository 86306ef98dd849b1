//! Configuration checks that produce warnings, never errors.
use super::Config;
use crate::platform::Platform;

/// A validation warning detected after configuration loading.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationWarning {
    /// The configuration source (e.g., "host.toml", ".traits").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.source, self.item, self.message)
    }
}

/// A configuration check.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self, config: &Config, platform: &Platform) -> Vec<ValidationWarning>;

    /// Short name of this validator (e.g., "stow", "packages").
    fn name(&self) -> &'static str;
}

/// Stow packages listed in `host.toml` must exist under `stow/`.
#[derive(Debug)]
pub struct StowValidator;

impl ConfigValidator for StowValidator {
    fn validate(&self, config: &Config, _platform: &Platform) -> Vec<ValidationWarning> {
        let stow_dir = config.stow_dir();
        config
            .host
            .config
            .stow
            .iter()
            .filter(|pkg| !stow_dir.join(pkg).is_dir())
            .map(|pkg| {
                ValidationWarning::new(
                    "host.toml",
                    pkg,
                    format!("stow package does not exist: {}", stow_dir.join(pkg).display()),
                )
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "stow"
    }
}

/// AUR packages only make sense on Arch.
#[derive(Debug)]
pub struct PackageValidator;

impl ConfigValidator for PackageValidator {
    fn validate(&self, config: &Config, platform: &Platform) -> Vec<ValidationWarning> {
        if platform.supports_aur() {
            return Vec::new();
        }
        config
            .host
            .config
            .aur
            .iter()
            .map(|pkg| {
                ValidationWarning::new(
                    "host.toml",
                    pkg,
                    "AUR package listed but this is not an Arch system",
                )
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "packages"
    }
}

/// Trait file and `.hyprland` marker must agree.
#[derive(Debug)]
pub struct TraitValidator;

impl ConfigValidator for TraitValidator {
    fn validate(&self, config: &Config, _platform: &Platform) -> Vec<ValidationWarning> {
        let host = &config.host;
        let mut warnings = Vec::new();

        if host.has_trait_file && host.traits.is_empty() {
            warnings.push(ValidationWarning::new(
                ".traits",
                &host.name,
                "trait file is empty",
            ));
        }
        if host.hyprland && !host.has_trait("hyprland") {
            warnings.push(ValidationWarning::new(
                ".hyprland",
                &host.name,
                "marker present but 'hyprland' trait not declared",
            ));
        }
        if !host.hyprland && host.has_trait("hyprland") {
            warnings.push(ValidationWarning::new(
                ".traits",
                &host.name,
                "'hyprland' trait declared but .hyprland marker missing",
            ));
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "traits"
    }
}

/// Run every validator.
#[must_use]
pub fn validate_all(config: &Config, platform: &Platform) -> Vec<ValidationWarning> {
    let validators: [&dyn ConfigValidator; 3] = [&StowValidator, &PackageValidator, &TraitValidator];
    validators
        .iter()
        .flat_map(|v| v.validate(config, platform))
        .collect()
}
