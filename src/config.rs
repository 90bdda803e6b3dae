//! Generator configuration.

use thiserror::Error;

/// Which header to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Native, C-standard and legacy lock-based backends.
    #[default]
    Full,
    /// Native and C-standard backends only; cells are the facility's atomic types.
    StandardOnly,
}

impl Variant {
    pub fn has_legacy(self) -> bool {
        matches!(self, Variant::Full)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid namespace `{0}`: expected a lowercase C identifier")]
    InvalidNamespace(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Lowercase prefix of every generated function and type (`embb`).
    pub namespace: String,
    pub variant: Variant,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            namespace: "embb".to_string(),
            variant: Variant::Full,
        }
    }
}

impl GeneratorConfig {
    pub fn new(namespace: impl Into<String>, variant: Variant) -> Result<Self, ConfigError> {
        let config = Self {
            namespace: namespace.into(),
            variant,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut chars = self.namespace.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidNamespace(self.namespace.clone()))
        }
    }

    /// Prefix of generated macros (`EMBB`).
    pub fn macro_namespace(&self) -> String {
        self.namespace.to_uppercase()
    }

    /// Include guard of the generated header.
    pub fn include_guard(&self) -> String {
        let file = match self.variant {
            Variant::Full => "ATOMIC",
            Variant::StandardOnly => "C11",
        };
        format!("{}_BASE_C_INTERNAL_ATOMIC_{}_H_", self.macro_namespace(), file)
    }

    /// Include guard of the companion sizes header.
    pub fn sizes_guard(&self) -> String {
        format!("{}_BASE_C_INTERNAL_ATOMIC_ATOMIC_SIZES_H_", self.macro_namespace())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.macro_namespace(), "EMBB");
        assert_eq!(config.include_guard(), "EMBB_BASE_C_INTERNAL_ATOMIC_ATOMIC_H_");
    }

    #[test]
    fn test_rejects_non_identifiers() {
        for bad in ["", "Embb", "9lives", "my-lib", "a%D"] {
            assert_eq!(
                GeneratorConfig::new(bad, Variant::Full),
                Err(ConfigError::InvalidNamespace(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_standard_only_guard() {
        let config = GeneratorConfig::new("mylib", Variant::StandardOnly).unwrap();
        assert_eq!(config.include_guard(), "MYLIB_BASE_C_INTERNAL_ATOMIC_C11_H_");
    }
}
