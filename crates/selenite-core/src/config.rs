use serde::{Deserialize, Serialize};

/// What happens when a handler is registered under a name that is already
/// taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Leave the existing handler in place; the new one is dropped.
    KeepExisting,
    /// Replace the existing handler.
    Overwrite,
    /// Refuse with a duplicate-registration error.
    Error,
}

/// Configuration for the dispatch registries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Conflict policy applied by the plain registration calls.
    pub duplicates: DuplicatePolicy,
    /// Extension probes consulted, in this order, when a save dispatch
    /// finds no registered handler for a value's type chain. Precedence
    /// between extension sets is data, not code.
    pub probe_order: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            duplicates: DuplicatePolicy::KeepExisting,
            probe_order: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keeps_existing_registrations() {
        let config = RegistryConfig::default();
        assert_eq!(config.duplicates, DuplicatePolicy::KeepExisting);
        assert!(config.probe_order.is_empty());
    }

    #[test]
    fn config_serializes() {
        let config = RegistryConfig {
            duplicates: DuplicatePolicy::Error,
            probe_order: vec!["ranges".to_string()],
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: RegistryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.duplicates, DuplicatePolicy::Error);
        assert_eq!(back.probe_order, vec!["ranges".to_string()]);
    }
}
