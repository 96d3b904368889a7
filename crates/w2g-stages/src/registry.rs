use std::collections::BTreeMap;

use w2g_core::config::VaultConfig;

/// Read-only vendor vault yields, in APY percent.
///
/// Fixed for the lifetime of the process; a live deployment would back this
/// with an on-chain query.
#[derive(Debug, Clone, PartialEq)]
pub struct VaultRegistry {
    vaults: BTreeMap<String, f64>,
}

impl VaultRegistry {
    pub fn new(vaults: BTreeMap<String, f64>) -> Self {
        Self { vaults }
    }

    pub fn from_config(cfg: &VaultConfig) -> Self {
        Self::new(cfg.vendors.clone())
    }

    pub fn apy(&self, vendor_id: &str) -> Option<f64> {
        self.vaults.get(vendor_id).copied()
    }

    pub fn vendors(&self) -> impl Iterator<Item = (&str, f64)> {
        self.vaults.iter().map(|(id, apy)| (id.as_str(), *apy))
    }
}

impl Default for VaultRegistry {
    fn default() -> Self {
        Self::from_config(&VaultConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_reference_vendors() {
        let registry = VaultRegistry::default();
        assert_eq!(registry.apy("vendor_123"), Some(9.0));
        assert_eq!(registry.apy("vendor_456"), Some(12.5));
        assert_eq!(registry.apy("vendor_789"), Some(6.7));
        assert_eq!(registry.apy("vendor_000"), None);
        assert_eq!(registry.vendors().count(), 3);
    }
}
