//! Registry of deploy-function build targets.

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::{Error, Result};

/// A named contract whose deploy function can be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildTarget {
    /// Target identifier, e.g. `TonSimpleSale`.
    pub name: String,

    /// Contract directory relative to the compiler's contracts root,
    /// e.g. `fix_price_sales/ton_simple_sale`.
    pub path: String,
}

impl BuildTarget {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
        }
    }

    /// Name of the generated deploy function inside the probe listing.
    pub fn function_name(&self) -> String {
        format!("deploy{}", self.name)
    }
}

/// Immutable name → target mapping, loaded once at startup.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    targets: Vec<BuildTarget>,
    index: FxHashMap<String, usize>,
}

impl TargetRegistry {
    /// Build a registry, rejecting duplicate names.
    pub fn new(targets: Vec<BuildTarget>) -> Result<Self> {
        let mut index = FxHashMap::default();
        for (i, target) in targets.iter().enumerate() {
            if index.insert(target.name.clone(), i).is_some() {
                return Err(Error::Config(format!(
                    "duplicate deploy function target '{}'",
                    target.name
                )));
            }
        }
        Ok(Self { targets, index })
    }

    /// Look up a target by exact name.
    pub fn get(&self, name: &str) -> Result<&BuildTarget> {
        self.index
            .get(name)
            .map(|&i| &self.targets[i])
            .ok_or_else(|| Error::UnknownTarget {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    /// Targets in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &BuildTarget> {
        self.targets.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

pub(crate) fn default_deploy_functions() -> Vec<BuildTarget> {
    vec![
        BuildTarget::new("JettonSimpleAuction", "auctions/jetton_simple_auction"),
        BuildTarget::new("JettonMultipleAuction", "auctions/jetton_multiple_auction"),
        BuildTarget::new("TonSimpleAuction", "auctions/ton_simple_auction"),
        BuildTarget::new("TonMultipleAuction", "auctions/ton_multiple_auction"),
        BuildTarget::new("JettonSimpleSale", "fix_price_sales/jetton_simple_sale"),
        BuildTarget::new("JettonMultipleSale", "fix_price_sales/jetton_multiple_sale"),
        BuildTarget::new("TonSimpleSale", "fix_price_sales/ton_simple_sale"),
        BuildTarget::new("TonMultipleSale", "fix_price_sales/ton_multiple_sale"),
        BuildTarget::new("JettonSimpleOffer", "purchase_offers/jetton_simple_offer"),
        BuildTarget::new("TonSimpleOffer", "purchase_offers/ton_simple_offer"),
        BuildTarget::new("MultipleOffer", "purchase_offers/multiple_offer"),
    ]
}

/// Contracts driven by `build --all` and `test --all`.
///
/// `Jett_on` keeps the jetton wrappers apart from the TON ones when the test
/// runner matches names by substring; builds strip the underscore again.
pub(crate) fn default_contracts() -> Vec<String> {
    [
        "TonSimpleSale",
        "Jett_onSimpleSale",
        "TonMultipleSale",
        "Jett_onMultipleSale",
        "DomainSwap",
        "TonSimpleAuction",
        "Jett_onSimpleAuction",
        "TonMultipleAuction",
        "Jett_onMultipleAuction",
        "TonSimpleOffer",
        "Jett_onSimpleOffer",
        "Marketplace",
        "MultipleOffer",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_order() {
        let registry = TargetRegistry::new(default_deploy_functions()).unwrap();
        assert_eq!(registry.len(), 11);
        assert_eq!(registry.names().next(), Some("JettonSimpleAuction"));

        let target = registry.get("TonSimpleSale").unwrap();
        assert_eq!(target.path, "fix_price_sales/ton_simple_sale");
        assert_eq!(target.function_name(), "deployTonSimpleSale");
    }

    #[test]
    fn test_unknown_target_lists_available() {
        let registry = TargetRegistry::new(default_deploy_functions()).unwrap();
        let err = registry.get("Nope").unwrap_err();
        assert!(matches!(err, Error::UnknownTarget { .. }));
        assert!(err.to_string().contains("MultipleOffer"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let targets = vec![BuildTarget::new("A", "a"), BuildTarget::new("A", "b")];
        assert!(TargetRegistry::new(targets).is_err());
    }
}
