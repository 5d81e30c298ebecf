//! Environment profiles and the replacement sets they resolve to.

use std::fmt;

use serde::Deserialize;

/// Address profile injected into the constants file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Mainnet,
    Testnet,
    /// Fixture addresses used by the sandbox test suite.
    Test,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Test => "test",
        };
        f.write_str(name)
    }
}

/// One constant of a profile as written in `marketkit.toml`.
///
/// The value is either a literal address or the name of an environment
/// variable read when the profile is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileEntry {
    /// Constant name as it appears (quoted) in the constants file.
    pub token: String,

    /// Literal replacement value.
    #[serde(default)]
    pub value: Option<String>,

    /// Environment variable holding the replacement value.
    #[serde(default)]
    pub env: Option<String>,
}

impl ProfileEntry {
    pub fn literal(token: &str, value: &str) -> Self {
        Self {
            token: token.to_string(),
            value: Some(value.to_string()),
            env: None,
        }
    }

    pub fn from_env(token: &str, var: &str) -> Self {
        Self {
            token: token.to_string(),
            value: None,
            env: Some(var.to_string()),
        }
    }

    /// Resolve the replacement value.
    ///
    /// A missing environment variable yields an empty string.
    fn resolve(&self, lookup: &dyn Fn(&str) -> Option<String>) -> String {
        match (&self.value, &self.env) {
            (Some(value), _) => value.clone(),
            (None, Some(var)) => lookup(var).unwrap_or_default(),
            (None, None) => String::new(),
        }
    }
}

/// Ordered (token, value) substitutions for the constants file.
///
/// Tokens are matched as literal substrings of the original text. Every
/// token is searched in the original content, never in text produced by an
/// earlier substitution, and a match overlapping one claimed by an earlier
/// token is left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementSet {
    pairs: Vec<(String, String)>,
}

impl ReplacementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from profile entries, quoting both token and value the way
    /// string literals appear in the constants file.
    pub fn from_entries(entries: &[ProfileEntry], lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let pairs = entries
            .iter()
            .map(|entry| (quote(&entry.token), quote(&entry.resolve(lookup))))
            .collect();
        Self { pairs }
    }

    /// Append a raw (token, value) pair.
    pub fn push(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((token.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    /// Value substituted for `token`, if the set contains it.
    pub fn value_of(&self, token: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    /// Copy of this set with the value of one token swapped.
    ///
    /// `token` and `value` are unquoted names, as in [`ProfileEntry`]. The
    /// receiver is left untouched; an absent token leaves the copy identical.
    pub fn with_override(&self, token: &str, value: &str) -> Self {
        let quoted = quote(token);
        let mut next = self.clone();
        if let Some(pair) = next.pairs.iter_mut().find(|(t, _)| *t == quoted) {
            pair.1 = quote(value);
        }
        next
    }

    /// Apply every substitution against `original`.
    pub fn apply(&self, original: &str) -> String {
        // (start, end, value) spans over `original`, first claim wins
        let mut spans: Vec<(usize, usize, &str)> = Vec::new();

        for (token, value) in &self.pairs {
            if token.is_empty() {
                continue;
            }
            for (start, _) in original.match_indices(token.as_str()) {
                let end = start + token.len();
                let free = spans.iter().all(|&(s, e, _)| end <= s || start >= e);
                if free {
                    spans.push((start, end, value.as_str()));
                }
            }
        }

        spans.sort_unstable_by_key(|&(start, _, _)| start);

        let mut out = String::with_capacity(original.len());
        let mut cursor = 0;
        for (start, end, value) in spans {
            out.push_str(&original[cursor..start]);
            out.push_str(value);
            cursor = end;
        }
        out.push_str(&original[cursor..]);
        out
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s)
}

/// Profiles section of `marketkit.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilesConfig {
    pub mainnet: Vec<ProfileEntry>,
    pub testnet: Vec<ProfileEntry>,
    pub test: Vec<ProfileEntry>,

    /// Aggregator contract that receives `override_value` under the test
    /// action.
    pub aggregator: String,

    /// Token swapped by the override layer.
    pub override_token: String,

    /// Value the override layer puts in place of `override_token`.
    pub override_value: String,
}

impl ProfilesConfig {
    /// Entries of one profile.
    pub fn entries(&self, profile: Profile) -> &[ProfileEntry] {
        match profile {
            Profile::Mainnet => &self.mainnet,
            Profile::Testnet => &self.testnet,
            Profile::Test => &self.test,
        }
    }

    /// Resolve a profile, reading `env` entries through `lookup`.
    pub fn replacement_set_with(
        &self,
        profile: Profile,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> ReplacementSet {
        ReplacementSet::from_entries(self.entries(profile), lookup)
    }

    /// Apply the override layer to `base`.
    pub fn overridden(&self, base: &ReplacementSet) -> ReplacementSet {
        base.with_override(&self.override_token, &self.override_value)
    }

    /// Whether `target` is the aggregator contract (case-insensitive).
    pub fn is_aggregator(&self, target: &str) -> bool {
        target.eq_ignore_ascii_case(&self.aggregator)
    }
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            mainnet: default_mainnet(),
            testnet: default_testnet(),
            test: default_test(),
            aggregator: "marketplace".to_string(),
            override_token: "MARKETPLACE_ADDRESS".to_string(),
            override_value: "EQAd3btl7yW1QJ7oOF0AmaWiwAq8Vtt1-b0359ni8y5muhKJ".to_string(),
        }
    }
}

fn default_mainnet() -> Vec<ProfileEntry> {
    vec![
        ProfileEntry::from_env("MARKETPLACE_ADDRESS", "MARKETPLACE_ADDRESS"),
        ProfileEntry::from_env("ADMIN_ADDRESS", "ADMIN_ADDRESS"),
        ProfileEntry::literal("TON_DNS_ADDRESS", "EQC3dNlesgVD8YbAazcauIrXBPfiVhMMr5YYk2in0Mtsz0Bz"),
        ProfileEntry::literal("WEB3_ADDRESS", "EQBtcL4JA-PdPiUkB8utHcqdaftmUSTqdL8Z1EeXePLti_nK"),
        ProfileEntry::literal("USDT_ADDRESS", "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs"),
        ProfileEntry::literal("TON_VAULT_ADDRESS", "EQDa4VOnTYlLvDJ0gZjNYm5PXfSmmtL6Vs6A_CZEtXCNICq_"),
        ProfileEntry::literal("USDT_VAULT_ADDRESS", "EQAYqo4u7VF0fa4DPAebk4g9lBytj2VFny7pzXR0trjtXQaO"),
        ProfileEntry::literal("WEB3_VAULT_ADDRESS", "EQA_Au61onx7O5q1C2Q92S2bMaEL5v96HAYH4fjms1NIERVE"),
        ProfileEntry::literal("USDT_TON_POOL_ADDRESS", "EQA-X_yo3fzzbDbJ_0bzFWKqtRuZFIRa1sJsveZJ1YpViO3r"),
        ProfileEntry::literal("WEB3_TON_POOL_ADDRESS", "EQBTzDJyEgoXm88EkVTciyyZBfQYI-8OfOEDZphfHaQcoY8V"),
        ProfileEntry::literal("WEB3_USDT_POOL_ADDRESS", "EQBJe_ykU9KEvg3c2kDyxGykbJoNCCMLQ6dJjaONDUfDgEL8"),
        ProfileEntry::literal("USERNAMES_COLLECTION_ADDRESS", "EQCA14o1-VWhS2efqoh_9M1b_A9DtKTuoqfmkn83AbJzwnPi"),
    ]
}

fn default_testnet() -> Vec<ProfileEntry> {
    vec![
        ProfileEntry::from_env("MARKETPLACE_ADDRESS", "MARKETPLACE_ADDRESS_TESTNET"),
        ProfileEntry::from_env("ADMIN_ADDRESS", "ADMIN_ADDRESS_TESTNET"),
        ProfileEntry::literal("TON_DNS_ADDRESS", "EQC3dNlesgVD8YbAazcauIrXBPfiVhMMr5YYk2in0Mtsz0Bz"),
        ProfileEntry::literal("WEB3_ADDRESS", "kQAAsaFsxbeo6paoe9fNCMwRApFR9LIsyGM8bGy4B53DlN_W"),
        ProfileEntry::literal("USDT_ADDRESS", "kQAke45nLBq-0fO-Vaxl8NwNwKibNtr7SheU0xqB4JTKexSm"),
        ProfileEntry::literal("TON_VAULT_ADDRESS", "kQDshQ2nyhezZleRdlZT12pvrj_cYp9XGmcRgYirA71DWlOb"),
        ProfileEntry::literal("USDT_VAULT_ADDRESS", "kQCYNvxl8U0kBV4SdtAI1Fc6ekN2oOJyl4fGtXUYsnJQRrps"),
        ProfileEntry::literal("WEB3_VAULT_ADDRESS", "kQBhDY5O1rzLL9xbDDR8kpZDSsFSMVWfkBcfjJLTmF9pNyur"),
        ProfileEntry::literal("USDT_TON_POOL_ADDRESS", "kQD5NnXlulLDVWM_ICHETwOQJJDfRH3XWjGXLT8TDXja4DgF"),
        ProfileEntry::literal("WEB3_TON_POOL_ADDRESS", "kQDJGTmBoTCM5CZa4lKpVmSDwCDRVxzL7kP_arFWNFaXeSgr"),
        ProfileEntry::literal("WEB3_USDT_POOL_ADDRESS", "kQC8xi6NzgtJGVmWks3RnBBbJhb7MtAcukMFwtCoAWzFja8D"),
        ProfileEntry::literal("USERNAMES_COLLECTION_ADDRESS", "EQCA14o1-VWhS2efqoh_9M1b_A9DtKTuoqfmkn83AbJzwnPi"),
    ]
}

fn default_test() -> Vec<ProfileEntry> {
    vec![
        ProfileEntry::literal("MARKETPLACE_ADDRESS", "EQAX21A4fIw7hX1jmRjvJT0DX7H_FUItj2duCBWtK4ayEiC_"),
        ProfileEntry::literal("ADMIN_ADDRESS", "EQAX21A4fIw7hX1jmRjvJT0DX7H_FUItj2duCBWtK4ayEiC_"),
        ProfileEntry::literal("TON_DNS_ADDRESS", "EQCTN6fMuBiue-NUT7EkYU128cYLbDuaH4egFmmc_bCKaMHK"),
        ProfileEntry::literal("WEB3_ADDRESS", "EQBefYnZpKZTyviz9KYpMgWTnzJbwRTQrtzJVCJxN5qNdLJM"),
        ProfileEntry::literal("USDT_ADDRESS", "EQCmj3-TgcVq-mCOwFMG7Z7OKkLdJxQTdPU11St93_oIzRaU"),
        ProfileEntry::literal("TON_VAULT_ADDRESS", "EQDshQ2nyhezZleRdlZT12pvrj_cYp9XGmcRgYirA71DWugR"),
        ProfileEntry::literal("USDT_VAULT_ADDRESS", "EQAtwRp7c0vR82jID5S2c34HleVxaiYjJBgMvFgdeXIkPjjm"),
        ProfileEntry::literal("WEB3_VAULT_ADDRESS", "EQByrIjpJYer4sxHzKb12sxVfYIZ358RFHdAdfY2SEr3P-EX"),
        ProfileEntry::literal("USDT_TON_POOL_ADDRESS", "EQBJyOz6bLTrI-QWQbmmnC5vFZOj-CN8VTIr-EIt8dnR9ZBC"),
        ProfileEntry::literal("WEB3_TON_POOL_ADDRESS", "EQBHKpZrJdpABx0kCFGQ201Aix_9GviqOXoyBpvvTRc_r9-j"),
        ProfileEntry::literal("WEB3_USDT_POOL_ADDRESS", "EQAYSAN3tEDQre7rUVik6cczd5gcxqyVdpi3JHvu4mrr3326"),
        ProfileEntry::literal("USERNAMES_COLLECTION_ADDRESS", "EQA6SpQ_qolLTMwe3pSVllchLRMs8AOmYwb-DxG3eZD9Qk0c"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(&str, &str)]) -> ReplacementSet {
        let mut set = ReplacementSet::new();
        for (t, v) in pairs {
            set.push(*t, *v);
        }
        set
    }

    #[test]
    fn test_apply_replaces_every_occurrence() {
        let set = set(&[("\"A\"", "\"x\"")]);
        assert_eq!(set.apply("a = \"A\"; b = \"A\";"), "a = \"x\"; b = \"x\";");
    }

    #[test]
    fn test_apply_matches_against_original_only() {
        // The first value contains the second token; it must not be rewritten.
        let set = set(&[("\"A\"", "\"B\""), ("\"B\"", "\"C\"")]);
        assert_eq!(set.apply("\"A\" \"B\""), "\"B\" \"C\"");
    }

    #[test]
    fn test_overlapping_tokens_first_claim_wins() {
        let set = set(&[("ADMIN", "x"), ("MIN_FEE", "y")]);
        assert_eq!(set.apply("ADMIN_FEE"), "x_FEE");
    }

    #[test]
    fn test_missing_env_becomes_empty() {
        let entries = vec![ProfileEntry::from_env("MARKETPLACE_ADDRESS", "UNSET_VAR")];
        let set = ReplacementSet::from_entries(&entries, &|_| None);
        assert_eq!(set.value_of("\"MARKETPLACE_ADDRESS\""), Some("\"\""));
    }

    #[test]
    fn test_override_leaves_base_untouched() {
        let profiles = ProfilesConfig::default();
        let base = profiles.replacement_set_with(Profile::Test, &|_| None);
        let overridden = profiles.overridden(&base);

        assert_eq!(
            base.value_of("\"MARKETPLACE_ADDRESS\""),
            Some("\"EQAX21A4fIw7hX1jmRjvJT0DX7H_FUItj2duCBWtK4ayEiC_\"")
        );
        assert_eq!(
            overridden.value_of("\"MARKETPLACE_ADDRESS\""),
            Some("\"EQAd3btl7yW1QJ7oOF0AmaWiwAq8Vtt1-b0359ni8y5muhKJ\"")
        );
        // Only one token differs.
        let changed = base
            .iter()
            .zip(overridden.iter())
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(changed, 1);
    }

    #[test]
    fn test_aggregator_match_is_case_insensitive() {
        let profiles = ProfilesConfig::default();
        assert!(profiles.is_aggregator("Marketplace"));
        assert!(!profiles.is_aggregator("MultipleOffer"));
    }
}
