// ─── Platform Rules ───
// Allow/disallow rules restricting a dependency to some platforms.

use serde::{Deserialize, Serialize};

use super::tag::{Arch, Os, PlatformTag};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformRule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

impl OsRule {
    fn matches(&self, platform: &PlatformTag) -> bool {
        let os_ok = match &self.name {
            None => true,
            Some(name) => Os::parse(name) == Some(platform.os),
        };
        let arch_ok = match &self.arch {
            None => true,
            Some(arch) => Arch::parse(arch) == Some(platform.arch),
        };
        os_ok && arch_ok
    }
}

/// Evaluate whether `platform` is allowed by `rules`.
///
/// - No rules → allowed.
/// - Otherwise start disallowed and process rules top-to-bottom; every rule
///   whose OS constraint matches (or that has none) overwrites the state.
pub fn is_allowed(rules: &[PlatformRule], platform: &PlatformTag) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        let applies = match &rule.os {
            None => true,
            Some(os) => os.matches(platform),
        };
        if applies {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}
