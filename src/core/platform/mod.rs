mod rules;
mod tag;

pub use rules::{is_allowed, OsRule, PlatformRule, RuleAction};
pub use tag::{Arch, Os, PlatformTag};

/// Placeholder expanded to each target platform's natives classifier.
pub const PLATFORM_PLACEHOLDER: &str = "${platform}";

/// Java classpath separator on `os`.
pub fn classpath_separator(os: Os) -> &'static str {
    match os {
        Os::Windows => ";",
        Os::Linux | Os::Macos => ":",
    }
}
