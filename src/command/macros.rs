//! `${name}` and `$name` macro expansion.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Name to value mapping used for environments and build variables.
pub type Variables = BTreeMap<String, String>;

static MACRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_.]+)\}|\$([A-Za-z0-9_]+)").expect("macro pattern is valid")
});

/// Replace macro references in `input` with values from `vars`.
///
/// References to names missing from `vars` are left as written.
#[must_use]
pub fn expand(input: &str, vars: &Variables) -> String {
    MACRO
        .replace_all(input, |caps: &Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            match vars.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Expand against the environment first, then against build variables.
#[must_use]
pub fn expand_two_pass(input: &str, environment: &Variables, build_vars: &Variables) -> String {
    let first = expand(input, environment);
    expand(&first, build_vars)
}
