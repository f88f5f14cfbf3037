#![forbid(unsafe_code)]

use std::collections::BTreeMap;

/// Separator between a user-visible name and a generated suffix.
/// It is not an identifier character, so generated names never clash
/// with names written in source.
pub const FRESH_SEP: char = '$';

/// Separator used by callers that fork variables into copies (`x#1`, `x#2`).
pub const FORK_SEP: char = '#';

/// Per-call supply of fresh variable names of the form `base$N`.
#[derive(Clone, Debug, Default)]
pub struct FreshNames {
    counters: BTreeMap<String, usize>,
}

impl FreshNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, name: &str) -> String {
        let base = base_name(name);
        let n = self.counters.entry(base.to_string()).or_insert(0);
        let out = format!("{base}{FRESH_SEP}{n}");
        *n += 1;
        out
    }
}

/// Strip a generated or forked suffix: `x$3` and `x#1` both map to `x`.
pub fn base_name(name: &str) -> &str {
    match name.find([FRESH_SEP, FORK_SEP]) {
        Some(idx) => &name[..idx],
        None => name,
    }
}

pub fn is_generated(name: &str) -> bool {
    name.contains(FRESH_SEP)
}
