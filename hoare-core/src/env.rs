#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use hoare_ast::{base_name, VarType};

/// Variable name to sort. `None` marks a variable whose sort is still being
/// inferred.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeEnv {
    vars: BTreeMap<String, Option<VarType>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_declared(vars: impl IntoIterator<Item = (String, VarType)>) -> Self {
        Self {
            vars: vars.into_iter().map(|(name, ty)| (name, Some(ty))).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// `None` if unbound, `Some(None)` if bound but not yet inferred.
    pub fn get(&self, name: &str) -> Option<Option<VarType>> {
        self.vars.get(name).copied()
    }

    /// Like [`TypeEnv::get`], but a forked or generated name (`x#1`, `x$0`)
    /// falls back to the sort of its base variable.
    pub fn get_or_base(&self, name: &str) -> Option<Option<VarType>> {
        self.get(name).or_else(|| self.get(base_name(name)))
    }

    /// Resolved sort of `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<VarType> {
        self.get_or_base(name).flatten()
    }

    pub fn bind(&mut self, name: impl Into<String>, ty: VarType) {
        self.vars.insert(name.into(), Some(ty));
    }

    pub fn declare_unknown(&mut self, name: impl Into<String>) {
        self.vars.entry(name.into()).or_insert(None);
    }

    pub(crate) fn set(&mut self, name: &str, ty: Option<VarType>) {
        self.vars.insert(name.to_string(), ty);
    }

    pub(crate) fn restore(&mut self, name: &str, previous: Option<Option<VarType>>) {
        match previous {
            Some(ty) => {
                self.vars.insert(name.to_string(), ty);
            }
            None => {
                self.vars.remove(name);
            }
        }
    }

    pub fn unresolved(&self) -> Vec<&str> {
        self.vars
            .iter()
            .filter(|(_, ty)| ty.is_none())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Fully resolved bindings in name order.
    pub fn resolved(&self) -> impl Iterator<Item = (&str, VarType)> {
        self.vars
            .iter()
            .filter_map(|(name, ty)| ty.map(|ty| (name.as_str(), ty)))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
