#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use hoare_ast::{FreshNames, VarType};
use hoare_core::TypeEnv;
use serde::{Deserialize, Serialize};

/// Declared variable sorts per verification scope.
///
/// Serialized as `{"scope": {"x": "int", "a": "array"}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    scopes: BTreeMap<String, BTreeMap<String, VarType>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(src: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(src)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Register (or replace) the variable sorts of `scope`.
    pub fn register<N: Into<String>>(&mut self, scope: impl Into<String>, vars: impl IntoIterator<Item = (N, VarType)>) {
        let vars = vars.into_iter().map(|(name, ty)| (name.into(), ty)).collect();
        self.scopes.insert(scope.into(), vars);
    }

    pub fn scope(&self, scope: &str) -> Option<&BTreeMap<String, VarType>> {
        self.scopes.get(scope)
    }

    /// Fresh type environment seeded from `scope`'s declarations.
    pub fn env_for(&self, scope: &str) -> Option<TypeEnv> {
        self.scope(scope)
            .map(|vars| TypeEnv::from_declared(vars.iter().map(|(n, t)| (n.clone(), *t))))
    }
}

/// State owned by a single `verify` call and threaded through every stage.
#[derive(Clone, Debug)]
pub struct VerificationContext {
    pub scope: String,
    pub env: TypeEnv,
    pub fresh: FreshNames,
    /// Known lengths of array variables, used to bound open-ended slices.
    pub array_lengths: BTreeMap<String, i64>,
}

impl VerificationContext {
    pub fn new(scope: impl Into<String>, env: TypeEnv, array_lengths: BTreeMap<String, i64>) -> Self {
        Self {
            scope: scope.into(),
            env,
            fresh: FreshNames::new(),
            array_lengths,
        }
    }
}
