#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sort of a program variable. Arrays are integer-indexed and hold integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Int,
    Bool,
    Array,
}

impl VarType {
    pub fn display(&self) -> &'static str {
        match self {
            VarType::Int => "int",
            VarType::Bool => "bool",
            VarType::Array => "array",
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

impl FromStr for VarType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" | "Int" => Ok(VarType::Int),
            "bool" | "Bool" => Ok(VarType::Bool),
            "array" | "Array" => Ok(VarType::Array),
            other => Err(format!("unknown type `{other}`")),
        }
    }
}
