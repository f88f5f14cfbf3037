#![forbid(unsafe_code)]

use std::fmt;

use hoare_ast::VarType;
use hoare_core::TypeError;
use hoare_parse::ParseError;
use miette::Diagnostic;
use thiserror::Error;

/// One variable's value in a counterexample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub ty: VarType,
    pub value: String,
}

/// A solver model refuting a verification condition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counterexample {
    /// Raw model as printed by the solver.
    pub model: Option<String>,
    /// Program variables in name order.
    pub bindings: Vec<Binding>,
}

impl Counterexample {
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.value.as_str())
    }
}

impl fmt::Display for Counterexample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bindings.is_empty() {
            return f.write_str("no model available");
        }
        f.write_str("failed when ")?;
        for (i, b) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", b.name, b.value)?;
        }
        Ok(())
    }
}

/// A disproved verification condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Refutation {
    pub label: String,
    /// The condition as it was sent to the solver.
    pub condition: String,
    pub counterexample: Counterexample,
}

impl fmt::Display for Refutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label, self.counterexample)
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum VerifyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Type(#[from] TypeError),

    #[error("invalid invariant: {0}")]
    #[diagnostic(
        code(hoare::verify::invariant),
        help("the loop invariant is not established on entry or not preserved by the body")
    )]
    InvalidInvariant(Box<Refutation>),

    #[error("verification failed: {0}")]
    #[diagnostic(code(hoare::verify::failure))]
    VerificationFailure(Box<Refutation>),

    #[error("unsupported construct: {0}")]
    #[diagnostic(code(hoare::verify::unsupported))]
    Unsupported(String),

    #[error("unknown verification scope `{0}`")]
    #[diagnostic(code(hoare::verify::scope), help("register the scope's variable types before verifying"))]
    UnknownScope(String),

    #[error("solver returned unknown for {label}: {reason}")]
    #[diagnostic(code(hoare::verify::unknown))]
    SolverUnknown { label: String, reason: String },

    #[error("{0}")]
    #[diagnostic(code(hoare::verify::backend))]
    Backend(String),
}

impl VerifyError {
    pub fn refutation(&self) -> Option<&Refutation> {
        match self {
            VerifyError::InvalidInvariant(r) | VerifyError::VerificationFailure(r) => Some(r),
            _ => None,
        }
    }
}
