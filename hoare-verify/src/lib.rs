#![forbid(unsafe_code)]

mod context;
mod error;
mod loops;
mod solver;
#[cfg(feature = "z3")]
mod translate;
mod vc;
mod verify;
mod wp;

pub use context::{Registry, VerificationContext};
pub use error::{Binding, Counterexample, Refutation, VerifyError};
pub use loops::{encode_loops, EncodedLoop, LoopEncoding};
pub use solver::{NoZ3Prover, Prover, SmtProfile, Verdict, VerifyOptions, TIMEOUT_ENV};
#[cfg(feature = "z3")]
pub use solver::z3_prover::Z3Prover;
#[cfg(feature = "z3")]
pub use translate::SmtBridge;
pub use vc::{Vc, VcKind};
pub use verify::{ProofNote, SourceTranslator, VerificationReport, VerificationStatus, Verifier};
pub use wp::wp;
