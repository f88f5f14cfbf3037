#![forbid(unsafe_code)]

use crate::context::VerificationContext;
use crate::error::{Counterexample, VerifyError};
use crate::vc::Vc;

/// Outcome of checking one verification condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// The negated condition is unsatisfiable.
    Valid,
    /// The solver found a model of the negated condition.
    Refuted(Counterexample),
    /// The solver gave up; carries its reason.
    Unknown(String),
}

/// Decides the validity of verification conditions.
///
/// A session spans one `verify` call: `begin` sees the resolved context
/// before the first condition and `end` runs after the last one, whether or
/// not verification succeeded. Conditions are checked one at a time and must
/// not observe each other's assertions.
pub trait Prover {
    fn begin(&mut self, _cx: &VerificationContext) -> Result<(), VerifyError> {
        Ok(())
    }

    fn check_valid(&mut self, vc: &Vc, cx: &VerificationContext) -> Result<Verdict, VerifyError>;

    fn end(&mut self) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SmtProfile {
    /// Short per-condition timeout for interactive use.
    Fast,
    /// CI-friendly medium timeout.
    #[default]
    Ci,
    /// Generous timeout for nonlinear or heavily quantified conditions.
    Thorough,
}

impl SmtProfile {
    pub fn timeout_ms(self) -> u32 {
        match self {
            SmtProfile::Fast => 500,
            SmtProfile::Ci => 2_000,
            SmtProfile::Thorough => 10_000,
        }
    }
}

pub const TIMEOUT_ENV: &str = "HOARE_Z3_TIMEOUT_MS";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Per-condition solver timeout.
    pub timeout_ms: u32,
}

impl VerifyOptions {
    pub fn from_profile(profile: SmtProfile) -> Self {
        Self {
            timeout_ms: profile.timeout_ms(),
        }
    }

    /// Profile defaults, with the timeout overridable through
    /// `HOARE_Z3_TIMEOUT_MS`.
    pub fn from_env(profile: SmtProfile) -> Self {
        Self::from_profile(profile).with_timeout_override(std::env::var(TIMEOUT_ENV).ok().as_deref())
    }

    /// Replace the timeout with `raw` if it is a valid millisecond count;
    /// anything else keeps the current value.
    pub fn with_timeout_override(mut self, raw: Option<&str>) -> Self {
        if let Some(ms) = raw.and_then(|v| v.trim().parse::<u32>().ok()) {
            self.timeout_ms = ms;
        }
        self
    }
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self::from_env(SmtProfile::default())
    }
}

/// Fallback prover when compiled without `--features hoare-verify/z3`.
///
/// This keeps the workspace buildable on machines without Z3.
pub struct NoZ3Prover;

impl Prover for NoZ3Prover {
    fn check_valid(&mut self, _vc: &Vc, _cx: &VerificationContext) -> Result<Verdict, VerifyError> {
        Err(VerifyError::Backend(
            "Z3 prover is not enabled. Rebuild with `--features hoare-verify/z3`.".to_string(),
        ))
    }
}

#[cfg(feature = "z3")]
pub mod z3_prover {
    use super::{Prover, Verdict, VerifyOptions};
    use crate::context::VerificationContext;
    use crate::error::{Counterexample, VerifyError};
    use crate::translate::SmtBridge;
    use crate::vc::Vc;

    use tracing::debug;
    use z3::{Config, Context, Params, SatResult, Solver};

    struct Z3Session {
        solver: Solver<'static>,
        bridge: SmtBridge<'static>,
    }

    pub struct Z3Prover {
        ctx: &'static Context,
        options: VerifyOptions,
        session: Option<Z3Session>,
    }

    impl Z3Prover {
        pub fn new() -> Self {
            Self::with_options(VerifyOptions::default())
        }

        pub fn with_options(options: VerifyOptions) -> Self {
            let mut cfg = Config::new();
            cfg.set_model_generation(true);
            // Leaked so the session can hold `'static` solver terms without a
            // self-referential struct.
            let ctx: &'static Context = Box::leak(Box::new(Context::new(&cfg)));
            Self {
                ctx,
                options,
                session: None,
            }
        }

        fn open_session(&self, cx: &VerificationContext) -> Z3Session {
            let solver = Solver::new(self.ctx);
            let mut params = Params::new(self.ctx);
            params.set_u32("timeout", self.options.timeout_ms);
            params.set_u32("smt.random_seed", 0);
            solver.set_params(&params);
            Z3Session {
                solver,
                bridge: SmtBridge::new(self.ctx, &cx.env, &cx.array_lengths),
            }
        }
    }

    impl Default for Z3Prover {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Prover for Z3Prover {
        fn begin(&mut self, cx: &VerificationContext) -> Result<(), VerifyError> {
            self.session = Some(self.open_session(cx));
            Ok(())
        }

        fn check_valid(&mut self, vc: &Vc, cx: &VerificationContext) -> Result<Verdict, VerifyError> {
            if self.session.is_none() {
                self.session = Some(self.open_session(cx));
            }
            let Some(session) = self.session.as_mut() else {
                return Err(VerifyError::Backend("solver session unavailable".to_string()));
            };

            let goal = session.bridge.translate_bool(&vc.expr)?;
            let solver = &session.solver;
            solver.push();
            solver.assert(&goal.not());
            let verdict = match solver.check() {
                SatResult::Unsat => Verdict::Valid,
                SatResult::Sat => {
                    let model = solver.get_model();
                    Verdict::Refuted(Counterexample {
                        model: model.as_ref().map(|m| m.to_string()),
                        bindings: model
                            .as_ref()
                            .map(|m| session.bridge.bindings(m))
                            .unwrap_or_default(),
                    })
                }
                SatResult::Unknown => Verdict::Unknown(
                    solver
                        .get_reason_unknown()
                        .unwrap_or_else(|| "no reason given".to_string()),
                ),
            };
            solver.pop(1);
            debug!(label = %vc.label, ?verdict, "z3 check");
            Ok(verdict)
        }

        fn end(&mut self) {
            self.session = None;
        }
    }
}
