//! Call-site enforcement of minimum calibration scores.
//!
//! [`enforce`] builds an [`EnforcementPolicy`] that calibrates a subject
//! before letting a wrapped call run. With `enforce = true` a score below the
//! minimum, or a method the engine does not know, blocks the call. With
//! `enforce = false` the same conditions are logged and the call proceeds.

use mcal_core::{MethodId, Role};

use crate::error::EngineError;
use crate::orchestrator::CalibrationOrchestrator;
use crate::result::CalibrationResult;
use crate::subject::CalibrationSubject;

/// Why a guarded call was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationEnforcementError {
    #[error("method '{method}' scored {score:.4}, below the required {min_score:.4}")]
    BelowThreshold {
        method: MethodId,
        score: f64,
        min_score: f64,
        result: Box<CalibrationResult>,
    },

    #[error("method '{method}' is not registered for calibration")]
    UnknownMethod { method: MethodId },

    #[error("calibration of '{method}' failed: {source}")]
    CalibrationFailed {
        method: MethodId,
        #[source]
        source: EngineError,
    },
}

/// A call that was allowed to run, with the calibration that admitted it.
///
/// `calibration` is `None` only when enforcement is off and calibration
/// itself failed.
#[derive(Debug, Clone, PartialEq)]
pub struct Guarded<T> {
    pub value: T,
    pub calibration: Option<CalibrationResult>,
}

/// Minimum score, role and strictness applied at one call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnforcementPolicy {
    pub min_score: f64,
    pub role: Role,
    pub enforce: bool,
}

/// Builds a policy for guarding calls.
pub fn enforce(min_score: f64, role: Role, enforce: bool) -> EnforcementPolicy {
    EnforcementPolicy {
        min_score,
        role,
        enforce,
    }
}

impl EnforcementPolicy {
    /// Calibrates `subject`, then runs `call` if the policy allows it.
    pub fn guard<T>(
        &self,
        orchestrator: &CalibrationOrchestrator,
        subject: &CalibrationSubject<'_>,
        call: impl FnOnce() -> T,
    ) -> Result<Guarded<T>, CalibrationEnforcementError> {
        let method = &subject.method_id;
        let calibration = match orchestrator.calibrate(subject, self.role) {
            Ok(result) if result.passes(self.min_score) => Some(result),
            Ok(result) => {
                if self.enforce {
                    tracing::warn!(
                        %method,
                        score = result.final_score,
                        min_score = self.min_score,
                        "call rejected: calibration below threshold"
                    );
                    return Err(CalibrationEnforcementError::BelowThreshold {
                        method: method.clone(),
                        score: result.final_score,
                        min_score: self.min_score,
                        result: Box::new(result),
                    });
                }
                tracing::warn!(
                    %method,
                    score = result.final_score,
                    min_score = self.min_score,
                    "calibration below threshold, proceeding"
                );
                Some(result)
            }
            Err(EngineError::UnknownMethod { .. }) => {
                if self.enforce {
                    tracing::warn!(%method, "call rejected: method not registered");
                    return Err(CalibrationEnforcementError::UnknownMethod {
                        method: method.clone(),
                    });
                }
                tracing::warn!(%method, "method not registered, proceeding uncalibrated");
                None
            }
            Err(source) => {
                if self.enforce {
                    tracing::warn!(%method, error = %source, "call rejected: calibration failed");
                    return Err(CalibrationEnforcementError::CalibrationFailed {
                        method: method.clone(),
                        source,
                    });
                }
                tracing::warn!(%method, error = %source, "calibration failed, proceeding");
                None
            }
        };

        Ok(Guarded {
            value: call(),
            calibration,
        })
    }

    /// Wraps `f` so that every invocation is guarded by this policy.
    pub fn wrap<'o, A, T, F>(
        self,
        orchestrator: &'o CalibrationOrchestrator,
        f: F,
    ) -> impl Fn(&CalibrationSubject<'_>, A) -> Result<Guarded<T>, CalibrationEnforcementError> + 'o
    where
        A: 'o,
        T: 'o,
        F: Fn(A) -> T + 'o,
    {
        move |subject: &CalibrationSubject<'_>, args: A| {
            self.guard(orchestrator, subject, || f(args))
        }
    }
}
