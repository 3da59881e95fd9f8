//! Licensing gate
//!
//! Printing and connecting are license-gated features. The verification
//! machinery is an external collaborator; the core only consumes a boolean
//! eligibility check and short-circuits with `NotEligible` when it is false.

/// Boolean eligibility gate consulted before any printer operation
pub trait EligibilityGate: Send + Sync {
    fn has_eligibility(&self) -> bool;
}

/// Gate that always passes (development, tests, unrestricted builds)
#[derive(Debug, Default)]
pub struct AlwaysEligible;

impl EligibilityGate for AlwaysEligible {
    fn has_eligibility(&self) -> bool {
        true
    }
}

/// Fixed-answer gate, handy for exercising the denial path
#[derive(Debug)]
pub struct StaticGate(pub bool);

impl EligibilityGate for StaticGate {
    fn has_eligibility(&self) -> bool {
        self.0
    }
}
