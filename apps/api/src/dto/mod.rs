mod common;
mod guard;

pub use common::{HealthDependencyStatus, HealthResponse};
pub use guard::{
    ClientIdentifierResponse, LoginAttemptStatusResponse, LoginFailureResponse,
    WriteBudgetDecisionResponse,
};
