mod conversions;
mod types;

pub use types::{
    ClientIdentifierResponse, LoginAttemptStatusResponse, LoginFailureResponse,
    WriteBudgetDecisionResponse,
};
