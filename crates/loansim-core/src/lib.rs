pub mod error;
pub mod schedule;
pub mod time_value;
pub mod types;

pub use error::LoanSimError;
pub use schedule::{
    compute_schedule, BalancePoint, LoanTerms, Overrides, ScheduleInput, ScheduleOutput,
    ScheduleRow,
};
pub use types::*;

/// Standard result type for all loansim operations
pub type LoanSimResult<T> = Result<T, LoanSimError>;
