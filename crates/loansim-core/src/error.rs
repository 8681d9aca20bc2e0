use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanSimError {
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },
}
