use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderBuildError {
    #[error("Invalid SQL identifier `{0}` (expected letters, digits and underscores, not starting with a digit)")]
    InvalidIdentifier(String),

    #[error("Cannot evaluate expression: {0}")]
    UnsupportedExpression(String),

    #[error("Unknown column `{0}` while evaluating expression")]
    UnknownColumn(String),

    #[error("Unknown table or CTE `{0}` while evaluating plan")]
    UnknownTable(String),

    #[error("Unbound query parameter @{0}")]
    UnboundParameter(String),
}
