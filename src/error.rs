use std::fmt;

#[derive(Debug)]
pub enum BlockPrintError {
    /// A layout attribute failed structural validation.
    InvalidValue { field: String, reason: String },
    /// A dynamic attribute could not be resolved or parsed.
    Expression { template: String, reason: String },
    UnplaceableFlowable(String),
    InvalidConfiguration(String),
    Io(std::io::Error),
}

impl BlockPrintError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        BlockPrintError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn expression(template: impl Into<String>, reason: impl Into<String>) -> Self {
        BlockPrintError::Expression {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Field name for validation failures, `None` for every other kind.
    pub fn field(&self) -> Option<&str> {
        match self {
            BlockPrintError::InvalidValue { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for BlockPrintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockPrintError::InvalidValue { field, reason } => {
                write!(f, "invalid value for {}: {}", field, reason)
            }
            BlockPrintError::Expression { template, reason } => {
                write!(f, "cannot evaluate '{}': {}", template, reason)
            }
            BlockPrintError::UnplaceableFlowable(message) => {
                write!(f, "flowable cannot fit on any page: {}", message)
            }
            BlockPrintError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            BlockPrintError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for BlockPrintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlockPrintError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BlockPrintError {
    fn from(value: std::io::Error) -> Self {
        BlockPrintError::Io(value)
    }
}
