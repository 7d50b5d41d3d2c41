use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty { field: &'static str },
    TooManyMobiles { max: usize, actual: usize },
    InvalidPhoneNumber { input: String },
    InvalidCharacter { field: &'static str, input: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::TooManyMobiles { max, actual } => {
                write!(f, "too many mobile numbers: {actual} (max {max})")
            }
            Self::InvalidPhoneNumber { input } => write!(f, "invalid phone number: {input}"),
            Self::InvalidCharacter { field, input } => {
                write!(f, "{field} contains an invalid character: {input}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
