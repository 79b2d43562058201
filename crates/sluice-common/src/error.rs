use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ColumnNotFound(String),
    InvalidLiteral(String),
    InvalidFunction(String),
    TypeMismatch { expected: String, actual: String },
    InvalidPlan(String),
    UnsupportedFeature(String),
    Internal(String),
}

impl Error {
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Error::ColumnNotFound(name.into())
    }

    pub fn invalid_literal(msg: impl Into<String>) -> Self {
        Error::InvalidLiteral(msg.into())
    }

    pub fn invalid_function(msg: impl Into<String>) -> Self {
        Error::InvalidFunction(msg.into())
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_plan(msg: impl Into<String>) -> Self {
        Error::InvalidPlan(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::UnsupportedFeature(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ColumnNotFound(name) => write!(f, "Column not found: {}", name),
            Error::InvalidLiteral(msg) => write!(f, "Invalid literal: {}", msg),
            Error::InvalidFunction(msg) => write!(f, "Invalid function: {}", msg),
            Error::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, actual)
            }
            Error::InvalidPlan(msg) => write!(f, "Invalid plan: {}", msg),
            Error::UnsupportedFeature(msg) => write!(f, "Unsupported feature: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let e = Error::column_not_found("t.a");
        assert!(matches!(e, Error::ColumnNotFound(_)));

        let e = Error::invalid_literal("abc");
        assert!(matches!(e, Error::InvalidLiteral(_)));

        let e = Error::invalid_function("eq expects 2 arguments");
        assert!(matches!(e, Error::InvalidFunction(_)));

        let e = Error::type_mismatch("INT64", "STRING");
        match e {
            Error::TypeMismatch { expected, actual } => {
                assert_eq!(expected, "INT64");
                assert_eq!(actual, "STRING");
            }
            _ => panic!("expected TypeMismatch"),
        }

        let e = Error::invalid_plan("dangling child");
        assert!(matches!(e, Error::InvalidPlan(_)));

        let e = Error::unsupported("full outer join");
        assert!(matches!(e, Error::UnsupportedFeature(_)));

        let e = Error::internal("internal error");
        assert!(matches!(e, Error::Internal(_)));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", Error::ColumnNotFound("t.a".to_string())),
            "Column not found: t.a"
        );
        assert_eq!(
            format!("{}", Error::InvalidLiteral("abc".to_string())),
            "Invalid literal: abc"
        );
        assert_eq!(
            format!("{}", Error::InvalidFunction("test".to_string())),
            "Invalid function: test"
        );
        assert_eq!(
            format!("{}", Error::type_mismatch("BOOL", "STRING")),
            "Type mismatch: expected BOOL, got STRING"
        );
        assert_eq!(
            format!("{}", Error::InvalidPlan("test".to_string())),
            "Invalid plan: test"
        );
        assert_eq!(
            format!("{}", Error::UnsupportedFeature("test".to_string())),
            "Unsupported feature: test"
        );
        assert_eq!(
            format!("{}", Error::Internal("test".to_string())),
            "Internal error: test"
        );
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(Error::column_not_found("x"));
        assert!(e.to_string().contains("Column not found"));
    }
}
