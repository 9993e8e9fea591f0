use std::result;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Any failure reported by the storage collaborator
    #[error("storage error: {path}: {message}")]
    Storage { path: String, message: String },

    /// A type code outside of the twelve recognized scalar kinds
    #[error("unrecognized type code {code}: {context}")]
    Type { code: i32, context: String },

    /// A variable whose layout differs between an input and the output
    #[error("schema mismatch: {path}: variable '{variable}': {reason}")]
    SchemaMismatch {
        path: String,
        variable: String,
        reason: String,
    },

    /// An axis that needs a coordinate variable to be resolved doesn't have one
    #[error(
        "not found: {path}: variable '{variable}', axis {axis}: \
         no coordinate variable for dimension '{dimension}'"
    )]
    NotFound {
        path: String,
        variable: String,
        axis: usize,
        dimension: String,
    },
}

impl Error {
    pub(crate) fn storage<P, M>(path: P, message: M) -> Self
    where
        P: Into<String>,
        M: Into<String>,
    {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn mismatch<P, V, R>(path: P, variable: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        Self::SchemaMismatch {
            path: path.into(),
            variable: variable.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let error = Error::NotFound {
            path: "a.nc".to_string(),
            variable: "precip".to_string(),
            axis: 1,
            dimension: "lat".to_string(),
        };
        let message = format!("{error}");
        assert!(message.contains("a.nc"));
        assert!(message.contains("precip"));
        assert!(message.contains("axis 1"));
        assert!(message.contains("'lat'"));

        let error = Error::Type {
            code: 13,
            context: "b.nc: variable 'x'".to_string(),
        };
        assert_eq!(
            format!("{error}"),
            "unrecognized type code 13: b.nc: variable 'x'"
        );
    }
}
