use std::fmt::{self, Display};

use thiserror::Error as ThisError;
use warp::reject::{Reject, Rejection};

/// Broad outcome classes, each mapping to one HTTP status.
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("Invalid request")]
    InvalidRequest,

    #[error("Authentication credentials were not provided")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("A record with these values already exists")]
    Conflict,

    #[error("Internal server error")]
    InternalServerError,
}

impl ErrorKind {
    pub fn code(&self) -> u16 {
        match self {
            ErrorKind::InvalidRequest | ErrorKind::Conflict => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::InternalServerError => 500,
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            kind: self,
            code: self.code(),
            info: Some(info.to_string()),
        }
    }

    pub fn default(self) -> Error {
        Error {
            kind: self,
            code: self.code(),
            info: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: u16,
    pub info: Option<String>,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.info {
            Some(info) => write!(f, "{info}"),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Error {}
impl Reject for Error {}

#[derive(Debug)]
pub struct QueryError {
    info: String,
    conflict: bool,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            conflict: false,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => Self {
                conflict: e.code().is_some_and(|code| code == "23505"),
                info: format!("{e}"),
            },
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        if value.conflict {
            return ErrorKind::Conflict.default();
        }

        log::error!("Query failed: {}", value.info);
        ErrorKind::InternalServerError.new(&value.info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        ErrorKind::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl From<TypeError> for Rejection {
    fn from(value: TypeError) -> Self {
        warp::reject::custom(Error::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(ErrorKind::InvalidRequest.new("bad").code, 400);
        assert_eq!(ErrorKind::Conflict.default().code, 400);
        assert_eq!(ErrorKind::Unauthorized.default().code, 401);
        assert_eq!(ErrorKind::NotFound.default().code, 404);
        assert_eq!(ErrorKind::InternalServerError.default().code, 500);
    }

    #[test]
    fn display_prefers_info_over_kind() {
        assert_eq!(ErrorKind::NotFound.new("No recipe").to_string(), "No recipe");
        assert_eq!(ErrorKind::NotFound.default().to_string(), "Not found");
    }

    #[test]
    fn type_errors_become_invalid_requests() {
        let error: Error = TypeError::new("title: This field is required").into();
        assert_eq!(error.kind, ErrorKind::InvalidRequest);
        assert_eq!(error.to_string(), "title: This field is required");
    }

    #[test]
    fn errors_are_recoverable_from_rejections() {
        let rejection: Rejection = ErrorKind::NotFound.new("No recipe").into();
        let error = rejection.find::<Error>().unwrap();
        assert_eq!(error.code, 404);
        assert_eq!(error.to_string(), "No recipe");

        let rejection: Rejection = TypeError::new("name: This field is required").into();
        assert_eq!(rejection.find::<Error>().unwrap().kind, ErrorKind::InvalidRequest);
    }

    #[test]
    fn non_database_query_errors_are_internal() {
        let error: Error = QueryError::from(sqlx::Error::PoolTimedOut).into();
        assert_eq!(error.kind, ErrorKind::InternalServerError);
        assert_eq!(error.to_string(), "Pool timed out");
    }
}
