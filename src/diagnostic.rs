//! Translation of driver diagnostic records into typed errors.
//!
//! Every driver call returns a [`SqlResult`]. Anything outside success and
//! success-with-info pulls the first diagnostic record from the handle the call
//! was made on and turns it into an [`Error`], classified by the SQL state class:
//!
//! | class | error |
//! |-------|-------|
//! | `42`  | [`Error::Programming`] (syntax error or access violation) |
//! | `22`  | [`Error::Data`] (data exception) |
//! | other | [`Error::Database`] |

use crate::driver::{Driver, HandleRef, SqlResult};
use crate::error::{Error, Result};

/// A driver-reported diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Five-character SQL state, e.g. `42000`.
    pub state: String,
    /// Driver-specific native error code.
    pub native: i32,
    /// Free-text message.
    pub message: String,
}

impl DiagnosticRecord {
    /// Create a record from its SQL state, native code and message.
    pub fn new(state: impl Into<String>, native: i32, message: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            native,
            message: message.into(),
        }
    }

    /// Two-character class of the SQL state, if the state is long enough.
    pub fn class(&self) -> Option<&str> {
        self.state.get(..2)
    }

    /// Consume the record and classify it into an error.
    ///
    /// The record is moved in, so it is released exactly once whichever class
    /// it falls into.
    pub fn into_error(self) -> Error {
        let message = format!("[{}] {}", self.state, self.message);
        let sqlstate = Some(self.state.clone());
        match self.class() {
            Some("42") => Error::Programming { message, sqlstate },
            Some("22") => Error::Data { message, sqlstate },
            _ => Error::Database { message, sqlstate },
        }
    }
}

impl From<DiagnosticRecord> for Error {
    fn from(record: DiagnosticRecord) -> Self {
        record.into_error()
    }
}

/// Checks the outcome of a driver call at the point of call.
pub(crate) trait IntoResult<T> {
    /// `Ok(Some(value))` on success, `Ok(None)` on no-data, and the translated
    /// diagnostic of `handle` on error.
    fn into_result<D: Driver + ?Sized>(self, driver: &D, handle: HandleRef<'_, D>)
        -> Result<Option<T>>;

    /// Like [`into_result`](IntoResult::into_result) for calls that must
    /// produce output: no-data is an error as well.
    fn into_output<D: Driver + ?Sized>(self, driver: &D, handle: HandleRef<'_, D>) -> Result<T>
    where
        Self: Sized,
    {
        self.into_result(driver, handle)?
            .ok_or_else(|| Error::database("Driver call returned no data"))
    }
}

impl<T> IntoResult<T> for SqlResult<T> {
    fn into_result<D: Driver + ?Sized>(
        self,
        driver: &D,
        handle: HandleRef<'_, D>,
    ) -> Result<Option<T>> {
        match self {
            SqlResult::Success(value) => Ok(Some(value)),
            SqlResult::SuccessWithInfo(value) => {
                if let Some(info) = driver.diagnostic(handle) {
                    log::debug!("[{}:{}] {}", info.state, info.native, info.message);
                }
                Ok(Some(value))
            }
            SqlResult::NoData => Ok(None),
            SqlResult::Error { function } => {
                let kind = handle.handle_type();
                match driver.diagnostic(handle) {
                    Some(record) => Err(record.into_error()),
                    None => Err(Error::database(format!(
                        "{} failed on {:?} handle without diagnostic information",
                        function, kind
                    ))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_is_programming_error() {
        let record = DiagnosticRecord::new("42000", 102, "Incorrect syntax near 'FORM'.");
        match record.into_error() {
            Error::Programming { message, sqlstate } => {
                assert_eq!(message, "[42000] Incorrect syntax near 'FORM'.");
                assert_eq!(sqlstate.as_deref(), Some("42000"));
            }
            other => panic!("Expected Programming error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_object_is_programming_error() {
        let err = DiagnosticRecord::new("42S02", 208, "Invalid object name").into_error();
        assert!(matches!(err, Error::Programming { .. }));
        assert!(err.to_string().contains("42S02"));
    }

    #[test]
    fn test_data_exception_is_data_error() {
        let err = DiagnosticRecord::new("22003", 8115, "Arithmetic overflow").into_error();
        assert!(matches!(err, Error::Data { .. }));
        assert_eq!(err.to_string(), "[22003] Arithmetic overflow");
    }

    #[test]
    fn test_other_classes_are_database_errors() {
        for state in ["08001", "HY000", "24000", "01004"] {
            let err = DiagnosticRecord::new(state, 0, "failure").into_error();
            assert!(
                matches!(err, Error::Database { .. }),
                "state {} should map to a database error",
                state
            );
            assert_eq!(err.sqlstate(), Some(state));
        }
    }

    #[test]
    fn test_short_state_is_database_error() {
        let err = DiagnosticRecord::new("4", 0, "truncated state").into_error();
        assert!(matches!(err, Error::Database { .. }));
        assert_eq!(err.to_string(), "[4] truncated state");
    }

    #[test]
    fn test_into_result_status_mapping() {
        use crate::driver::mock::MockDriver;

        let driver = MockDriver::new();
        let env = match driver.initialize() {
            SqlResult::Success(env) => env,
            _ => panic!("initialize failed"),
        };

        let ok = SqlResult::Success(5).into_result(&driver, HandleRef::Environment(&env));
        assert_eq!(ok.unwrap(), Some(5));
        let info = SqlResult::SuccessWithInfo(6).into_result(&driver, HandleRef::Environment(&env));
        assert_eq!(info.unwrap(), Some(6));
        let none = SqlResult::<i32>::NoData.into_result(&driver, HandleRef::Environment(&env));
        assert_eq!(none.unwrap(), None);

        let err = SqlResult::<i32>::Error {
            function: "SQLSetEnvAttr",
        }
        .into_result(&driver, HandleRef::Environment(&env))
        .unwrap_err();
        assert!(matches!(err, Error::Database { .. }));
        assert!(err.to_string().contains("SQLSetEnvAttr"));

        let missing = SqlResult::<i32>::NoData.into_output(&driver, HandleRef::Environment(&env));
        assert!(missing.is_err());
    }

    #[test]
    fn test_class() {
        assert_eq!(DiagnosticRecord::new("22018", 0, "").class(), Some("22"));
        assert_eq!(DiagnosticRecord::new("", 0, "").class(), None);
    }
}
