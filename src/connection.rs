//! Connections to a data source.

use crate::cursor::Cursor;
use crate::diagnostic::IntoResult;
use crate::driver::{Driver, HandleRef, SqlResult};
use crate::error::{Error, Result};
use crate::options::ConnectOptions;

/// An open connection: one environment handle and one connection handle of a
/// [`Driver`].
///
/// Cursors borrow the connection, so it cannot be closed or dropped while a
/// cursor is alive. Handles are released exactly once, by [`close`](Self::close)
/// or on drop.
///
/// # Example
///
/// ```
/// use odbc_cursor_rs::driver::mock::{MockColumn, MockDriver, MockResultSet};
/// use odbc_cursor_rs::{Connection, ConnectOptions, Value};
///
/// let driver = MockDriver::new().with_result(
///     "SELECT 42",
///     MockResultSet::new(vec![MockColumn::integer("")]).row(vec![Value::from(42)]),
/// );
/// let options = ConnectOptions::new().with_param("dsn", "mock");
/// let conn = Connection::connect(driver, options)?;
///
/// let mut cursor = conn.cursor()?;
/// let row = cursor.execute("SELECT 42")?.fetch_one()?;
/// assert_eq!(row.unwrap()[0], Value::Integer(42));
/// # Ok::<(), odbc_cursor_rs::Error>(())
/// ```
pub struct Connection<D: Driver> {
    driver: D,
    env: Option<D::Environment>,
    dbc: Option<D::Connection>,
    /// Whether `driver_connect` succeeded and `disconnect` is still owed.
    connected: bool,
}

impl<D: Driver> Connection<D> {
    /// Open a connection.
    ///
    /// `options` is either a [`ConnectOptions`] or a connection string. Handles
    /// allocated before a failing step are released before the error is
    /// returned.
    pub fn connect(driver: D, options: impl Into<ConnectOptions>) -> Result<Self> {
        let options = options.into();

        let env = match driver.initialize() {
            SqlResult::Success(env) | SqlResult::SuccessWithInfo(env) => env,
            _ => {
                return Err(Error::database(
                    "Failed to allocate the driver environment handle",
                ))
            }
        };
        let mut conn = Self {
            driver,
            env: Some(env),
            dbc: None,
            connected: false,
        };

        let env = conn.environment()?;
        let dbc = conn
            .driver
            .allocate_connection(env)
            .into_output(&conn.driver, HandleRef::Environment(env))?;
        let dbc = conn.dbc.insert(dbc);

        conn.driver
            .driver_connect(dbc, &options.connection_string())
            .into_result(&conn.driver, HandleRef::Connection(&*dbc))?;
        conn.connected = true;
        log::debug!("Connection established");

        Ok(conn)
    }

    /// Create a new cursor on this connection.
    pub fn cursor(&self) -> Result<Cursor<'_, D>> {
        Cursor::new(self)
    }

    /// Close the connection: disconnect, then release the connection and
    /// environment handles.
    ///
    /// Closing an already closed connection does nothing. When several steps
    /// fail, the first error is returned; later steps still run.
    pub fn close(&mut self) -> Result<()> {
        let mut first_error = None;

        if let Some(mut dbc) = self.dbc.take() {
            if self.connected {
                self.connected = false;
                if let Err(e) = self
                    .driver
                    .disconnect(&mut dbc)
                    .into_result(&self.driver, HandleRef::Connection(&dbc))
                {
                    first_error = first_error.or(Some(e));
                }
            }
            if !self.driver.free_connection(dbc).is_success() {
                first_error =
                    first_error.or(Some(Error::database("Failed to free the connection handle")));
            }
        }

        if let Some(env) = self.env.take() {
            if !self.driver.free_environment(env).is_success() {
                first_error =
                    first_error.or(Some(Error::database("Failed to free the environment handle")));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                log::debug!("Connection closed");
                Ok(())
            }
        }
    }

    /// Commit the current transaction. Statements run in auto-commit mode, so
    /// there is nothing to do.
    pub fn commit(&self) -> Result<()> {
        Ok(())
    }

    /// Roll back the current transaction. Statements run in auto-commit mode,
    /// so there is nothing to do.
    pub fn rollback(&self) -> Result<()> {
        Ok(())
    }

    /// Check if the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.dbc.is_none()
    }

    /// The driver this connection was opened with.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn environment(&self) -> Result<&D::Environment> {
        self.env
            .as_ref()
            .ok_or_else(|| Error::programming("Connection is closed"))
    }

    /// Connection handle, for allocating statements.
    pub(crate) fn handle(&self) -> Result<&D::Connection> {
        match &self.dbc {
            Some(dbc) if self.connected => Ok(dbc),
            _ => Err(Error::programming("Connection is closed")),
        }
    }
}

impl<D: Driver> Drop for Connection<D> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::debug!("Error while closing connection: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticRecord;
    use crate::driver::mock::MockDriver;

    #[test]
    fn test_connect_and_close_releases_handles() {
        let driver = MockDriver::new();
        let stats = driver.stats();

        let mut conn = Connection::connect(driver, "DSN=mock").unwrap();
        assert!(!conn.is_closed());
        assert_eq!(stats.connects(), 1);
        assert_eq!(stats.last_connection_string().as_deref(), Some("DSN=mock"));

        conn.close().unwrap();
        assert!(conn.is_closed());
        assert_eq!(stats.disconnects(), 1);
        assert!(stats.all_released());

        // Second close is a no-op.
        conn.close().unwrap();
        assert_eq!(stats.disconnects(), 1);
        assert_eq!(stats.environments_freed(), 1);
    }

    #[test]
    fn test_drop_releases_handles() {
        let driver = MockDriver::new();
        let stats = driver.stats();
        {
            let _conn = Connection::connect(driver, "DSN=mock").unwrap();
        }
        assert_eq!(stats.disconnects(), 1);
        assert!(stats.all_released());
    }

    #[test]
    fn test_refused_connection_releases_handles() {
        let driver = MockDriver::new().refuse_connections(DiagnosticRecord::new(
            "08001",
            17,
            "Server does not exist or access denied.",
        ));
        let stats = driver.stats();

        let err = Connection::connect(driver, "DSN=nowhere").err().unwrap();
        assert!(matches!(err, Error::Database { .. }));
        assert_eq!(err.sqlstate(), Some("08001"));
        assert!(err.to_string().starts_with("[08001]"));

        assert_eq!(stats.environments_allocated(), 1);
        assert_eq!(stats.connections_allocated(), 1);
        assert_eq!(stats.disconnects(), 0);
        assert!(stats.all_released());
    }

    #[test]
    fn test_cursor_on_closed_connection() {
        let mut conn = Connection::connect(MockDriver::new(), "DSN=mock").unwrap();
        conn.close().unwrap();
        let err = conn.cursor().err().unwrap();
        assert!(matches!(err, Error::Programming { .. }));
    }

    #[test]
    fn test_commit_and_rollback_are_noops() {
        let conn = Connection::connect(MockDriver::new(), "DSN=mock").unwrap();
        conn.commit().unwrap();
        conn.rollback().unwrap();
    }
}
