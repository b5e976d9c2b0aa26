//! Database cursors over a call-based data-source driver layer.
//!
//! The crate sits on top of an ODBC-style [`Driver`](driver::Driver): it opens
//! connections, executes statements and fetches result rows in blocks of
//! `arraysize` rows into driver-owned column buffers, decoding them into typed
//! [`Value`]s. Driver diagnostics surface as typed [`Error`]s classified by SQL
//! state.
//!
//! # Example
//!
//! ```
//! use odbc_cursor_rs::driver::mock::{MockColumn, MockDriver, MockResultSet};
//! use odbc_cursor_rs::{connect, ConnectOptions, Result, TypeCode, Value};
//!
//! fn main() -> Result<()> {
//!     let driver = MockDriver::new().with_result(
//!         "SELECT id, name FROM users",
//!         MockResultSet::new(vec![MockColumn::integer("id"), MockColumn::varchar("name", 20)])
//!             .row(vec![Value::from(1), Value::from("ada")])
//!             .row(vec![Value::from(2), Value::from("grace")]),
//!     );
//!
//!     let conn = connect(driver, ConnectOptions::new().with_param("dsn", "users"))?;
//!     let mut cursor = conn.cursor()?;
//!     cursor.set_arraysize(100)?;
//!     cursor.execute("SELECT id, name FROM users")?;
//!
//!     let description = cursor.description().unwrap_or_default();
//!     assert_eq!(description[0].type_code, TypeCode::Integer);
//!
//!     for row in cursor.fetch_all()? {
//!         println!("{} {}", row[0], row[1]);
//!     }
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod cursor;
pub mod decode;
pub mod diagnostic;
pub mod driver;
pub mod error;
pub mod options;
pub mod types;

// Re-export main types
pub use connection::Connection;
pub use cursor::{Cursor, Rows};
pub use diagnostic::DiagnosticRecord;
pub use driver::Driver;
pub use error::{Error, Result};
pub use options::ConnectOptions;
pub use types::{ColumnDescription, ColumnDescriptor, Nullability, Row, TargetType, TypeCode, Value};

/// DB-API level this interface follows.
pub const APILEVEL: &str = "2.0";

/// Threads may not share the module.
pub const THREADSAFETY: u8 = 0;

/// Parameter marker style.
pub const PARAMSTYLE: &str = "qmark";

/// Open a connection; shorthand for [`Connection::connect`].
pub fn connect<D: Driver>(driver: D, options: impl Into<ConnectOptions>) -> Result<Connection<D>> {
    Connection::connect(driver, options)
}
