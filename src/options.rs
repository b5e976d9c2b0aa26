//! Connection options.

use std::fmt;

/// Keywords whose values are never shown by `Debug`.
const SECRET_KEYS: [&str; 2] = ["PWD", "PASSWORD"];

/// Parameters used to open a [`Connection`](crate::Connection).
///
/// Either an explicit connection string, or a list of `KEYWORD=value` pairs that
/// is turned into one. Keywords are upper-cased and kept in insertion order.
///
/// # Example
///
/// ```
/// use odbc_cursor_rs::ConnectOptions;
///
/// let options = ConnectOptions::new()
///     .with_driver("{ODBC Driver 18 for SQL Server}")
///     .with_server("localhost")
///     .with_user("sa")
///     .with_password("secret");
/// assert_eq!(
///     options.connection_string(),
///     "DRIVER={ODBC Driver 18 for SQL Server};SERVER=localhost;UID=sa;PWD=secret"
/// );
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    params: Vec<(String, String)>,
    connection_string: Option<String>,
}

impl ConnectOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `connection_string` as is. Keyword parameters are ignored once an
    /// explicit connection string is set.
    pub fn with_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = Some(connection_string.into());
        self
    }

    /// Set a keyword parameter. Setting a keyword again replaces its value in place.
    pub fn with_param(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        let key = key.as_ref().to_uppercase();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    /// Set the `DRIVER` keyword.
    pub fn with_driver(self, driver: impl Into<String>) -> Self {
        self.with_param("DRIVER", driver)
    }

    /// Set the `SERVER` keyword.
    pub fn with_server(self, server: impl Into<String>) -> Self {
        self.with_param("SERVER", server)
    }

    /// Set the `PORT` keyword.
    pub fn with_port(self, port: u16) -> Self {
        self.with_param("PORT", port.to_string())
    }

    /// Set the `DATABASE` keyword.
    pub fn with_database(self, database: impl Into<String>) -> Self {
        self.with_param("DATABASE", database)
    }

    /// Set the user name (`UID`).
    pub fn with_user(self, user: impl Into<String>) -> Self {
        self.with_param("UID", user)
    }

    /// Set the password (`PWD`).
    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.with_param("PWD", password)
    }

    /// Value of a keyword parameter (case-insensitive).
    pub fn param(&self, key: &str) -> Option<&str> {
        let key = key.to_uppercase();
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether an explicit connection string was given.
    pub fn has_connection_string(&self) -> bool {
        self.connection_string.is_some()
    }

    /// The connection string handed to the driver.
    pub fn connection_string(&self) -> String {
        match &self.connection_string {
            Some(explicit) => explicit.clone(),
            None => self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

fn is_secret(key: &str) -> bool {
    SECRET_KEYS
        .iter()
        .any(|secret| key.trim().eq_ignore_ascii_case(secret))
}

fn masked(connection_string: &str) -> String {
    connection_string
        .split(';')
        .map(|part| match part.split_once('=') {
            Some((key, _)) if is_secret(key) => format!("{}=***", key),
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| {
                let shown = if is_secret(k) { "***" } else { v.as_str() };
                (k.as_str(), shown)
            })
            .collect();
        f.debug_struct("ConnectOptions")
            .field("params", &params)
            .field(
                "connection_string",
                &self.connection_string.as_deref().map(masked),
            )
            .finish()
    }
}

impl From<&str> for ConnectOptions {
    fn from(connection_string: &str) -> Self {
        Self::new().with_connection_string(connection_string)
    }
}

impl From<String> for ConnectOptions {
    fn from(connection_string: String) -> Self {
        Self::new().with_connection_string(connection_string)
    }
}
