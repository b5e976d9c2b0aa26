//! The driver-layer boundary.
//!
//! A [`Driver`] is the call-based data-source API the cursor engine is built on:
//! handles in, status codes and fixed-size native buffers out. The engine never
//! talks to a SQL engine directly; it allocates handles, binds one buffer per
//! result column and decodes whatever the driver wrote into those buffers.
//!
//! [`mock::MockDriver`] implements the trait in memory for tests.

pub mod constants;
pub mod mock;

use crate::diagnostic::DiagnosticRecord;
use crate::types::TargetType;
use constants::*;

/// Outcome of a driver call: the status code together with the call's output.
///
/// `Success` and `SuccessWithInfo` both carry the output. `Error` names the
/// failing function; its details are retrieved through [`Driver::diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlResult<T> {
    Success(T),
    SuccessWithInfo(T),
    NoData,
    Error { function: &'static str },
}

impl<T> SqlResult<T> {
    /// Raw return code of this outcome.
    pub fn return_code(&self) -> i16 {
        match self {
            SqlResult::Success(_) => SQL_SUCCESS,
            SqlResult::SuccessWithInfo(_) => SQL_SUCCESS_WITH_INFO,
            SqlResult::NoData => SQL_NO_DATA,
            SqlResult::Error { .. } => SQL_ERROR,
        }
    }

    /// Whether the call succeeded, with or without info.
    pub fn is_success(&self) -> bool {
        matches!(self, SqlResult::Success(_) | SqlResult::SuccessWithInfo(_))
    }
}

/// Kind of handle a diagnostic record is requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleType {
    Environment,
    Connection,
    Statement,
}

/// Borrowed reference to one of a driver's handles, tagged with its type.
pub enum HandleRef<'a, D: Driver + ?Sized> {
    Environment(&'a D::Environment),
    Connection(&'a D::Connection),
    Statement(&'a D::Statement),
}

impl<D: Driver + ?Sized> HandleRef<'_, D> {
    /// Type of the referenced handle.
    pub fn handle_type(&self) -> HandleType {
        match self {
            HandleRef::Environment(_) => HandleType::Environment,
            HandleRef::Connection(_) => HandleType::Connection,
            HandleRef::Statement(_) => HandleType::Statement,
        }
    }
}

/// Raw output of describing one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedColumn {
    /// Fixed-capacity name buffer ([`NAME_CAPACITY`] code units). Only the first
    /// `name_length` units are meaningful; the rest is not a terminator scan area.
    pub name: Vec<u16>,
    /// Length of the name in code units as reported by the driver. May exceed
    /// the buffer capacity when the name was truncated.
    pub name_length: i16,
    /// Driver type code.
    pub data_type: i16,
    /// Declared column size.
    pub column_size: usize,
    /// Declared decimal digits (scale for fixed-point columns).
    pub decimal_digits: i16,
    /// Raw nullability code.
    pub nullable: i16,
}

/// Parameters of a column binding: where the driver should materialize one
/// result column and in which layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    /// 1-based column ordinal.
    pub column: u16,
    /// Layout the driver converts values into.
    pub target: TargetType,
    /// C data type code of `target`, as passed to the driver's bind call.
    pub c_type: i16,
    /// Bytes per row in the data buffer.
    pub stride: usize,
    /// Precision for fixed-point targets.
    pub precision: u8,
    /// Scale for fixed-point targets.
    pub scale: i16,
}

/// Non-owning view of a bound column's buffers for the current block.
///
/// `data` holds `row_array_size * stride` bytes and `indicators` holds one
/// length/NULL indicator per row. The view borrows from the statement handle and
/// is only valid until the next driver call that mutates the statement.
#[derive(Debug, Clone, Copy)]
pub struct ColumnView<'a> {
    pub data: &'a [u8],
    pub indicators: &'a [isize],
}

impl<'a> ColumnView<'a> {
    /// Create a view over a data buffer and its indicators.
    pub fn new(data: &'a [u8], indicators: &'a [isize]) -> Self {
        Self { data, indicators }
    }

    /// Number of rows the buffers have room for.
    pub fn rows(&self) -> usize {
        self.indicators.len()
    }
}

/// Per-row status the driver reports for a fetched block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowStatus {
    Success,
    SuccessWithInfo,
    Error,
    #[default]
    NoRow,
}

/// The call surface the cursor engine consumes.
///
/// Handles are plain values owned by the caller: a `Connection` owns its
/// environment and connection handles, a `Cursor` owns its statement handle. The
/// `free_*` calls consume the handle so it cannot be released twice.
///
/// Buffers are allocated by the driver on `bind_col` and owned by the statement
/// handle. They must keep their size and address until `free_results`,
/// `set_row_array_size` or `free_statement` is called on that statement.
pub trait Driver {
    type Environment;
    type Connection;
    type Statement;

    /// Allocate and initialize an environment handle.
    fn initialize(&self) -> SqlResult<Self::Environment>;

    /// Release an environment handle.
    fn free_environment(&self, env: Self::Environment) -> SqlResult<()>;

    /// Allocate a connection handle on an environment.
    fn allocate_connection(&self, env: &Self::Environment) -> SqlResult<Self::Connection>;

    /// Open a connection using a full connection string.
    fn driver_connect(&self, dbc: &mut Self::Connection, connection_string: &str)
        -> SqlResult<()>;

    /// Close an open connection. The handle stays allocated.
    fn disconnect(&self, dbc: &mut Self::Connection) -> SqlResult<()>;

    /// Release a connection handle.
    fn free_connection(&self, dbc: Self::Connection) -> SqlResult<()>;

    /// Allocate a statement handle on an open connection.
    fn allocate_statement(&self, dbc: &Self::Connection) -> SqlResult<Self::Statement>;

    /// Release a statement handle and every buffer bound to it.
    fn free_statement(&self, stmt: Self::Statement) -> SqlResult<()>;

    /// Set how many rows a single `fetch` materializes. Buffers already bound are
    /// reallocated to the new size.
    fn set_row_array_size(&self, stmt: &mut Self::Statement, size: usize) -> SqlResult<()>;

    /// Execute a statement directly, without preparation.
    fn exec_direct(&self, stmt: &mut Self::Statement, sql: &str) -> SqlResult<()>;

    /// Number of columns in the pending result set (0 when there is none).
    fn num_result_cols(&self, stmt: &Self::Statement) -> SqlResult<u16>;

    /// Describe the 1-based `column` of the pending result set.
    fn describe_col(&self, stmt: &Self::Statement, column: u16) -> SqlResult<DescribedColumn>;

    /// Allocate buffers for a column and bind them to the statement.
    fn bind_col(&self, stmt: &mut Self::Statement, binding: &ColumnBinding) -> SqlResult<()>;

    /// Fetch the next block of rows into the bound buffers. Returns the number of
    /// rows written, at most the row-array size.
    fn fetch(&self, stmt: &mut Self::Statement) -> SqlResult<usize>;

    /// Borrow the buffers bound to `column`, if any.
    fn column_data<'s>(&self, stmt: &'s Self::Statement, column: u16) -> Option<ColumnView<'s>>;

    /// Per-row status of the last fetched block.
    fn row_status<'s>(&self, stmt: &'s Self::Statement) -> &'s [RowStatus];

    /// Rows affected by the last statement, or -1 when unknown.
    fn row_count(&self, stmt: &Self::Statement) -> SqlResult<i64>;

    /// Discard any pending result set and release bound buffers.
    ///
    /// Must succeed when nothing is pending.
    fn free_results(&self, stmt: &mut Self::Statement) -> SqlResult<()>;

    /// Retrieve the first diagnostic record of a handle. The record is handed
    /// over to the caller; dropping it releases it.
    fn diagnostic(&self, handle: HandleRef<'_, Self>) -> Option<DiagnosticRecord>;
}
