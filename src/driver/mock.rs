//! In-memory [`Driver`] for tests and examples.
//!
//! Statements are scripted by their exact SQL text: a statement either produces
//! a result set, reports a number of affected rows, or fails with a diagnostic
//! record. Anything not scripted fails with SQL state `42000`.
//!
//! Fetching behaves like a real block cursor: the statement owns one buffer per
//! bound column sized `row_array_size * stride`, every `fetch` overwrites the
//! first `n` rows of it, and rows past `n` keep whatever the previous block left
//! there. Text longer than its cell is truncated and the indicator reports the
//! full length.
//!
//! ```
//! use odbc_cursor_rs::driver::mock::{MockColumn, MockDriver, MockResultSet};
//! use odbc_cursor_rs::Value;
//!
//! let driver = MockDriver::new().with_result(
//!     "SELECT id FROM t",
//!     MockResultSet::new(vec![MockColumn::integer("id")])
//!         .row(vec![Value::from(1)])
//!         .row(vec![Value::from(2)]),
//! );
//! let stats = driver.stats();
//! # let _ = (driver, stats);
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use bytes::BufMut;

use super::constants::*;
use super::{
    ColumnBinding, ColumnView, DescribedColumn, Driver, HandleRef, RowStatus, SqlResult,
};
use crate::decode::text::encode_wide;
use crate::decode::{DateStruct, NumericStruct, TimestampStruct};
use crate::diagnostic::DiagnosticRecord;
use crate::types::{TargetType, Value};

/// A column of a scripted result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockColumn {
    pub name: String,
    pub data_type: i16,
    pub column_size: usize,
    pub decimal_digits: i16,
    pub nullable: i16,
}

impl MockColumn {
    /// A column of any type code.
    pub fn new(name: impl Into<String>, data_type: i16, column_size: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            column_size,
            decimal_digits: 0,
            nullable: SQL_NULLABLE,
        }
    }

    /// An `INTEGER` column.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, SQL_INTEGER, 10)
    }

    /// A `BIGINT` column.
    pub fn bigint(name: impl Into<String>) -> Self {
        Self::new(name, SQL_BIGINT, 19)
    }

    /// A `BIT` column.
    pub fn bit(name: impl Into<String>) -> Self {
        Self::new(name, SQL_BIT, 1)
    }

    /// A `DOUBLE` column.
    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, SQL_DOUBLE, 15)
    }

    /// A `DECIMAL(precision, scale)` column.
    pub fn decimal(name: impl Into<String>, precision: usize, scale: i16) -> Self {
        Self {
            decimal_digits: scale,
            ..Self::new(name, SQL_DECIMAL, precision)
        }
    }

    /// A `CHAR(size)` column.
    pub fn char(name: impl Into<String>, size: usize) -> Self {
        Self::new(name, SQL_CHAR, size)
    }

    /// A `VARCHAR(size)` column; size 0 means unbounded.
    pub fn varchar(name: impl Into<String>, size: usize) -> Self {
        Self::new(name, SQL_VARCHAR, size)
    }

    /// A `WVARCHAR(size)` column.
    pub fn wvarchar(name: impl Into<String>, size: usize) -> Self {
        Self::new(name, SQL_WVARCHAR, size)
    }

    /// A `DATE` column.
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, SQL_TYPE_DATE, 10)
    }

    /// A timestamp column with `fractional_digits` digits of second fraction.
    pub fn timestamp(name: impl Into<String>, fractional_digits: i16) -> Self {
        let size = if fractional_digits > 0 {
            20 + fractional_digits as usize
        } else {
            19
        };
        Self {
            decimal_digits: fractional_digits,
            ..Self::new(name, SQL_TYPE_TIMESTAMP, size)
        }
    }

    /// Mark the column as `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.nullable = SQL_NO_NULLS;
        self
    }

    /// Set the raw nullability code reported by `describe_col`.
    pub fn with_nullability(mut self, nullable: i16) -> Self {
        self.nullable = nullable;
        self
    }
}

/// A scripted result set.
#[derive(Debug, Clone, Default)]
pub struct MockResultSet {
    pub columns: Vec<MockColumn>,
    pub rows: Vec<Vec<Value>>,
    /// Row count reported after execute; `-1` when not set.
    pub row_count: Option<i64>,
}

impl MockResultSet {
    /// An empty result set with the given columns.
    pub fn new(columns: Vec<MockColumn>) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    /// Append one row.
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    /// Append several rows.
    pub fn rows<I>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        self.rows.extend(rows);
        self
    }

    /// Override the reported row count.
    pub fn with_row_count(mut self, row_count: i64) -> Self {
        self.row_count = Some(row_count);
        self
    }
}

/// Call and handle counters shared between a [`MockDriver`] and the test that
/// created it.
#[derive(Debug, Default)]
pub struct MockStats {
    environments_allocated: AtomicUsize,
    environments_freed: AtomicUsize,
    connections_allocated: AtomicUsize,
    connections_freed: AtomicUsize,
    statements_allocated: AtomicUsize,
    statements_freed: AtomicUsize,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    executions: AtomicUsize,
    fetches: AtomicUsize,
    connection_string: Mutex<Option<String>>,
}

impl MockStats {
    /// Environment handles allocated so far.
    pub fn environments_allocated(&self) -> usize {
        self.environments_allocated.load(Ordering::Relaxed)
    }

    /// Environment handles freed so far.
    pub fn environments_freed(&self) -> usize {
        self.environments_freed.load(Ordering::Relaxed)
    }

    /// Connection handles allocated so far.
    pub fn connections_allocated(&self) -> usize {
        self.connections_allocated.load(Ordering::Relaxed)
    }

    /// Connection handles freed so far.
    pub fn connections_freed(&self) -> usize {
        self.connections_freed.load(Ordering::Relaxed)
    }

    /// Statement handles allocated so far.
    pub fn statements_allocated(&self) -> usize {
        self.statements_allocated.load(Ordering::Relaxed)
    }

    /// Statement handles freed so far.
    pub fn statements_freed(&self) -> usize {
        self.statements_freed.load(Ordering::Relaxed)
    }

    /// Successful connects so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }

    /// Disconnects so far.
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::Relaxed)
    }

    /// Number of `exec_direct` calls.
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::Relaxed)
    }

    /// Number of physical block fetches.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Connection string of the most recent connection attempt.
    pub fn last_connection_string(&self) -> Option<String> {
        self.connection_string
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    /// Whether every allocated handle has been released.
    pub fn all_released(&self) -> bool {
        self.environments_allocated() == self.environments_freed()
            && self.connections_allocated() == self.connections_freed()
            && self.statements_allocated() == self.statements_freed()
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Rows(MockResultSet),
    Affected(i64),
    Fail(DiagnosticRecord),
}

/// Scripted in-memory driver.
#[derive(Debug, Default)]
pub struct MockDriver {
    statements: HashMap<String, Outcome>,
    infos: HashMap<String, DiagnosticRecord>,
    connect_error: Option<DiagnosticRecord>,
    max_array_size: Option<usize>,
    stats: Arc<MockStats>,
}

impl MockDriver {
    /// A driver with no scripted statements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `sql` to produce `result`.
    pub fn with_result(mut self, sql: impl Into<String>, result: MockResultSet) -> Self {
        self.statements.insert(sql.into(), Outcome::Rows(result));
        self
    }

    /// Script `sql` to produce no result set and affect `rows` rows.
    pub fn with_rows_affected(mut self, sql: impl Into<String>, rows: i64) -> Self {
        self.statements.insert(sql.into(), Outcome::Affected(rows));
        self
    }

    /// Script `sql` to fail with `record`.
    pub fn with_error(mut self, sql: impl Into<String>, record: DiagnosticRecord) -> Self {
        self.statements.insert(sql.into(), Outcome::Fail(record));
        self
    }

    /// Make `sql` return success-with-info carrying `record`.
    pub fn with_info(mut self, sql: impl Into<String>, record: DiagnosticRecord) -> Self {
        self.infos.insert(sql.into(), record);
        self
    }

    /// Reject every connection attempt with `record`.
    pub fn refuse_connections(mut self, record: DiagnosticRecord) -> Self {
        self.connect_error = Some(record);
        self
    }

    /// Reject row-array sizes above `max` with SQL state `HY024`.
    pub fn with_max_array_size(mut self, max: usize) -> Self {
        self.max_array_size = Some(max);
        self
    }

    /// Counters shared with this driver.
    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }
}

/// Environment handle of [`MockDriver`].
#[derive(Debug)]
pub struct MockEnvironment {
    _private: (),
}

/// Connection handle of [`MockDriver`].
#[derive(Debug, Default)]
pub struct MockConnection {
    connected: bool,
    diag: RefCell<Option<DiagnosticRecord>>,
}

/// Statement handle of [`MockDriver`].
#[derive(Debug)]
pub struct MockStatement {
    array_size: usize,
    pending: Option<Pending>,
    bound: BTreeMap<u16, BoundColumn>,
    row_status: Vec<RowStatus>,
    row_count: i64,
    diag: RefCell<Option<DiagnosticRecord>>,
}

impl MockStatement {
    fn new() -> Self {
        Self {
            array_size: 1,
            pending: None,
            bound: BTreeMap::new(),
            row_status: vec![RowStatus::NoRow],
            row_count: -1,
            diag: RefCell::new(None),
        }
    }

    fn columns(&self) -> &[MockColumn] {
        self.pending
            .as_ref()
            .map(|p| p.result.columns.as_slice())
            .unwrap_or(&[])
    }

    /// Current row-array size.
    pub fn array_size(&self) -> usize {
        self.array_size
    }

    /// Number of columns with buffers bound.
    pub fn bound_columns(&self) -> usize {
        self.bound.len()
    }
}

#[derive(Debug)]
struct Pending {
    result: MockResultSet,
    position: usize,
}

#[derive(Debug)]
struct BoundColumn {
    binding: ColumnBinding,
    data: Vec<u8>,
    indicators: Vec<isize>,
}

impl BoundColumn {
    fn new(binding: ColumnBinding, rows: usize) -> Self {
        let mut bound = Self {
            binding,
            data: Vec::new(),
            indicators: Vec::new(),
        };
        bound.allocate(rows);
        bound
    }

    fn allocate(&mut self, rows: usize) {
        self.data = vec![0; rows * self.binding.stride];
        self.indicators = vec![0; rows];
    }

    /// Convert `value` into the cell of block row `row`.
    fn write(&mut self, row: usize, value: &Value) -> Result<(), (&'static str, String)> {
        let stride = self.binding.stride;
        let cell = &mut self.data[row * stride..(row + 1) * stride];
        let indicator = &mut self.indicators[row];

        match (self.binding.target, value) {
            (_, Value::Null) => *indicator = SQL_NULL_DATA,
            (TargetType::Integer, Value::Integer(v)) => {
                let mut buf = cell;
                buf.put_i64_ne(*v);
                *indicator = 8;
            }
            (TargetType::Double, Value::Double(v)) => {
                let mut buf = cell;
                buf.put_f64_ne(*v);
                *indicator = 8;
            }
            (TargetType::Double, Value::Integer(v)) => {
                let mut buf = cell;
                buf.put_f64_ne(*v as f64);
                *indicator = 8;
            }
            (TargetType::Date, Value::Date(d)) => {
                DateStruct::from_date(d).write(cell);
                *indicator = DateStruct::SIZE as isize;
            }
            (TargetType::Timestamp, Value::Timestamp(ts)) => {
                TimestampStruct::from_datetime(ts).write(cell);
                *indicator = TimestampStruct::SIZE as isize;
            }
            (TargetType::FixedPoint, Value::Decimal(d)) => {
                write_numeric(cell, &self.binding, d)?;
                *indicator = NumericStruct::SIZE as isize;
            }
            (TargetType::FixedPoint, Value::Integer(v)) => {
                write_numeric(cell, &self.binding, &BigDecimal::from(*v))?;
                *indicator = NumericStruct::SIZE as isize;
            }
            (TargetType::NarrowText, v) => {
                let bytes: Vec<u8> = v
                    .to_string()
                    .chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                    .collect();
                let copy = bytes.len().min(stride.saturating_sub(1));
                cell[..copy].copy_from_slice(&bytes[..copy]);
                if copy < stride {
                    cell[copy] = 0;
                }
                *indicator = bytes.len() as isize;
            }
            (TargetType::WideText, v) => {
                let bytes = encode_wide(&v.to_string());
                let copy = bytes.len().min(stride & !1);
                cell[..copy].copy_from_slice(&bytes[..copy]);
                *indicator = bytes.len() as isize;
            }
            (target, v) => {
                return Err((
                    "22018",
                    format!(
                        "Invalid character value for cast specification: {} to {:?}",
                        v.type_name(),
                        target
                    ),
                ))
            }
        }
        Ok(())
    }
}

fn write_numeric(
    cell: &mut [u8],
    binding: &ColumnBinding,
    value: &BigDecimal,
) -> Result<(), (&'static str, String)> {
    let numeric = NumericStruct::from_decimal(value, binding.precision, binding.scale as i8)
        .ok_or_else(|| ("22003", format!("Numeric value out of range: {}", value)))?;
    numeric.write(cell);
    Ok(())
}

fn fail<T>(
    slot: &RefCell<Option<DiagnosticRecord>>,
    function: &'static str,
    state: &str,
    message: impl Into<String>,
) -> SqlResult<T> {
    *slot.borrow_mut() = Some(DiagnosticRecord::new(state, 0, message));
    SqlResult::Error { function }
}

impl Driver for MockDriver {
    type Environment = MockEnvironment;
    type Connection = MockConnection;
    type Statement = MockStatement;

    fn initialize(&self) -> SqlResult<MockEnvironment> {
        MockStats::bump(&self.stats.environments_allocated);
        SqlResult::Success(MockEnvironment { _private: () })
    }

    fn free_environment(&self, _env: MockEnvironment) -> SqlResult<()> {
        MockStats::bump(&self.stats.environments_freed);
        SqlResult::Success(())
    }

    fn allocate_connection(&self, _env: &MockEnvironment) -> SqlResult<MockConnection> {
        MockStats::bump(&self.stats.connections_allocated);
        SqlResult::Success(MockConnection::default())
    }

    fn driver_connect(&self, dbc: &mut MockConnection, connection_string: &str) -> SqlResult<()> {
        dbc.diag.replace(None);
        if let Ok(mut last) = self.stats.connection_string.lock() {
            *last = Some(connection_string.to_string());
        }
        if let Some(record) = &self.connect_error {
            dbc.diag.replace(Some(record.clone()));
            return SqlResult::Error {
                function: "SQLDriverConnect",
            };
        }
        if dbc.connected {
            return fail(&dbc.diag, "SQLDriverConnect", "08002", "Connection name in use");
        }
        dbc.connected = true;
        MockStats::bump(&self.stats.connects);
        SqlResult::Success(())
    }

    fn disconnect(&self, dbc: &mut MockConnection) -> SqlResult<()> {
        dbc.diag.replace(None);
        if !dbc.connected {
            return fail(&dbc.diag, "SQLDisconnect", "08003", "Connection not open");
        }
        dbc.connected = false;
        MockStats::bump(&self.stats.disconnects);
        SqlResult::Success(())
    }

    fn free_connection(&self, dbc: MockConnection) -> SqlResult<()> {
        if dbc.connected {
            return fail(&dbc.diag, "SQLFreeHandle", "HY010", "Function sequence error");
        }
        MockStats::bump(&self.stats.connections_freed);
        SqlResult::Success(())
    }

    fn allocate_statement(&self, dbc: &MockConnection) -> SqlResult<MockStatement> {
        dbc.diag.replace(None);
        if !dbc.connected {
            return fail(&dbc.diag, "SQLAllocHandle", "08003", "Connection not open");
        }
        MockStats::bump(&self.stats.statements_allocated);
        SqlResult::Success(MockStatement::new())
    }

    fn free_statement(&self, _stmt: MockStatement) -> SqlResult<()> {
        MockStats::bump(&self.stats.statements_freed);
        SqlResult::Success(())
    }

    fn set_row_array_size(&self, stmt: &mut MockStatement, size: usize) -> SqlResult<()> {
        stmt.diag.replace(None);
        if size == 0 || self.max_array_size.is_some_and(|max| size > max) {
            return fail(&stmt.diag, "SQLSetStmtAttr", "HY024", "Invalid attribute value");
        }
        stmt.array_size = size;
        for bound in stmt.bound.values_mut() {
            bound.allocate(size);
        }
        stmt.row_status = vec![RowStatus::NoRow; size];
        SqlResult::Success(())
    }

    fn exec_direct(&self, stmt: &mut MockStatement, sql: &str) -> SqlResult<()> {
        stmt.diag.replace(None);
        MockStats::bump(&self.stats.executions);
        if stmt.pending.is_some() {
            return fail(&stmt.diag, "SQLExecDirect", "24000", "Invalid cursor state");
        }
        match self.statements.get(sql) {
            None => {
                return fail(
                    &stmt.diag,
                    "SQLExecDirect",
                    "42000",
                    format!("Syntax error or access violation: {}", sql),
                )
            }
            Some(Outcome::Fail(record)) => {
                stmt.diag.replace(Some(record.clone()));
                return SqlResult::Error {
                    function: "SQLExecDirect",
                };
            }
            Some(Outcome::Affected(rows)) => stmt.row_count = *rows,
            Some(Outcome::Rows(result)) => {
                stmt.row_count = result.row_count.unwrap_or(-1);
                stmt.pending = Some(Pending {
                    result: result.clone(),
                    position: 0,
                });
            }
        }
        match self.infos.get(sql) {
            Some(record) => {
                stmt.diag.replace(Some(record.clone()));
                SqlResult::SuccessWithInfo(())
            }
            None => SqlResult::Success(()),
        }
    }

    fn num_result_cols(&self, stmt: &MockStatement) -> SqlResult<u16> {
        SqlResult::Success(stmt.columns().len() as u16)
    }

    fn describe_col(&self, stmt: &MockStatement, column: u16) -> SqlResult<DescribedColumn> {
        stmt.diag.replace(None);
        let Some(col) = column
            .checked_sub(1)
            .and_then(|idx| stmt.columns().get(idx as usize))
        else {
            return fail(&stmt.diag, "SQLDescribeColW", "07009", "Invalid descriptor index");
        };

        let units: Vec<u16> = col.name.encode_utf16().collect();
        let mut name = vec![0u16; NAME_CAPACITY];
        let copy = units.len().min(NAME_CAPACITY);
        name[..copy].copy_from_slice(&units[..copy]);

        SqlResult::Success(DescribedColumn {
            name,
            name_length: units.len().min(i16::MAX as usize) as i16,
            data_type: col.data_type,
            column_size: col.column_size,
            decimal_digits: col.decimal_digits,
            nullable: col.nullable,
        })
    }

    fn bind_col(&self, stmt: &mut MockStatement, binding: &ColumnBinding) -> SqlResult<()> {
        stmt.diag.replace(None);
        if binding.column == 0 || binding.column as usize > stmt.columns().len() {
            return fail(&stmt.diag, "SQLBindCol", "07009", "Invalid descriptor index");
        }
        if binding.c_type != binding.target.c_type() {
            return fail(&stmt.diag, "SQLBindCol", "HY003", "Invalid application buffer type");
        }
        if binding.stride == 0 {
            return fail(&stmt.diag, "SQLBindCol", "HY090", "Invalid string or buffer length");
        }
        stmt.bound.insert(
            binding.column,
            BoundColumn::new(binding.clone(), stmt.array_size),
        );
        SqlResult::Success(())
    }

    fn fetch(&self, stmt: &mut MockStatement) -> SqlResult<usize> {
        stmt.diag.replace(None);
        MockStats::bump(&self.stats.fetches);
        let Some(pending) = stmt.pending.as_mut() else {
            return fail(&stmt.diag, "SQLFetch", "24000", "Invalid cursor state");
        };

        let remaining = pending.result.rows.len().saturating_sub(pending.position);
        if remaining == 0 {
            return SqlResult::NoData;
        }
        let fetched = remaining.min(stmt.array_size);
        for i in 0..fetched {
            let row = &pending.result.rows[pending.position + i];
            for bound in stmt.bound.values_mut() {
                let value = row
                    .get(bound.binding.column as usize - 1)
                    .unwrap_or(&Value::Null);
                if let Err((state, message)) = bound.write(i, value) {
                    return fail(&stmt.diag, "SQLFetch", state, message);
                }
            }
        }
        pending.position += fetched;
        for (i, status) in stmt.row_status.iter_mut().enumerate() {
            *status = if i < fetched {
                RowStatus::Success
            } else {
                RowStatus::NoRow
            };
        }
        SqlResult::Success(fetched)
    }

    fn column_data<'s>(&self, stmt: &'s MockStatement, column: u16) -> Option<ColumnView<'s>> {
        stmt.bound
            .get(&column)
            .map(|b| ColumnView::new(&b.data, &b.indicators))
    }

    fn row_status<'s>(&self, stmt: &'s MockStatement) -> &'s [RowStatus] {
        &stmt.row_status
    }

    fn row_count(&self, stmt: &MockStatement) -> SqlResult<i64> {
        SqlResult::Success(stmt.row_count)
    }

    fn free_results(&self, stmt: &mut MockStatement) -> SqlResult<()> {
        stmt.diag.replace(None);
        stmt.pending = None;
        stmt.bound.clear();
        SqlResult::Success(())
    }

    fn diagnostic(&self, handle: HandleRef<'_, Self>) -> Option<DiagnosticRecord> {
        match handle {
            HandleRef::Environment(_) => None,
            HandleRef::Connection(dbc) => dbc.diag.borrow().clone(),
            HandleRef::Statement(stmt) => stmt.diag.borrow().clone(),
        }
    }
}
