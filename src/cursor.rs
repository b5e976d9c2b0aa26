//! Cursor with row-array fetching.
//!
//! A [`Cursor`] owns one statement handle. Executing a statement describes the
//! result columns and binds one driver-owned buffer per column, sized for
//! `arraysize` rows. Fetching then works block-wise: one physical fetch fills up
//! to `arraysize` rows at once, and the following calls decode rows out of the
//! buffers by position until the block is used up.
//!
//! ```text
//!   fetch_one()          row_pos   rows_fetched
//!   ---------------------------------------------
//!   physical fetch  ->      0           n
//!   decode row 0            1           n
//!   decode row 1            2           n
//!   ...
//!   row_pos == n  or wraps to 0 at arraysize -> next physical fetch
//! ```
//!
//! Rows past `rows_fetched` in the buffers are stale leftovers of an earlier
//! block and are never decoded.

use std::sync::Arc;

use crate::connection::Connection;
use crate::decode::decode_value;
use crate::diagnostic::IntoResult;
use crate::driver::{Driver, HandleRef, RowStatus};
use crate::error::{Error, Result};
use crate::types::{ColumnDescription, ColumnDescriptor, Row, Value};

/// Per-execute state of a cursor.
struct ResultState {
    /// Descriptors of the bound result columns, in column order.
    columns: Vec<ColumnDescriptor>,
    /// `None` until a statement was executed successfully.
    description: Option<Arc<[ColumnDescription]>>,
    rowcount: i64,
    /// Rows the driver delivered for the current block.
    rows_fetched: usize,
    /// Next row of the current block to decode.
    row_pos: usize,
    /// Set once the driver reported no more rows; cleared by the next execute.
    exhausted: bool,
}

impl ResultState {
    fn new() -> Self {
        Self {
            columns: Vec::new(),
            description: None,
            rowcount: -1,
            rows_fetched: 0,
            row_pos: 0,
            exhausted: false,
        }
    }

    /// Forget the current block so the next fetch starts a new one.
    fn reset_block(&mut self) {
        self.rows_fetched = 0;
        self.row_pos = 0;
    }
}

fn cursor_closed() -> Error {
    Error::programming("Cursor is closed")
}

/// A database cursor.
///
/// Created by [`Connection::cursor`]. A cursor can be executed any number of
/// times; each execute discards whatever the previous one left unread.
pub struct Cursor<'conn, D: Driver> {
    conn: &'conn Connection<D>,
    /// `None` once closed.
    stmt: Option<D::Statement>,
    arraysize: usize,
    state: ResultState,
}

impl<'conn, D: Driver> Cursor<'conn, D> {
    pub(crate) fn new(conn: &'conn Connection<D>) -> Result<Self> {
        let dbc = conn.handle()?;
        let driver = conn.driver();
        let stmt = driver
            .allocate_statement(dbc)
            .into_output(driver, HandleRef::Connection(dbc))?;

        let mut cursor = Self {
            conn,
            stmt: Some(stmt),
            arraysize: 1,
            state: ResultState::new(),
        };
        cursor.apply_arraysize(1)?;
        Ok(cursor)
    }

    fn statement(&self) -> Result<&D::Statement> {
        self.stmt.as_ref().ok_or_else(cursor_closed)
    }

    fn apply_arraysize(&mut self, size: usize) -> Result<()> {
        let driver = self.conn.driver();
        let stmt = self.stmt.as_mut().ok_or_else(cursor_closed)?;
        driver
            .set_row_array_size(stmt, size)
            .into_result(driver, HandleRef::Statement(&*stmt))?;
        self.arraysize = size;
        self.state.reset_block();
        Ok(())
    }

    /// Number of rows fetched per physical fetch, and the default of
    /// [`fetch_many`](Self::fetch_many). Defaults to 1.
    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    /// Change the number of rows fetched per physical fetch.
    ///
    /// Fails with [`Error::ArraySizeType`] when `size` is not an integer and
    /// with [`Error::InvalidArraySize`] when it is not positive; the size is
    /// left unchanged in both cases. Rows left in the current block are
    /// discarded.
    ///
    /// ```
    /// # use odbc_cursor_rs::driver::mock::MockDriver;
    /// # use odbc_cursor_rs::{connect, Error};
    /// # let conn = connect(MockDriver::new(), "DSN=mock")?;
    /// let mut cursor = conn.cursor()?;
    /// cursor.set_arraysize(100)?;
    /// assert!(matches!(cursor.set_arraysize(0), Err(Error::InvalidArraySize { .. })));
    /// assert!(matches!(cursor.set_arraysize("10"), Err(Error::ArraySizeType { .. })));
    /// assert_eq!(cursor.arraysize(), 100);
    /// # Ok::<(), Error>(())
    /// ```
    pub fn set_arraysize(&mut self, size: impl Into<Value>) -> Result<()> {
        self.statement()?;
        let size = match size.into() {
            Value::Integer(n) if n > 0 => {
                usize::try_from(n).map_err(|_| Error::InvalidArraySize { value: n })?
            }
            Value::Integer(n) => return Err(Error::InvalidArraySize { value: n }),
            other => {
                return Err(Error::ArraySizeType {
                    found: other.type_name(),
                })
            }
        };
        self.apply_arraysize(size)
    }

    /// Rows affected by the last execute, or -1 when unknown.
    pub fn rowcount(&self) -> i64 {
        self.state.rowcount
    }

    /// Description of the result columns of the last execute.
    ///
    /// `None` before the first successful execute; empty when the last
    /// statement produced no result set.
    pub fn description(&self) -> Option<&[ColumnDescription]> {
        self.state.description.as_deref()
    }

    /// Per-row status the driver reported for the current block.
    pub fn row_status(&self) -> &[RowStatus] {
        match &self.stmt {
            Some(stmt) => self.conn.driver().row_status(stmt),
            None => &[],
        }
    }

    /// Check if the cursor has been closed.
    pub fn is_closed(&self) -> bool {
        self.stmt.is_none()
    }

    /// The connection this cursor was created on.
    pub fn connection(&self) -> &'conn Connection<D> {
        self.conn
    }

    /// Execute a statement.
    ///
    /// Unread rows of the previous execute are discarded. For statements that
    /// produce rows, every result column is described and bound; the rows are
    /// then read with the `fetch_*` methods.
    pub fn execute(&mut self, sql: &str) -> Result<&mut Self> {
        let driver = self.conn.driver();
        let stmt = self.stmt.as_mut().ok_or_else(cursor_closed)?;
        self.state = ResultState::new();

        driver
            .free_results(stmt)
            .into_result(driver, HandleRef::Statement(&*stmt))?;
        log::debug!("Executing: {}", sql);
        driver
            .exec_direct(stmt, sql)
            .into_result(driver, HandleRef::Statement(&*stmt))?;

        let count = driver
            .num_result_cols(stmt)
            .into_output(driver, HandleRef::Statement(&*stmt))?;
        let mut columns = Vec::with_capacity(count as usize);
        for ordinal in 1..=count {
            let described = driver
                .describe_col(stmt, ordinal)
                .into_output(driver, HandleRef::Statement(&*stmt))?;
            let column = ColumnDescriptor::from_described(ordinal, &described);
            log::trace!(
                "Binding column {} ({:?}) type {} as {:?}, stride {}",
                ordinal,
                column.name,
                column.data_type,
                column.target,
                column.stride()
            );
            driver
                .bind_col(stmt, &column.binding())
                .into_result(driver, HandleRef::Statement(&*stmt))?;
            columns.push(column);
        }

        let rowcount = driver
            .row_count(stmt)
            .into_output(driver, HandleRef::Statement(&*stmt))?;
        log::debug!(
            "Executed: {} result columns, rowcount {}",
            columns.len(),
            rowcount
        );

        self.state.description = Some(columns.iter().map(ColumnDescriptor::description).collect());
        self.state.columns = columns;
        self.state.rowcount = rowcount;
        Ok(self)
    }

    /// Execute a statement with parameters.
    ///
    /// Parameter binding is not supported: an empty parameter set runs the
    /// statement as is, anything else fails before reaching the driver.
    pub fn execute_with_params(&mut self, sql: &str, params: &[Value]) -> Result<&mut Self> {
        self.statement()?;
        if !params.is_empty() {
            return Err(Error::NotSupported {
                feature: "parameterized execution",
            });
        }
        self.execute(sql)
    }

    /// Execute a statement once per parameter set, stopping at the first failure.
    pub fn execute_many<I, P>(&mut self, sql: &str, param_sets: I) -> Result<()>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[Value]>,
    {
        self.statement()?;
        for params in param_sets {
            self.execute_with_params(sql, params.as_ref())?;
        }
        Ok(())
    }

    /// Fail unless the last execute produced a result set.
    fn check_result_set(&self) -> Result<()> {
        self.statement()?;
        match &self.state.description {
            None => Err(Error::programming(
                "No result set: no statement has been executed",
            )),
            Some(description) if description.is_empty() => Err(Error::programming(
                "No result set: the last statement did not produce rows",
            )),
            Some(_) => Ok(()),
        }
    }

    /// Fetch the next row, or `None` once the result set is exhausted.
    pub fn fetch_one(&mut self) -> Result<Option<Row>> {
        self.check_result_set()?;
        if self.state.exhausted {
            return Ok(None);
        }

        let driver = self.conn.driver();
        let stmt = self.stmt.as_mut().ok_or_else(cursor_closed)?;
        let state = &mut self.state;

        if state.row_pos == 0 || state.row_pos >= state.rows_fetched {
            let fetched = driver
                .fetch(stmt)
                .into_result(driver, HandleRef::Statement(&*stmt))?;
            match fetched {
                Some(n) if n > 0 => {
                    log::trace!("Fetched block of {} rows", n);
                    state.rows_fetched = n;
                    state.row_pos = 0;
                }
                _ => {
                    log::trace!("Result set exhausted");
                    state.exhausted = true;
                    state.reset_block();
                    return Ok(None);
                }
            }
        }

        let stmt = &*stmt;
        let row = state.row_pos;
        let values = state
            .columns
            .iter()
            .map(|column| {
                let view = driver.column_data(stmt, column.ordinal).ok_or_else(|| {
                    Error::interface(format!("No buffer bound for column {}", column.ordinal))
                })?;
                decode_value(column, &view, row)
            })
            .collect::<Result<Vec<_>>>()?;

        state.row_pos += 1;
        if state.row_pos == self.arraysize {
            state.row_pos = 0;
        }

        let description = state
            .description
            .clone()
            .ok_or_else(|| Error::programming("No result set"))?;
        Ok(Some(Row::new(values, description)))
    }

    /// Fetch up to `size` rows (default: [`arraysize`](Self::arraysize)).
    ///
    /// Returns fewer rows when the result set runs out; never pads.
    pub fn fetch_many(&mut self, size: impl Into<Option<usize>>) -> Result<Vec<Row>> {
        self.check_result_set()?;
        let size = size.into().unwrap_or(self.arraysize);
        let mut rows = Vec::with_capacity(size.min(self.arraysize.max(1)));
        while rows.len() < size {
            match self.fetch_one()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    /// Fetch all remaining rows.
    pub fn fetch_all(&mut self) -> Result<Vec<Row>> {
        self.check_result_set()?;
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_one()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Iterate over the remaining rows.
    ///
    /// The iterator ends after the last row or after the first error.
    pub fn rows(&mut self) -> Rows<'_, 'conn, D> {
        Rows {
            cursor: self,
            done: false,
        }
    }

    /// Close the cursor and release its statement handle.
    ///
    /// Closing a closed cursor does nothing. Afterwards every operation except
    /// `close` and the plain getters fails.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut stmt) = self.stmt.take() else {
            return Ok(());
        };
        let driver = self.conn.driver();
        self.state.reset_block();

        let freed = driver
            .free_results(&mut stmt)
            .into_result(driver, HandleRef::Statement(&stmt));
        let released = driver.free_statement(stmt);
        freed?;
        if !released.is_success() {
            return Err(Error::database("Failed to free the statement handle"));
        }
        Ok(())
    }
}

impl<D: Driver> Drop for Cursor<'_, D> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::debug!("Error while closing cursor: {}", e);
        }
    }
}

/// Iterator over the remaining rows of a cursor, created by [`Cursor::rows`].
pub struct Rows<'c, 'conn, D: Driver> {
    cursor: &'c mut Cursor<'conn, D>,
    done: bool,
}

impl<D: Driver> Iterator for Rows<'_, '_, D> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.fetch_one() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
