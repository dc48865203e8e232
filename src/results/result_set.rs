use std::collections::HashMap;
use std::sync::Arc;

use crate::datatype::DecodeContext;
use crate::error::{PgFluentError, ResultError};
use crate::session::ResultHandle;
use crate::types::PgValue;

use super::factory::{self, RowMode};
use super::row::{ColumnMeta, Row};

/// A query result owning its server result handle.
///
/// The handle is released exactly once, either by [`free`](Self::free) or
/// when the result set is dropped; reads after release report
/// [`ResultError::AlreadyFreed`].
pub struct ResultSet {
    handle: Option<Box<dyn ResultHandle>>,
    meta: Arc<ColumnMeta>,
    ctx: Arc<DecodeContext>,
    mode: RowMode,
    cursor: usize,
}

impl std::fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("freed", &self.handle.is_none())
            .field("meta", &self.meta)
            .field("mode", &self.mode)
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl ResultSet {
    pub(crate) fn new(
        handle: Box<dyn ResultHandle>,
        ctx: Arc<DecodeContext>,
        mode: RowMode,
    ) -> Self {
        let names = handle.column_names().to_vec();
        let oids = (0..names.len())
            .map(|i| handle.column_type_oid(i).unwrap_or(0))
            .collect();
        Self {
            handle: Some(handle),
            meta: Arc::new(ColumnMeta::new(names, oids)),
            ctx,
            mode,
            cursor: 0,
        }
    }

    fn handle(&self) -> Result<&dyn ResultHandle, ResultError> {
        self.handle.as_deref().ok_or(ResultError::AlreadyFreed)
    }

    /// Number of rows in the result.
    pub fn row_count(&self) -> Result<usize, PgFluentError> {
        Ok(self.handle()?.row_count())
    }

    /// Number of rows affected by a DML statement.
    pub fn affected_rows(&self) -> Result<usize, PgFluentError> {
        Ok(self.handle()?.affected_rows())
    }

    /// Column names in result order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.meta.names()
    }

    /// Fetch the next row of the forward cursor, `None` once exhausted.
    pub fn fetch(&mut self) -> Result<Option<Row>, PgFluentError> {
        if self.cursor >= self.handle()?.row_count() {
            return Ok(None);
        }
        let row = self.read_row(self.cursor)?;
        self.cursor += 1;
        Ok(Some(row))
    }

    /// Read a row by index without moving the cursor.
    pub fn row(&self, idx: usize) -> Result<Row, PgFluentError> {
        self.read_row(idx)
    }

    /// All rows, optionally a window of them.
    pub fn fetch_all(
        &self,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<Row>, PgFluentError> {
        let total = self.handle()?.row_count();
        let start = offset.unwrap_or(0).min(total);
        let end = match limit {
            Some(limit) => (start + limit).min(total),
            None => total,
        };
        (start..end).map(|idx| self.read_row(idx)).collect()
    }

    /// First column of the next row, `None` once exhausted.
    pub fn fetch_single(&mut self) -> Result<Option<PgValue>, PgFluentError> {
        let Some(mut row) = self.fetch()? else {
            return Ok(None);
        };
        let column = self
            .meta
            .names()
            .first()
            .cloned()
            .ok_or_else(|| ResultError::NoColumn(String::from("<first>")))?;
        Ok(Some(row.get(&column)?.clone()))
    }

    /// Project all rows to `(key, value)` pairs; defaults are the first and
    /// second column.
    pub fn fetch_pairs(
        &self,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<Vec<(PgValue, PgValue)>, PgFluentError> {
        let key = match key {
            Some(key) => key.to_string(),
            None => self.column_at(0)?,
        };
        let value = match value {
            Some(value) => value.to_string(),
            None => self.column_at(1)?,
        };

        let total = self.handle()?.row_count();
        let mut pairs = Vec::with_capacity(total);
        for idx in 0..total {
            let mut row = self.read_row(idx)?;
            pairs.push((row.get(&key)?.clone(), row.get(&value)?.clone()));
        }
        Ok(pairs)
    }

    /// Group all rows by the textual form of one key column. A later row
    /// with the same key wins.
    pub fn fetch_assoc(&self, key: &str) -> Result<HashMap<String, Row>, PgFluentError> {
        let total = self.handle()?.row_count();
        let mut assoc = HashMap::with_capacity(total);
        for idx in 0..total {
            let mut row = self.read_row(idx)?;
            let key_text = key_string(row.get(key)?);
            assoc.insert(key_text, row);
        }
        Ok(assoc)
    }

    /// Release the handle; `false` when it was already released.
    pub fn free(&mut self) -> bool {
        self.handle.take().is_some()
    }

    fn read_row(&self, idx: usize) -> Result<Row, PgFluentError> {
        let handle = self.handle()?;
        if idx >= handle.row_count() {
            return Err(ResultError::NoRow(idx).into());
        }
        let raw: Vec<Option<String>> = (0..self.meta.names().len())
            .map(|col| {
                handle
                    .raw_value(idx, col)
                    .flatten()
                    .map(str::to_string)
            })
            .collect();
        factory::build_row(self.mode, &self.meta, &self.ctx, raw)
    }

    fn column_at(&self, idx: usize) -> Result<String, PgFluentError> {
        self.meta
            .names()
            .get(idx)
            .cloned()
            .ok_or_else(|| ResultError::NoColumn(idx.to_string()).into())
    }
}

fn key_string(value: &PgValue) -> String {
    match value {
        PgValue::Text(text) => text.clone(),
        PgValue::Int(int) => int.to_string(),
        PgValue::Float(float) => float.to_string(),
        PgValue::Bool(flag) => flag.to_string(),
        PgValue::Timestamp(ts) => ts.to_string(),
        PgValue::Null => String::from("NULL"),
        PgValue::Json(json) => json.to_string(),
        PgValue::Blob(bytes) => format!("{bytes:?}"),
    }
}
