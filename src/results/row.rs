use std::collections::HashMap;
use std::sync::Arc;

use crate::datatype::DecodeContext;
use crate::error::{PgFluentError, ResultError};
use crate::types::PgValue;

/// Column names, lookup index and type oids shared by every row of a result.
#[derive(Debug)]
pub struct ColumnMeta {
    pub(crate) names: Vec<String>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) oids: Vec<u32>,
}

impl ColumnMeta {
    pub(crate) fn new(names: Vec<String>, oids: Vec<u32>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index, oids }
    }

    #[must_use]
    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Per-column value state: still raw server text, already typed, or removed.
#[derive(Debug, Clone)]
pub(crate) enum ColumnState {
    Raw(Option<String>),
    Typed(PgValue),
    Absent,
}

/// One result row with columns in first-seen order.
///
/// A lazily built row keeps the raw server text per column and converts it
/// on first read, caching the typed value; every column converts at most
/// once. Overwriting a column with [`set`](Self::set) before the first read
/// skips the conversion entirely.
#[derive(Debug, Clone)]
pub struct Row {
    meta: Arc<ColumnMeta>,
    ctx: Arc<DecodeContext>,
    states: Vec<ColumnState>,
}

impl Row {
    pub(crate) fn new(
        meta: Arc<ColumnMeta>,
        ctx: Arc<DecodeContext>,
        states: Vec<ColumnState>,
    ) -> Self {
        Self { meta, ctx, states }
    }

    /// Column names in first-seen order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.meta.names()
    }

    /// Read a column, converting raw text to a typed value on first access.
    ///
    /// # Errors
    /// [`ResultError::NoColumn`] for unknown or removed columns, and a
    /// conversion error when the raw value can't be parsed (the raw value is
    /// kept, so a later read retries).
    pub fn get(&mut self, column: &str) -> Result<&PgValue, PgFluentError> {
        let idx = self
            .meta
            .position(column)
            .ok_or_else(|| ResultError::NoColumn(column.to_string()))?;
        if matches!(self.states[idx], ColumnState::Absent) {
            return Err(ResultError::NoColumn(column.to_string()).into());
        }
        self.resolve(idx)?;
        match &self.states[idx] {
            ColumnState::Typed(value) => Ok(value),
            _ => Err(ResultError::NoColumn(column.to_string()).into()),
        }
    }

    /// Overwrite a column with an already typed value.
    ///
    /// # Errors
    /// [`ResultError::NoColumn`] when the column is not part of the result.
    pub fn set(
        &mut self,
        column: &str,
        value: impl Into<PgValue>,
    ) -> Result<(), PgFluentError> {
        let idx = self
            .meta
            .position(column)
            .ok_or_else(|| ResultError::NoColumn(column.to_string()))?;
        self.states[idx] = ColumnState::Typed(value.into());
        Ok(())
    }

    /// True when the column exists and was not removed.
    #[must_use]
    pub fn has(&self, column: &str) -> bool {
        self.meta
            .position(column)
            .is_some_and(|idx| !matches!(self.states[idx], ColumnState::Absent))
    }

    /// Remove a column from this row; later reads report it as missing.
    ///
    /// # Errors
    /// [`ResultError::NoColumn`] when the column is not part of the result.
    pub fn remove(&mut self, column: &str) -> Result<(), PgFluentError> {
        let idx = self
            .meta
            .position(column)
            .ok_or_else(|| ResultError::NoColumn(column.to_string()))?;
        self.states[idx] = ColumnState::Absent;
        Ok(())
    }

    /// All remaining columns as typed values, converting where needed.
    pub fn to_values(&mut self) -> Result<Vec<(String, PgValue)>, PgFluentError> {
        let mut values = Vec::with_capacity(self.states.len());
        for idx in 0..self.states.len() {
            if matches!(self.states[idx], ColumnState::Absent) {
                continue;
            }
            self.resolve(idx)?;
            if let ColumnState::Typed(value) = &self.states[idx] {
                values.push((self.meta.names[idx].clone(), value.clone()));
            }
        }
        Ok(values)
    }

    fn resolve(&mut self, idx: usize) -> Result<(), PgFluentError> {
        if !matches!(self.states[idx], ColumnState::Raw(_)) {
            return Ok(());
        }
        let raw = match std::mem::replace(&mut self.states[idx], ColumnState::Absent) {
            ColumnState::Raw(raw) => raw,
            other => {
                self.states[idx] = other;
                return Ok(());
            }
        };
        let value = match raw {
            None => PgValue::Null,
            Some(text) => match self.ctx.decode(self.meta.oids[idx], &text) {
                Ok(value) => value,
                Err(err) => {
                    // keep the raw value so the caller can fix the parser
                    // registration and retry
                    self.states[idx] = ColumnState::Raw(Some(text));
                    return Err(err.into());
                }
            },
        };
        self.states[idx] = ColumnState::Typed(value);
        Ok(())
    }
}
