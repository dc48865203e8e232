use std::sync::Arc;

use crate::datatype::DecodeContext;
use crate::error::PgFluentError;
use crate::types::PgValue;

use super::row::{ColumnMeta, ColumnState, Row};

/// How rows materialize their values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowMode {
    /// Convert every column up front.
    #[default]
    Eager,
    /// Keep raw text and convert each column on first read.
    Lazy,
}

/// Build one row from raw column text according to the row mode.
pub(crate) fn build_row(
    mode: RowMode,
    meta: &Arc<ColumnMeta>,
    ctx: &Arc<DecodeContext>,
    raw: Vec<Option<String>>,
) -> Result<Row, PgFluentError> {
    let states = match mode {
        RowMode::Lazy => raw
            .into_iter()
            .map(|value| match value {
                // NULL needs no parsing, resolve it immediately
                None => ColumnState::Typed(PgValue::Null),
                Some(text) => ColumnState::Raw(Some(text)),
            })
            .collect(),
        RowMode::Eager => {
            let mut states = Vec::with_capacity(raw.len());
            for (idx, value) in raw.into_iter().enumerate() {
                let typed = match value {
                    None => PgValue::Null,
                    Some(text) => ctx.decode(meta.oids[idx], &text)?,
                };
                states.push(ColumnState::Typed(typed));
            }
            states
        }
    };
    Ok(Row::new(meta.clone(), ctx.clone(), states))
}
