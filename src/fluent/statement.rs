use std::collections::HashMap;

use crate::error::QueryBuildError;
use crate::types::SqlQuery;

use super::arg::{Arg, RawSql};
use super::condition::Condition;
use super::renderer;

/// What kind of SQL statement a [`Statement`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementKind {
    #[default]
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
}

/// Join flavor for secondary tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinKind {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
            JoinKind::RightOuter => "RIGHT OUTER JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

/// Set-combination flavor for whole queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineKind {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl CombineKind {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            CombineKind::Union => "UNION",
            CombineKind::UnionAll => "UNION ALL",
            CombineKind::Intersect => "INTERSECT",
            CombineKind::Except => "EXCEPT",
        }
    }
}

/// Something a table reference can point at.
#[derive(Debug, Clone)]
pub enum TableSource {
    /// A literal table name.
    Name(String),
    /// A nested statement; requires an explicit alias.
    Statement(Box<Statement>),
    /// A raw SQL fragment; requires an explicit alias.
    Raw(RawSql),
}

impl From<&str> for TableSource {
    fn from(name: &str) -> Self {
        TableSource::Name(name.to_string())
    }
}

impl From<String> for TableSource {
    fn from(name: String) -> Self {
        TableSource::Name(name)
    }
}

impl From<Statement> for TableSource {
    fn from(statement: Statement) -> Self {
        TableSource::Statement(Box::new(statement))
    }
}

impl From<RawSql> for TableSource {
    fn from(raw: RawSql) -> Self {
        TableSource::Raw(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableRole {
    Main,
    From,
    Join(JoinKind),
}

#[derive(Debug, Clone)]
pub(crate) struct TableEntry {
    pub(crate) alias: String,
    pub(crate) source: TableSource,
    pub(crate) role: TableRole,
}

/// A column-position expression: select list, ORDER BY, RETURNING.
#[derive(Debug, Clone)]
pub enum ColumnExpr {
    /// A literal column reference or expression text.
    Name(String),
    /// A nested statement, rendered as a parenthesized sub-select.
    Statement(Box<Statement>),
    /// A raw SQL fragment.
    Raw(RawSql),
}

impl From<&str> for ColumnExpr {
    fn from(name: &str) -> Self {
        ColumnExpr::Name(name.to_string())
    }
}

impl From<String> for ColumnExpr {
    fn from(name: String) -> Self {
        ColumnExpr::Name(name)
    }
}

impl From<Statement> for ColumnExpr {
    fn from(statement: Statement) -> Self {
        ColumnExpr::Statement(Box::new(statement))
    }
}

impl From<RawSql> for ColumnExpr {
    fn from(raw: RawSql) -> Self {
        ColumnExpr::Raw(raw)
    }
}

/// A select-list or RETURNING entry with an optional alias.
#[derive(Debug, Clone)]
pub struct SelectItem {
    pub(crate) expr: ColumnExpr,
    pub(crate) alias: Option<String>,
}

impl SelectItem {
    pub fn new(expr: impl Into<ColumnExpr>) -> Self {
        Self {
            expr: expr.into(),
            alias: None,
        }
    }

    pub fn aliased(expr: impl Into<ColumnExpr>, alias: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            alias: Some(alias.into()),
        }
    }
}

impl From<&str> for SelectItem {
    fn from(name: &str) -> Self {
        SelectItem::new(name)
    }
}

impl From<String> for SelectItem {
    fn from(name: String) -> Self {
        SelectItem::new(name)
    }
}

impl From<ColumnExpr> for SelectItem {
    fn from(expr: ColumnExpr) -> Self {
        SelectItem::new(expr)
    }
}

/// A query used on one side of a set combination.
#[derive(Debug, Clone)]
pub enum CombineSource {
    Statement(Box<Statement>),
    Raw(RawSql),
}

impl From<Statement> for CombineSource {
    fn from(statement: Statement) -> Self {
        CombineSource::Statement(Box::new(statement))
    }
}

impl From<RawSql> for CombineSource {
    fn from(raw: RawSql) -> Self {
        CombineSource::Raw(raw)
    }
}

impl From<&str> for CombineSource {
    fn from(sql: &str) -> Self {
        CombineSource::Raw(RawSql::new(sql))
    }
}

/// Resettable parameter slots of a [`Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKey {
    Select,
    Distinct,
    Tables,
    JoinConditions,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    CombineQueries,
    InsertColumns,
    Returning,
    Data,
    Rows,
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StatementParams {
    pub(crate) select: Vec<SelectItem>,
    pub(crate) distinct: bool,
    pub(crate) tables: Vec<TableEntry>,
    pub(crate) main_alias: Option<String>,
    pub(crate) join_conditions: HashMap<String, Condition>,
    pub(crate) where_: Condition,
    pub(crate) group_by: Vec<String>,
    pub(crate) having: Condition,
    pub(crate) order_by: Vec<ColumnExpr>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
    pub(crate) combines: Vec<(CombineKind, CombineSource)>,
    pub(crate) insert_columns: Vec<String>,
    pub(crate) returning: Vec<SelectItem>,
    pub(crate) data: Vec<(String, Arg)>,
    pub(crate) rows: Vec<Vec<(String, Arg)>>,
    pub(crate) prefix: Vec<RawSql>,
    pub(crate) suffix: Vec<RawSql>,
}

/// Fluent description of one SQL statement.
///
/// Mutators merge into their parameter slot and hand the statement back for
/// chaining; calls that can violate an alias rule return a `Result`. The
/// rendered form is memoized by [`build`](Self::build) and every mutation
/// clears the memo.
///
/// ```rust
/// use pg_fluent::{Arg, Statement};
///
/// let mut query = Statement::new()
///     .select(["id", "name"])?
///     .from("users")?
///     .where_("id = ?", [Arg::from(5)])
///     .limit(1);
/// let rendered = query.build()?;
/// assert_eq!(rendered.sql, "SELECT id, name FROM users WHERE id = ? LIMIT ?");
/// # Ok::<(), pg_fluent::QueryBuildError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Statement {
    pub(crate) kind: StatementKind,
    pub(crate) params: StatementParams,
    rendered: Option<SqlQuery>,
}

impl Statement {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    fn touch(&mut self) {
        self.rendered = None;
    }

    /// Append columns to the select list.
    pub fn select<I, S>(mut self, columns: I) -> Result<Self, QueryBuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SelectItem>,
    {
        self.touch();
        for column in columns {
            let item = column.into();
            check_queryable(&item.expr, item.alias.as_deref())?;
            self.params.select.push(item);
        }
        Ok(self)
    }

    /// Append one aliased select-list entry.
    pub fn select_as(
        self,
        expr: impl Into<ColumnExpr>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.select([SelectItem::aliased(expr, alias)])
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.touch();
        self.params.distinct = true;
        self
    }

    /// Register the statement's main table (INSERT target, UPDATE/DELETE
    /// subject, or the first FROM entry of a SELECT).
    pub fn table(self, source: impl Into<TableSource>) -> Result<Self, QueryBuildError> {
        self.add_table(TableRole::Main, source.into(), None)
    }

    /// Register the main table under an explicit alias.
    pub fn table_as(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.add_table(TableRole::Main, source.into(), Some(alias.into()))
    }

    /// Append a FROM entry.
    pub fn from(self, source: impl Into<TableSource>) -> Result<Self, QueryBuildError> {
        self.add_table(TableRole::From, source.into(), None)
    }

    /// Append a FROM entry under an explicit alias.
    pub fn from_as(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.add_table(TableRole::From, source.into(), Some(alias.into()))
    }

    /// Append an INNER JOIN (alias is also the key for `on`).
    pub fn join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.inner_join(source, alias)
    }

    pub fn inner_join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.add_table(TableRole::Join(JoinKind::Inner), source.into(), Some(alias.into()))
    }

    pub fn left_join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.add_table(
            TableRole::Join(JoinKind::LeftOuter),
            source.into(),
            Some(alias.into()),
        )
    }

    pub fn right_join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.add_table(
            TableRole::Join(JoinKind::RightOuter),
            source.into(),
            Some(alias.into()),
        )
    }

    pub fn full_join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.add_table(
            TableRole::Join(JoinKind::FullOuter),
            source.into(),
            Some(alias.into()),
        )
    }

    /// CROSS JOIN carries no ON condition.
    pub fn cross_join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.add_table(
            TableRole::Join(JoinKind::Cross),
            source.into(),
            Some(alias.into()),
        )
    }

    fn add_table(
        mut self,
        role: TableRole,
        source: TableSource,
        alias: Option<String>,
    ) -> Result<Self, QueryBuildError> {
        self.touch();

        let alias = match alias {
            Some(alias) => alias,
            None => match &source {
                TableSource::Name(name) => name.clone(),
                TableSource::Statement(_) | TableSource::Raw(_) => {
                    return Err(QueryBuildError::QueryableWithoutAlias);
                }
            },
        };

        if role == TableRole::Main && self.params.main_alias.is_some() {
            return Err(QueryBuildError::MultipleMainTables);
        }
        if self.params.tables.iter().any(|entry| entry.alias == alias) {
            return Err(QueryBuildError::DuplicateAlias(alias));
        }

        if role == TableRole::Main {
            self.params.main_alias = Some(alias.clone());
        }
        self.params.tables.push(TableEntry {
            alias,
            source,
            role,
        });
        Ok(self)
    }

    /// Append a leaf to the ON condition of the join registered under
    /// `alias`. The alias is validated when the statement is rendered.
    #[must_use]
    pub fn on(
        mut self,
        alias: impl Into<String>,
        condition: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Self {
        self.touch();
        self.params
            .join_conditions
            .entry(alias.into())
            .or_default()
            .add(condition, args);
        self
    }

    /// Append an already built group to a join's ON condition.
    #[must_use]
    pub fn on_group(mut self, alias: impl Into<String>, condition: Condition) -> Self {
        self.touch();
        self.params
            .join_conditions
            .entry(alias.into())
            .or_default()
            .add_group(condition);
        self
    }

    /// Append a WHERE leaf; leaves are joined with AND.
    #[must_use]
    pub fn where_(
        mut self,
        condition: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Self {
        self.touch();
        self.params.where_.add(condition, args);
        self
    }

    /// Append an already built group to the WHERE tree.
    #[must_use]
    pub fn where_group(mut self, condition: Condition) -> Self {
        self.touch();
        self.params.where_.add_group(condition);
        self
    }

    /// Append an AND sub-group to the WHERE tree and return a handle to it.
    pub fn where_and(&mut self) -> &mut Condition {
        self.touch();
        self.params.where_.add_and()
    }

    /// Append an OR sub-group to the WHERE tree and return a handle to it.
    pub fn where_or(&mut self) -> &mut Condition {
        self.touch();
        self.params.where_.add_or()
    }

    /// Append GROUP BY columns.
    #[must_use]
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.touch();
        self.params
            .group_by
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Append a HAVING leaf; leaves are joined with AND.
    #[must_use]
    pub fn having(
        mut self,
        condition: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Self {
        self.touch();
        self.params.having.add(condition, args);
        self
    }

    /// Append an AND sub-group to the HAVING tree and return a handle to it.
    pub fn having_and(&mut self) -> &mut Condition {
        self.touch();
        self.params.having.add_and()
    }

    /// Append an OR sub-group to the HAVING tree and return a handle to it.
    pub fn having_or(&mut self) -> &mut Condition {
        self.touch();
        self.params.having.add_or()
    }

    /// Append ORDER BY entries.
    #[must_use]
    pub fn order_by<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnExpr>,
    {
        self.touch();
        self.params
            .order_by
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Set the LIMIT; the value is bound as a parameter.
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.touch();
        self.params.limit = Some(limit);
        self
    }

    /// Set the OFFSET; the value is bound as a parameter.
    #[must_use]
    pub fn offset(mut self, offset: i64) -> Self {
        self.touch();
        self.params.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn union(self, query: impl Into<CombineSource>) -> Self {
        self.combine(CombineKind::Union, query.into())
    }

    #[must_use]
    pub fn union_all(self, query: impl Into<CombineSource>) -> Self {
        self.combine(CombineKind::UnionAll, query.into())
    }

    #[must_use]
    pub fn intersect(self, query: impl Into<CombineSource>) -> Self {
        self.combine(CombineKind::Intersect, query.into())
    }

    #[must_use]
    pub fn except(self, query: impl Into<CombineSource>) -> Self {
        self.combine(CombineKind::Except, query.into())
    }

    fn combine(mut self, kind: CombineKind, query: CombineSource) -> Self {
        self.touch();
        self.params.combines.push((kind, query));
        self
    }

    /// Turn the statement into an INSERT.
    #[must_use]
    pub fn insert(mut self) -> Self {
        self.touch();
        self.kind = StatementKind::Insert;
        self
    }

    /// Turn the statement into an INSERT targeting `table`.
    pub fn insert_into(self, table: impl Into<String>) -> Result<Self, QueryBuildError> {
        self.insert().table(TableSource::Name(table.into()))
    }

    /// Set the explicit INSERT column list (overwrites).
    #[must_use]
    pub fn insert_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.touch();
        self.params.insert_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Merge single-row INSERT values; a later value for the same column
    /// wins, column order is first-seen.
    #[must_use]
    pub fn values<I, K, A>(mut self, data: I) -> Self
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<Arg>,
    {
        self.touch();
        self.kind = StatementKind::Insert;
        self.merge_data(data);
        self
    }

    /// Append multi-row INSERT rows.
    #[must_use]
    pub fn rows<I, R, K, A>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<Arg>,
    {
        self.touch();
        self.kind = StatementKind::Insert;
        for row in rows {
            self.params.rows.push(
                row.into_iter()
                    .map(|(column, arg)| (column.into(), arg.into()))
                    .collect(),
            );
        }
        self
    }

    /// Turn the statement into an UPDATE.
    #[must_use]
    pub fn update(mut self) -> Self {
        self.touch();
        self.kind = StatementKind::Update;
        self
    }

    /// Merge UPDATE SET data; a later value for the same column wins.
    #[must_use]
    pub fn set<I, K, A>(mut self, data: I) -> Self
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<Arg>,
    {
        self.touch();
        self.kind = StatementKind::Update;
        self.merge_data(data);
        self
    }

    /// Turn the statement into a DELETE.
    #[must_use]
    pub fn delete(mut self) -> Self {
        self.touch();
        self.kind = StatementKind::Delete;
        self
    }

    /// Turn the statement into a TRUNCATE.
    #[must_use]
    pub fn truncate(mut self) -> Self {
        self.touch();
        self.kind = StatementKind::Truncate;
        self
    }

    /// Append RETURNING entries.
    pub fn returning<I, S>(mut self, columns: I) -> Result<Self, QueryBuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SelectItem>,
    {
        self.touch();
        for column in columns {
            let item = column.into();
            check_queryable(&item.expr, item.alias.as_deref())?;
            self.params.returning.push(item);
        }
        Ok(self)
    }

    /// Append a fragment rendered before the statement (e.g. a WITH clause).
    #[must_use]
    pub fn prefix(
        mut self,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Self {
        self.touch();
        self.params
            .prefix
            .push(RawSql::with_args(sql, args.into_iter().collect()));
        self
    }

    /// Append a fragment rendered after the statement (e.g. FOR UPDATE).
    #[must_use]
    pub fn suffix(
        mut self,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Self {
        self.touch();
        self.params
            .suffix
            .push(RawSql::with_args(sql, args.into_iter().collect()));
        self
    }

    /// Restore one parameter slot to its default.
    #[must_use]
    pub fn reset(mut self, key: ParamKey) -> Self {
        self.touch();
        match key {
            ParamKey::Select => self.params.select = Vec::new(),
            ParamKey::Distinct => self.params.distinct = false,
            ParamKey::Tables => {
                self.params.tables = Vec::new();
                self.params.main_alias = None;
                self.params.join_conditions = HashMap::new();
            }
            ParamKey::JoinConditions => self.params.join_conditions = HashMap::new(),
            ParamKey::Where => self.params.where_ = Condition::new_and(),
            ParamKey::GroupBy => self.params.group_by = Vec::new(),
            ParamKey::Having => self.params.having = Condition::new_and(),
            ParamKey::OrderBy => self.params.order_by = Vec::new(),
            ParamKey::Limit => self.params.limit = None,
            ParamKey::Offset => self.params.offset = None,
            ParamKey::CombineQueries => self.params.combines = Vec::new(),
            ParamKey::InsertColumns => self.params.insert_columns = Vec::new(),
            ParamKey::Returning => self.params.returning = Vec::new(),
            ParamKey::Data => self.params.data = Vec::new(),
            ParamKey::Rows => self.params.rows = Vec::new(),
            ParamKey::Prefix => self.params.prefix = Vec::new(),
            ParamKey::Suffix => self.params.suffix = Vec::new(),
        }
        self
    }

    fn merge_data<I, K, A>(&mut self, data: I)
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<Arg>,
    {
        for (column, arg) in data {
            let column = column.into();
            let arg = arg.into();
            if let Some(slot) = self
                .params
                .data
                .iter_mut()
                .find(|(name, _)| *name == column)
            {
                slot.1 = arg;
            } else {
                self.params.data.push((column, arg));
            }
        }
    }

    /// Render the statement to SQL text plus ordered parameters.
    ///
    /// The result is memoized until the next mutation, so repeated calls are
    /// byte-identical and free.
    ///
    /// # Errors
    /// Returns a [`QueryBuildError`] for whole-statement problems: missing
    /// main table or select list, unresolved join aliases, missing ON
    /// conditions, or placeholder/argument count mismatches.
    pub fn build(&mut self) -> Result<&SqlQuery, QueryBuildError> {
        if self.rendered.is_none() {
            self.rendered = Some(renderer::render_statement(self)?);
        }
        match &self.rendered {
            Some(query) => Ok(query),
            None => unreachable!("render memo was just filled"),
        }
    }
}

fn check_queryable(expr: &ColumnExpr, alias: Option<&str>) -> Result<(), QueryBuildError> {
    match expr {
        ColumnExpr::Statement(_) | ColumnExpr::Raw(_) if alias.is_none() => {
            Err(QueryBuildError::QueryableWithoutAlias)
        }
        _ => Ok(()),
    }
}
