use std::collections::HashMap;

use crate::error::{PgFluentError, QueryBuildError, ResultError};
use crate::results::{ResultSet, Row};
use crate::session::{Session, Transport};
use crate::types::PgValue;

use super::arg::Arg;
use super::condition::Condition;
use super::statement::{
    ColumnExpr, CombineSource, ParamKey, SelectItem, Statement, TableSource,
};

/// A [`Statement`] bound to a [`Session`].
///
/// The first `execute` renders and runs the statement; the result is
/// memoized, so fetch helpers and repeated `execute` calls reuse it. After
/// execution the statement is frozen: any further mutation fails until
/// [`reexecute`](Self::reexecute) clears the memo.
pub struct BoundStatement<'a, T: Transport> {
    session: &'a mut Session<T>,
    statement: Statement,
    result: Option<ResultSet>,
}

impl<'a, T: Transport> std::fmt::Debug for BoundStatement<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundStatement")
            .field("statement", &self.statement)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl<'a, T: Transport> BoundStatement<'a, T> {
    pub(crate) fn new(session: &'a mut Session<T>, statement: Statement) -> Self {
        Self {
            session,
            statement,
            result: None,
        }
    }

    fn guard(&self) -> Result<(), QueryBuildError> {
        if self.result.is_some() {
            Err(QueryBuildError::CantMutateAfterExecute)
        } else {
            Ok(())
        }
    }

    fn apply(
        mut self,
        mutate: impl FnOnce(Statement) -> Result<Statement, QueryBuildError>,
    ) -> Result<Self, QueryBuildError> {
        self.guard()?;
        self.statement = mutate(std::mem::take(&mut self.statement))?;
        Ok(self)
    }

    pub fn select<I, S>(self, columns: I) -> Result<Self, QueryBuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SelectItem>,
    {
        self.apply(|stmt| stmt.select(columns))
    }

    pub fn select_as(
        self,
        expr: impl Into<ColumnExpr>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.select_as(expr, alias))
    }

    pub fn distinct(self) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.distinct()))
    }

    pub fn table(self, source: impl Into<TableSource>) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.table(source))
    }

    pub fn table_as(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.table_as(source, alias))
    }

    pub fn from(self, source: impl Into<TableSource>) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.from(source))
    }

    pub fn from_as(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.from_as(source, alias))
    }

    pub fn join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.join(source, alias))
    }

    pub fn inner_join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.inner_join(source, alias))
    }

    pub fn left_join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.left_join(source, alias))
    }

    pub fn right_join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.right_join(source, alias))
    }

    pub fn full_join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.full_join(source, alias))
    }

    pub fn cross_join(
        self,
        source: impl Into<TableSource>,
        alias: impl Into<String>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.cross_join(source, alias))
    }

    pub fn on(
        self,
        alias: impl Into<String>,
        condition: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.on(alias, condition, args)))
    }

    pub fn where_(
        self,
        condition: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.where_(condition, args)))
    }

    pub fn where_group(self, condition: Condition) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.where_group(condition)))
    }

    pub fn where_and(&mut self) -> Result<&mut Condition, QueryBuildError> {
        self.guard()?;
        Ok(self.statement.where_and())
    }

    pub fn where_or(&mut self) -> Result<&mut Condition, QueryBuildError> {
        self.guard()?;
        Ok(self.statement.where_or())
    }

    pub fn group_by<I, S>(self, columns: I) -> Result<Self, QueryBuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply(|stmt| Ok(stmt.group_by(columns)))
    }

    pub fn having(
        self,
        condition: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.having(condition, args)))
    }

    pub fn having_and(&mut self) -> Result<&mut Condition, QueryBuildError> {
        self.guard()?;
        Ok(self.statement.having_and())
    }

    pub fn having_or(&mut self) -> Result<&mut Condition, QueryBuildError> {
        self.guard()?;
        Ok(self.statement.having_or())
    }

    pub fn order_by<I, C>(self, columns: I) -> Result<Self, QueryBuildError>
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnExpr>,
    {
        self.apply(|stmt| Ok(stmt.order_by(columns)))
    }

    pub fn limit(self, limit: i64) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.limit(limit)))
    }

    pub fn offset(self, offset: i64) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.offset(offset)))
    }

    pub fn union(self, query: impl Into<CombineSource>) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.union(query)))
    }

    pub fn union_all(self, query: impl Into<CombineSource>) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.union_all(query)))
    }

    pub fn intersect(self, query: impl Into<CombineSource>) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.intersect(query)))
    }

    pub fn except(self, query: impl Into<CombineSource>) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.except(query)))
    }

    pub fn insert(self) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.insert()))
    }

    pub fn insert_into(self, table: impl Into<String>) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| stmt.insert_into(table))
    }

    pub fn insert_columns<I, S>(self, columns: I) -> Result<Self, QueryBuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.apply(|stmt| Ok(stmt.insert_columns(columns)))
    }

    pub fn values<I, K, A>(self, data: I) -> Result<Self, QueryBuildError>
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<Arg>,
    {
        self.apply(|stmt| Ok(stmt.values(data)))
    }

    pub fn rows<I, R, K, A>(self, rows: I) -> Result<Self, QueryBuildError>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<Arg>,
    {
        self.apply(|stmt| Ok(stmt.rows(rows)))
    }

    pub fn update(self) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.update()))
    }

    pub fn set<I, K, A>(self, data: I) -> Result<Self, QueryBuildError>
    where
        I: IntoIterator<Item = (K, A)>,
        K: Into<String>,
        A: Into<Arg>,
    {
        self.apply(|stmt| Ok(stmt.set(data)))
    }

    pub fn delete(self) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.delete()))
    }

    pub fn truncate(self) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.truncate()))
    }

    pub fn returning<I, S>(self, columns: I) -> Result<Self, QueryBuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<SelectItem>,
    {
        self.apply(|stmt| stmt.returning(columns))
    }

    pub fn prefix(
        self,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.prefix(sql, args)))
    }

    pub fn suffix(
        self,
        sql: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.suffix(sql, args)))
    }

    pub fn reset(self, key: ParamKey) -> Result<Self, QueryBuildError> {
        self.apply(|stmt| Ok(stmt.reset(key)))
    }

    /// The underlying statement description.
    #[must_use]
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Run the statement, or return the memoized result of a prior run.
    ///
    /// # Errors
    /// Rendering or execution errors; a prior successful run never re-fails.
    pub async fn execute(&mut self) -> Result<&mut ResultSet, PgFluentError> {
        if self.result.is_none() {
            let query = self.statement.build()?.clone();
            let result = self.session.query_sql(query).await?;
            self.result = Some(result);
        }
        match self.result.as_mut() {
            Some(result) => Ok(result),
            None => unreachable!("result memo was just filled"),
        }
    }

    /// Release the previous result and run the statement again.
    ///
    /// # Errors
    /// Same failure modes as [`execute`](Self::execute).
    pub async fn reexecute(&mut self) -> Result<&mut ResultSet, PgFluentError> {
        if let Some(mut result) = self.result.take() {
            result.free();
        }
        self.execute().await
    }

    /// Release the result handle; `Ok(false)` when it was already released.
    ///
    /// # Errors
    /// [`ResultError::NotExecuted`] when the statement never ran.
    pub fn free(&mut self) -> Result<bool, PgFluentError> {
        match self.result.as_mut() {
            Some(result) => Ok(result.free()),
            None => Err(ResultError::NotExecuted.into()),
        }
    }

    /// Number of rows in the result, executing first if needed.
    pub async fn count(&mut self) -> Result<usize, PgFluentError> {
        self.execute().await?.row_count()
    }

    /// Rows affected by a DML statement, executing first if needed.
    pub async fn affected_rows(&mut self) -> Result<usize, PgFluentError> {
        self.execute().await?.affected_rows()
    }

    /// Fetch the next row, executing first if needed.
    pub async fn fetch(&mut self) -> Result<Option<Row>, PgFluentError> {
        self.execute().await?.fetch()
    }

    /// First column of the next row, executing first if needed.
    pub async fn fetch_single(&mut self) -> Result<Option<PgValue>, PgFluentError> {
        self.execute().await?.fetch_single()
    }

    /// All rows (optionally a window), executing first if needed.
    pub async fn fetch_all(
        &mut self,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Result<Vec<Row>, PgFluentError> {
        self.execute().await?.fetch_all(offset, limit)
    }

    /// Key/value projection over all rows, executing first if needed.
    pub async fn fetch_pairs(
        &mut self,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<Vec<(PgValue, PgValue)>, PgFluentError> {
        self.execute().await?.fetch_pairs(key, value)
    }

    /// Rows grouped by a key column, executing first if needed.
    pub async fn fetch_assoc(
        &mut self,
        key: &str,
    ) -> Result<HashMap<String, Row>, PgFluentError> {
        self.execute().await?.fetch_assoc(key)
    }

    /// Send the statement through the session's async path; results are
    /// drained from the session.
    pub async fn execute_async(mut self) -> Result<(), PgFluentError> {
        let query = self.statement.build()?.clone();
        self.session.async_query_sql(query).await
    }
}
