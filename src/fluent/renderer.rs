use crate::error::QueryBuildError;
use crate::placeholders::split_at_placeholders;
use crate::types::{PgValue, SqlQuery};

use super::arg::{Arg, RawSql};
use super::condition::{CondNode, Condition};
use super::statement::{
    ColumnExpr, CombineSource, JoinKind, SelectItem, Statement, StatementKind, TableEntry,
    TableRole, TableSource,
};

/// Render a statement to SQL text plus ordered parameters.
///
/// Parameters are appended in the order their placeholders appear in the
/// final text; nested statements and fragments splice their own parameters
/// at the matching position.
pub(crate) fn render_statement(stmt: &Statement) -> Result<SqlQuery, QueryBuildError> {
    let mut sql = String::new();
    let mut params = Vec::new();
    write_statement(stmt, &mut sql, &mut params)?;
    Ok(SqlQuery::new(sql, params))
}

fn write_statement(
    stmt: &Statement,
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    validate_join_aliases(stmt)?;
    write_fragments(&stmt.params.prefix, out, params, Affix::Prefix)?;
    match stmt.kind {
        StatementKind::Select => write_select_core(stmt, true, out, params)?,
        StatementKind::Insert => write_insert(stmt, out, params)?,
        StatementKind::Update => write_update(stmt, out, params)?,
        StatementKind::Delete => write_delete(stmt, out, params)?,
        StatementKind::Truncate => write_truncate(stmt, out)?,
    }
    write_fragments(&stmt.params.suffix, out, params, Affix::Suffix)?;
    Ok(())
}

/// Join conditions may only reference aliases that are registered tables.
fn validate_join_aliases(stmt: &Statement) -> Result<(), QueryBuildError> {
    for alias in stmt.params.join_conditions.keys() {
        if !stmt.params.tables.iter().any(|entry| entry.alias == *alias) {
            return Err(QueryBuildError::UnknownAlias(alias.clone()));
        }
    }
    Ok(())
}

fn write_select_core(
    stmt: &Statement,
    include_main: bool,
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    if stmt.params.select.is_empty() {
        return Err(QueryBuildError::NoColumnsToSelect);
    }

    out.push_str("SELECT ");
    if stmt.params.distinct {
        out.push_str("DISTINCT ");
    }
    write_select_items(&stmt.params.select, out, params)?;

    write_from_clause(stmt, include_main, out, params)?;

    if !stmt.params.where_.is_empty() {
        out.push_str(" WHERE ");
        write_condition(&stmt.params.where_, out, params)?;
    }

    if !stmt.params.group_by.is_empty() {
        out.push_str(" GROUP BY ");
        out.push_str(&stmt.params.group_by.join(", "));
    }

    if !stmt.params.having.is_empty() {
        out.push_str(" HAVING ");
        write_condition(&stmt.params.having, out, params)?;
    }

    for (kind, source) in &stmt.params.combines {
        out.push(' ');
        out.push_str(kind.keyword());
        out.push_str(" (");
        match source {
            CombineSource::Statement(sub) => write_statement(sub, out, params)?,
            CombineSource::Raw(raw) => write_sql_with_args(&raw.sql, &raw.args, out, params)?,
        }
        out.push(')');
    }

    if !stmt.params.order_by.is_empty() {
        out.push_str(" ORDER BY ");
        for (i, expr) in stmt.params.order_by.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_column_expr(expr, out, params)?;
        }
    }

    if let Some(limit) = stmt.params.limit {
        out.push_str(" LIMIT ?");
        params.push(PgValue::Int(limit));
    }

    if let Some(offset) = stmt.params.offset {
        out.push_str(" OFFSET ?");
        params.push(PgValue::Int(offset));
    }

    Ok(())
}

fn write_insert(
    stmt: &Statement,
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    let main = main_table(stmt)?;
    out.push_str("INSERT INTO ");
    write_table_ref(main, out, params)?;

    if !stmt.params.rows.is_empty() {
        let columns = if stmt.params.insert_columns.is_empty() {
            first_seen_columns(&stmt.params.rows)
        } else {
            stmt.params.insert_columns.clone()
        };
        out.push_str(" (");
        out.push_str(&columns.join(", "));
        out.push_str(") VALUES ");
        for (row_idx, row) in stmt.params.rows.iter().enumerate() {
            if row_idx > 0 {
                out.push_str(", ");
            }
            out.push('(');
            for (col_idx, column) in columns.iter().enumerate() {
                if col_idx > 0 {
                    out.push_str(", ");
                }
                let arg = row
                    .iter()
                    .find(|(name, _)| name == column)
                    .map(|(_, arg)| arg)
                    .ok_or_else(|| QueryBuildError::MissingRowColumn {
                        row: row_idx,
                        column: column.clone(),
                    })?;
                write_arg(arg, out, params)?;
            }
            out.push(')');
        }
    } else if !stmt.params.data.is_empty() {
        let pairs: Vec<(&String, &Arg)> = if stmt.params.insert_columns.is_empty() {
            stmt.params.data.iter().map(|(c, a)| (c, a)).collect()
        } else {
            stmt.params
                .insert_columns
                .iter()
                .map(|column| {
                    stmt.params
                        .data
                        .iter()
                        .find(|(name, _)| name == column)
                        .map(|(_, arg)| (column, arg))
                        .ok_or_else(|| QueryBuildError::MissingRowColumn {
                            row: 0,
                            column: column.clone(),
                        })
                })
                .collect::<Result<_, _>>()?
        };
        out.push_str(" (");
        for (i, (column, _)) in pairs.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(column);
        }
        out.push_str(") VALUES (");
        for (i, (_, arg)) in pairs.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_arg(arg, out, params)?;
        }
        out.push(')');
    } else if !stmt.params.select.is_empty() {
        if !stmt.params.insert_columns.is_empty() {
            out.push_str(" (");
            out.push_str(&stmt.params.insert_columns.join(", "));
            out.push(')');
        }
        out.push(' ');
        write_select_core(stmt, false, out, params)?;
    } else {
        return Err(QueryBuildError::NoInsertData);
    }

    write_returning(stmt, out, params)?;
    Ok(())
}

fn write_update(
    stmt: &Statement,
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    let main = main_table(stmt)?;
    if stmt.params.data.is_empty() {
        return Err(QueryBuildError::NoDataToSet);
    }

    out.push_str("UPDATE ");
    write_table_ref(main, out, params)?;
    out.push_str(" SET ");
    for (i, (column, arg)) in stmt.params.data.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(column);
        out.push_str(" = ");
        write_arg(arg, out, params)?;
    }

    write_from_clause(stmt, false, out, params)?;

    if !stmt.params.where_.is_empty() {
        out.push_str(" WHERE ");
        write_condition(&stmt.params.where_, out, params)?;
    }

    write_returning(stmt, out, params)?;
    Ok(())
}

fn write_delete(
    stmt: &Statement,
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    let main = main_table(stmt)?;
    out.push_str("DELETE FROM ");
    write_table_ref(main, out, params)?;

    if !stmt.params.where_.is_empty() {
        out.push_str(" WHERE ");
        write_condition(&stmt.params.where_, out, params)?;
    }

    write_returning(stmt, out, params)?;
    Ok(())
}

fn write_truncate(stmt: &Statement, out: &mut String) -> Result<(), QueryBuildError> {
    let main = main_table(stmt)?;
    out.push_str("TRUNCATE ");
    match &main.source {
        TableSource::Name(name) => out.push_str(name),
        TableSource::Statement(_) | TableSource::Raw(_) => {
            return Err(QueryBuildError::NoMainTable);
        }
    }
    Ok(())
}

/// Column list of a multi-row insert: first-seen order across all rows.
fn first_seen_columns(rows: &[Vec<(String, Arg)>]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for (name, _) in row {
            if !columns.iter().any(|existing| existing == name) {
                columns.push(name.clone());
            }
        }
    }
    columns
}

fn main_table(stmt: &Statement) -> Result<&TableEntry, QueryBuildError> {
    let alias = stmt
        .params
        .main_alias
        .as_deref()
        .ok_or(QueryBuildError::NoMainTable)?;
    stmt.params
        .tables
        .iter()
        .find(|entry| entry.alias == alias)
        .ok_or_else(|| QueryBuildError::UnknownAlias(alias.to_string()))
}

/// FROM list (optionally including the main table) followed by the join
/// chain in registration order. Omitted entirely when there is nothing to
/// select from.
fn write_from_clause(
    stmt: &Statement,
    include_main: bool,
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    let from_tables: Vec<&TableEntry> = stmt
        .params
        .tables
        .iter()
        .filter(|entry| match entry.role {
            TableRole::Main => include_main,
            TableRole::From => true,
            TableRole::Join(_) => false,
        })
        .collect();
    let join_tables: Vec<&TableEntry> = stmt
        .params
        .tables
        .iter()
        .filter(|entry| matches!(entry.role, TableRole::Join(_)))
        .collect();

    if from_tables.is_empty() && join_tables.is_empty() {
        return Ok(());
    }

    out.push_str(" FROM ");
    for (i, entry) in from_tables.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_table_ref(entry, out, params)?;
    }

    for entry in join_tables {
        let TableRole::Join(kind) = entry.role else {
            continue;
        };
        out.push(' ');
        out.push_str(kind.keyword());
        out.push(' ');
        write_table_ref(entry, out, params)?;
        if kind != JoinKind::Cross {
            let condition = stmt
                .params
                .join_conditions
                .get(&entry.alias)
                .filter(|condition| !condition.is_empty())
                .ok_or_else(|| QueryBuildError::MissingOnCondition(entry.alias.clone()))?;
            out.push_str(" ON ");
            write_condition(condition, out, params)?;
        }
    }

    Ok(())
}

fn write_table_ref(
    entry: &TableEntry,
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    match &entry.source {
        TableSource::Name(name) => {
            out.push_str(name);
            if *name != entry.alias {
                out.push_str(" AS ");
                out.push_str(&entry.alias);
            }
        }
        TableSource::Statement(sub) => {
            out.push('(');
            write_statement(sub, out, params)?;
            out.push_str(") AS ");
            out.push_str(&entry.alias);
        }
        TableSource::Raw(raw) => {
            out.push('(');
            write_sql_with_args(&raw.sql, &raw.args, out, params)?;
            out.push_str(") AS ");
            out.push_str(&entry.alias);
        }
    }
    Ok(())
}

fn write_select_items(
    items: &[SelectItem],
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_column_expr(&item.expr, out, params)?;
        if let Some(alias) = &item.alias {
            out.push_str(" AS ");
            out.push_str(alias);
        }
    }
    Ok(())
}

fn write_column_expr(
    expr: &ColumnExpr,
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    match expr {
        ColumnExpr::Name(name) => out.push_str(name),
        ColumnExpr::Statement(sub) => {
            out.push('(');
            write_statement(sub, out, params)?;
            out.push(')');
        }
        ColumnExpr::Raw(raw) => write_sql_with_args(&raw.sql, &raw.args, out, params)?,
    }
    Ok(())
}

fn write_returning(
    stmt: &Statement,
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    if stmt.params.returning.is_empty() {
        return Ok(());
    }
    out.push_str(" RETURNING ");
    write_select_items(&stmt.params.returning, out, params)
}

enum Affix {
    Prefix,
    Suffix,
}

fn write_fragments(
    fragments: &[RawSql],
    out: &mut String,
    params: &mut Vec<PgValue>,
    affix: Affix,
) -> Result<(), QueryBuildError> {
    for fragment in fragments {
        if matches!(affix, Affix::Suffix) {
            out.push(' ');
        }
        write_sql_with_args(&fragment.sql, &fragment.args, out, params)?;
        if matches!(affix, Affix::Prefix) {
            out.push(' ');
        }
    }
    Ok(())
}

/// Children are joined with the group operator; a child that is itself a
/// multi-node group is parenthesized to preserve precedence, a single-node
/// child renders bare.
fn write_condition(
    condition: &Condition,
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    let nodes: Vec<&CondNode> = condition
        .nodes
        .iter()
        .filter(|node| match node {
            CondNode::Leaf { .. } => true,
            CondNode::Group(group) => !group.is_empty(),
        })
        .collect();

    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
            out.push_str(condition.operator.keyword());
            out.push(' ');
        }
        match node {
            CondNode::Leaf { text, args } => write_sql_with_args(text, args, out, params)?,
            CondNode::Group(group) => {
                if group.nodes.len() > 1 {
                    out.push('(');
                    write_condition(group, out, params)?;
                    out.push(')');
                } else {
                    write_condition(group, out, params)?;
                }
            }
        }
    }
    Ok(())
}

/// Substitute the `?` placeholders of `text` left to right with `args`.
///
/// Plain values re-emit the placeholder and push the value; statements and
/// fragments replace the placeholder with their rendered text.
fn write_sql_with_args(
    text: &str,
    args: &[Arg],
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    let segments = split_at_placeholders(text);
    let placeholders = segments.len() - 1;
    if placeholders != args.len() {
        return Err(QueryBuildError::PlaceholderMismatch {
            condition: text.to_string(),
            placeholders,
            params: args.len(),
        });
    }

    for (i, segment) in segments.iter().enumerate() {
        out.push_str(segment);
        if i < args.len() {
            write_arg(&args[i], out, params)?;
        }
    }
    Ok(())
}

fn write_arg(
    arg: &Arg,
    out: &mut String,
    params: &mut Vec<PgValue>,
) -> Result<(), QueryBuildError> {
    match arg {
        Arg::Value(value) => {
            out.push('?');
            params.push(value.clone());
        }
        Arg::Statement(sub) => {
            out.push('(');
            write_statement(sub, out, params)?;
            out.push(')');
        }
        Arg::Raw(raw) => write_sql_with_args(&raw.sql, &raw.args, out, params)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::fluent::{Arg, Condition, Statement};
    use crate::types::PgValue;

    #[test]
    fn renders_select_with_params_in_order() {
        let mut query = Statement::new()
            .select(["id", "name"])
            .unwrap()
            .from("users")
            .unwrap()
            .where_("id = ?", [Arg::from(5)])
            .limit(1);
        let rendered = query.build().unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT id, name FROM users WHERE id = ? LIMIT ?"
        );
        assert_eq!(rendered.params, vec![PgValue::Int(5), PgValue::Int(1)]);
    }

    #[test]
    fn single_leaf_condition_has_no_parentheses() {
        let mut query = Statement::new()
            .select(["id"])
            .unwrap()
            .from("t")
            .unwrap()
            .where_("a = ?", [Arg::from(1)]);
        assert_eq!(
            query.build().unwrap().sql,
            "SELECT id FROM t WHERE a = ?"
        );
    }

    #[test]
    fn nested_or_group_is_parenthesized() {
        let mut query = Statement::new()
            .select(["id"])
            .unwrap()
            .from("t")
            .unwrap()
            .where_("a = ?", [Arg::from(1)]);
        query
            .where_or()
            .add("b = ?", [Arg::from(2)])
            .add("c = ?", [Arg::from(3)]);
        let rendered = query.build().unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT id FROM t WHERE a = ? AND (b = ? OR c = ?)"
        );
        assert_eq!(
            rendered.params,
            vec![PgValue::Int(1), PgValue::Int(2), PgValue::Int(3)]
        );
    }

    #[test]
    fn multi_row_insert_binds_row_major() {
        let mut query = Statement::new()
            .insert_into("t")
            .unwrap()
            .rows(vec![vec![("a", 1), ("b", 2)], vec![("a", 3), ("b", 4)]]);
        let rendered = query.build().unwrap();
        assert_eq!(
            rendered.sql,
            "INSERT INTO t (a, b) VALUES (?, ?), (?, ?)"
        );
        assert_eq!(
            rendered.params,
            vec![
                PgValue::Int(1),
                PgValue::Int(2),
                PgValue::Int(3),
                PgValue::Int(4)
            ]
        );
    }

    #[test]
    fn nested_statement_argument_splices_parameters() {
        let inner = Statement::new()
            .select(["user_id"])
            .unwrap()
            .from("banned")
            .unwrap()
            .where_("until > ?", [Arg::from(100)]);
        let mut query = Statement::new()
            .select(["id"])
            .unwrap()
            .from("users")
            .unwrap()
            .where_("id NOT IN ?", [Arg::from(inner)])
            .where_("active = ?", [Arg::from(true)]);
        let rendered = query.build().unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT id FROM users WHERE id NOT IN (SELECT user_id FROM banned WHERE until > ?) AND active = ?"
        );
        assert_eq!(rendered.params, vec![PgValue::Int(100), PgValue::Bool(true)]);
    }

    #[test]
    fn combine_query_parameters_keep_occurrence_order() {
        let second = Statement::new()
            .select(["id"])
            .unwrap()
            .from("archived")
            .unwrap()
            .where_("year = ?", [Arg::from(2020)]);
        let mut query = Statement::new()
            .select(["id"])
            .unwrap()
            .from("current")
            .unwrap()
            .where_("year = ?", [Arg::from(2024)])
            .union(second)
            .order_by(["id"]);
        let rendered = query.build().unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT id FROM current WHERE year = ? UNION (SELECT id FROM archived WHERE year = ?) ORDER BY id"
        );
        assert_eq!(
            rendered.params,
            vec![PgValue::Int(2024), PgValue::Int(2020)]
        );
    }

    #[test]
    fn join_renders_on_condition() {
        let mut query = Statement::new()
            .select(["u.id", "o.total"])
            .unwrap()
            .from_as("users", "u")
            .unwrap()
            .left_join("orders", "o")
            .unwrap()
            .on("o", "o.user_id = u.id", []);
        assert_eq!(
            query.build().unwrap().sql,
            "SELECT u.id, o.total FROM users AS u LEFT OUTER JOIN orders AS o ON o.user_id = u.id"
        );
    }

    #[test]
    fn join_without_on_condition_fails() {
        let mut query = Statement::new()
            .select(["id"])
            .unwrap()
            .from("users")
            .unwrap()
            .inner_join("orders", "o")
            .unwrap();
        assert!(matches!(
            query.build(),
            Err(crate::error::QueryBuildError::MissingOnCondition(alias)) if alias == "o"
        ));
    }

    #[test]
    fn on_for_unregistered_alias_fails_at_render() {
        let mut query = Statement::new()
            .select(["id"])
            .unwrap()
            .from("users")
            .unwrap()
            .on("ghost", "1 = 1", []);
        assert!(matches!(
            query.build(),
            Err(crate::error::QueryBuildError::UnknownAlias(alias)) if alias == "ghost"
        ));
    }

    #[test]
    fn placeholder_count_mismatch_fails() {
        let mut query = Statement::new()
            .select(["id"])
            .unwrap()
            .from("t")
            .unwrap()
            .where_("a = ? AND b = ?", [Arg::from(1)]);
        assert!(matches!(
            query.build(),
            Err(crate::error::QueryBuildError::PlaceholderMismatch {
                placeholders: 2,
                params: 1,
                ..
            })
        ));
    }

    #[test]
    fn update_renders_set_where_returning() {
        let mut query = Statement::new()
            .update()
            .table_as("users", "u")
            .unwrap()
            .set([("name", Arg::from("bob")), ("age", Arg::from(42))])
            .where_("u.id = ?", [Arg::from(7)])
            .returning(["u.id"])
            .unwrap();
        let rendered = query.build().unwrap();
        assert_eq!(
            rendered.sql,
            "UPDATE users AS u SET name = ?, age = ? WHERE u.id = ? RETURNING u.id"
        );
        assert_eq!(
            rendered.params,
            vec![
                PgValue::Text("bob".into()),
                PgValue::Int(42),
                PgValue::Int(7)
            ]
        );
    }

    #[test]
    fn update_renders_secondary_from_tables() {
        let mut query = Statement::new()
            .update()
            .table_as("orders", "o")
            .unwrap()
            .set([("total", Arg::from(0))])
            .from_as("customers", "c")
            .unwrap()
            .where_("o.customer_id = c.id", [])
            .where_("c.banned = ?", [Arg::from(true)]);
        assert_eq!(
            query.build().unwrap().sql,
            "UPDATE orders AS o SET total = ? FROM customers AS c WHERE o.customer_id = c.id AND c.banned = ?"
        );
    }

    #[test]
    fn cross_join_carries_no_on_condition() {
        let mut query = Statement::new()
            .select(["a.x", "b.y"])
            .unwrap()
            .from_as("alpha", "a")
            .unwrap()
            .cross_join("beta", "b")
            .unwrap();
        assert_eq!(
            query.build().unwrap().sql,
            "SELECT a.x, b.y FROM alpha AS a CROSS JOIN beta AS b"
        );
    }

    #[test]
    fn insert_select_renders_source_query() {
        let mut query = Statement::new()
            .insert_into("archive")
            .unwrap()
            .insert_columns(["id", "name"])
            .select(["id", "name"])
            .unwrap()
            .from("users")
            .unwrap()
            .where_("retired = ?", [Arg::from(true)]);
        assert_eq!(
            query.build().unwrap().sql,
            "INSERT INTO archive (id, name) SELECT id, name FROM users WHERE retired = ?"
        );
    }

    #[test]
    fn delete_and_truncate_render() {
        let mut del = Statement::new()
            .delete()
            .table("users")
            .unwrap()
            .where_("id = ?", [Arg::from(1)]);
        assert_eq!(del.build().unwrap().sql, "DELETE FROM users WHERE id = ?");

        let mut trunc = Statement::new().truncate().table("users").unwrap();
        assert_eq!(trunc.build().unwrap().sql, "TRUNCATE users");
    }

    #[test]
    fn render_is_idempotent_until_mutation() {
        let mut query = Statement::new()
            .select(["id"])
            .unwrap()
            .from("t")
            .unwrap()
            .where_("a = ?", [Arg::from(1)]);
        let first = query.build().unwrap().clone();
        let second = query.build().unwrap().clone();
        assert_eq!(first, second);

        let mut query = query.limit(10);
        let third = query.build().unwrap();
        assert_ne!(first.sql, third.sql);
    }

    #[test]
    fn reset_restores_slot_default() {
        let mut query = Statement::new()
            .select(["id"])
            .unwrap()
            .from("t")
            .unwrap()
            .limit(5)
            .reset(crate::fluent::ParamKey::Limit);
        assert_eq!(query.build().unwrap().sql, "SELECT id FROM t");
    }

    #[test]
    fn standalone_condition_groups_compose() {
        let nested = Condition::new_or()
            .with("b = ?", [Arg::from(2)])
            .with("c = ?", [Arg::from(3)]);
        let mut query = Statement::new()
            .select(["id"])
            .unwrap()
            .from("t")
            .unwrap()
            .where_("a = ?", [Arg::from(1)])
            .where_group(nested);
        assert_eq!(
            query.build().unwrap().sql,
            "SELECT id FROM t WHERE a = ? AND (b = ? OR c = ?)"
        );
    }

    #[test]
    fn prefix_and_suffix_wrap_statement() {
        let mut query = Statement::new()
            .select(["id"])
            .unwrap()
            .from("t")
            .unwrap()
            .prefix("WITH ranked AS (SELECT 1)", [])
            .suffix("FOR UPDATE", []);
        assert_eq!(
            query.build().unwrap().sql,
            "WITH ranked AS (SELECT 1) SELECT id FROM t FOR UPDATE"
        );
    }

    #[test]
    fn sub_select_as_table_requires_alias() {
        let sub = Statement::new().select(["1"]).unwrap();
        let err = Statement::new()
            .select(["x"])
            .unwrap()
            .from(sub)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::QueryBuildError::QueryableWithoutAlias
        ));
    }

    #[test]
    fn duplicate_alias_fails_at_add() {
        let err = Statement::new()
            .from("users")
            .unwrap()
            .from("users")
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::QueryBuildError::DuplicateAlias(alias) if alias == "users"
        ));
    }

    #[test]
    fn second_main_table_fails() {
        let err = Statement::new()
            .table("a")
            .unwrap()
            .table("b")
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::QueryBuildError::MultipleMainTables
        ));
    }
}
