//! Column-level lineage extraction from rendered SQL.
//!
//! Reparses a fully rendered statement and walks the AST to recover the set
//! of physical source tables and, per output column, the contributing
//! sources with a Direct/Expression classification. CTE names and subquery
//! aliases are local scopes: their columns are traced through to the
//! underlying physical tables and the aliases themselves never appear in
//! `sources`.

use crate::error::{SqlError, SqlResult};
use crate::parser::SqlParser;
use serde::Serialize;
use sqlparser::ast::{
    Expr, FunctionArg, FunctionArgExpr, FunctionArguments, ObjectName, Query, Select, SelectItem,
    SetExpr, Statement, TableFactor, TableWithJoins,
};
use std::collections::{BTreeSet, HashMap};

/// Optional physical schema: table name -> ordered column names.
/// Used to expand `*` and `t.*` projections.
pub type Schema = HashMap<String, Vec<String>>;

/// Classification of one output column's derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// A bare column reference, possibly wrapped in a single
    /// non-aggregating scalar
    Direct,
    /// Anything else: multiple sources, arithmetic, aggregation, window,
    /// CASE, CAST, literal or generator origin
    Expression,
}

/// One `{table, column}` contribution to an output column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ColumnSource {
    pub table: String,
    pub column: String,
}

/// Provenance of one output column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnLineage {
    pub name: String,
    pub transform: Transform,
    /// Wrapping or aggregating function, lowercased, when there is one
    pub function: Option<String>,
    pub sources: Vec<ColumnSource>,
}

impl ColumnLineage {
    fn direct(name: &str, source: ColumnSource) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::Direct,
            function: None,
            sources: vec![source],
        }
    }

    fn expression(name: &str, sources: Vec<ColumnSource>) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::Expression,
            function: None,
            sources,
        }
    }
}

/// Lineage of one rendered SQL statement.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Lineage {
    /// All referenced physical tables, schema-qualified where the SQL
    /// qualifies them
    pub sources: BTreeSet<String>,
    /// Output columns of the outermost SELECT, in projection order
    pub columns: Vec<ColumnLineage>,
}

impl Lineage {
    /// Find an output column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnLineage> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Aggregate functions always classify as `Expression`.
const AGGREGATES: &[&str] = &[
    "count", "sum", "avg", "min", "max", "array_agg", "string_agg", "listagg", "bool_and",
    "bool_or", "median", "stddev", "stddev_pop", "stddev_samp", "var_pop", "var_samp", "variance",
];

/// Single-argument scalar wrappers that keep a bare column `Direct`.
const DIRECT_SCALARS: &[&str] = &["upper", "lower", "trim"];

/// Extract lineage from one rendered SQL string.
///
/// Purely functional in `(sql, schema)`; invalid or empty SQL is an error.
pub fn extract_lineage(sql: &str, schema: Option<&Schema>) -> SqlResult<Lineage> {
    let parser = SqlParser::duckdb();
    let statements = parser.parse(sql).map_err(|e| match e {
        SqlError::EmptySql => SqlError::EmptySql,
        other => SqlError::Extract(other.to_string()),
    })?;

    let statement = statements
        .into_iter()
        .next()
        .ok_or(SqlError::EmptySql)?;

    let query = match statement {
        Statement::Query(query) => query,
        _ => {
            return Err(SqlError::Extract(
                "statement is not a query".to_string(),
            ))
        }
    };

    let extractor = Extractor { schema };
    extractor.query_lineage(&query, &HashMap::new())
}

/// One relation visible in a FROM scope: a physical table, a CTE, or a
/// derived table.
#[derive(Debug, Clone)]
struct Relation {
    /// Output columns when known (CTE, derived table, physical table with
    /// a supplied schema)
    columns: Option<Vec<ColumnLineage>>,
    /// Physical tables feeding this relation
    sources: BTreeSet<String>,
    /// The physical table name when the relation is one
    table: Option<String>,
}

struct Extractor<'a> {
    schema: Option<&'a Schema>,
}

impl<'a> Extractor<'a> {
    /// Lineage of a query: resolves its CTEs into a child environment,
    /// then descends into the body.
    fn query_lineage(&self, query: &Query, env: &HashMap<String, Relation>) -> SqlResult<Lineage> {
        let mut env = env.clone();

        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                let lineage = self.query_lineage(&cte.query, &env)?;
                let mut columns = lineage.columns;
                // WITH name (a, b) AS (...) renames positionally
                for (column, alias) in columns.iter_mut().zip(&cte.alias.columns) {
                    column.name = alias.value.clone();
                }
                env.insert(
                    cte.alias.name.value.clone(),
                    Relation {
                        columns: Some(columns),
                        sources: lineage.sources,
                        table: None,
                    },
                );
            }
        }

        self.set_expr_lineage(&query.body, &env)
    }

    fn set_expr_lineage(
        &self,
        body: &SetExpr,
        env: &HashMap<String, Relation>,
    ) -> SqlResult<Lineage> {
        match body {
            SetExpr::Select(select) => self.select_lineage(select, env),
            SetExpr::Query(query) => self.query_lineage(query, env),
            SetExpr::SetOperation { left, right, .. } => {
                let left = self.set_expr_lineage(left, env)?;
                let right = self.set_expr_lineage(right, env)?;

                let mut lineage = Lineage::default();
                lineage.sources.extend(left.sources);
                lineage.sources.extend(right.sources.iter().cloned());

                // positional union: column names come from the left branch
                for (idx, column) in left.columns.into_iter().enumerate() {
                    let mut sources: BTreeSet<ColumnSource> =
                        column.sources.into_iter().collect();
                    if let Some(other) = right.columns.get(idx) {
                        sources.extend(other.sources.iter().cloned());
                    }
                    lineage.columns.push(ColumnLineage {
                        name: column.name,
                        transform: Transform::Expression,
                        function: None,
                        sources: sources.into_iter().collect(),
                    });
                }
                Ok(lineage)
            }
            other => Err(SqlError::Extract(format!(
                "unsupported query body: {other}"
            ))),
        }
    }

    fn select_lineage(
        &self,
        select: &Select,
        env: &HashMap<String, Relation>,
    ) -> SqlResult<Lineage> {
        let mut scope: Vec<(String, Relation)> = Vec::new();
        let mut sources: BTreeSet<String> = BTreeSet::new();

        for table in &select.from {
            self.scope_table(table, env, &mut scope, &mut sources)?;
        }

        let mut lineage = Lineage {
            sources,
            columns: Vec::new(),
        };

        for item in &select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) => {
                    let column = self.classify(expr, &scope, env, &mut lineage.sources)?;
                    lineage.columns.push(column);
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    let mut column = self.classify(expr, &scope, env, &mut lineage.sources)?;
                    column.name = alias.value.clone();
                    lineage.columns.push(column);
                }
                SelectItem::Wildcard(_) => {
                    for (_, relation) in &scope {
                        self.expand_star(relation, &mut lineage.columns);
                    }
                }
                SelectItem::QualifiedWildcard(name, _) => {
                    let target = object_name_to_string(name);
                    match scope.iter().find(|(alias, _)| *alias == target) {
                        Some((_, relation)) => self.expand_star(relation, &mut lineage.columns),
                        None => lineage.columns.push(ColumnLineage::direct(
                            "*",
                            ColumnSource {
                                table: target,
                                column: "*".to_string(),
                            },
                        )),
                    }
                }
            }
        }

        Ok(lineage)
    }

    /// Expand `*` against one relation: known columns keep their own
    /// classification; an unknown physical table contributes a single `*`.
    fn expand_star(&self, relation: &Relation, out: &mut Vec<ColumnLineage>) {
        match (&relation.columns, &relation.table) {
            (Some(columns), _) => out.extend(columns.iter().cloned()),
            (None, Some(table)) => out.push(ColumnLineage::direct(
                "*",
                ColumnSource {
                    table: table.clone(),
                    column: "*".to_string(),
                },
            )),
            (None, None) => out.push(ColumnLineage::expression("*", Vec::new())),
        }
    }

    /// Register one FROM-clause item (and its joins) into the scope.
    fn scope_table(
        &self,
        table: &TableWithJoins,
        env: &HashMap<String, Relation>,
        scope: &mut Vec<(String, Relation)>,
        sources: &mut BTreeSet<String>,
    ) -> SqlResult<()> {
        self.scope_factor(&table.relation, env, scope, sources)?;
        for join in &table.joins {
            self.scope_factor(&join.relation, env, scope, sources)?;
        }
        Ok(())
    }

    fn scope_factor(
        &self,
        factor: &TableFactor,
        env: &HashMap<String, Relation>,
        scope: &mut Vec<(String, Relation)>,
        sources: &mut BTreeSet<String>,
    ) -> SqlResult<()> {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let table_name = object_name_to_string(name);
                let scope_name = alias
                    .as_ref()
                    .map(|a| a.name.value.clone())
                    .unwrap_or_else(|| table_name.clone());

                if let Some(cte) = env.get(&table_name) {
                    sources.extend(cte.sources.iter().cloned());
                    scope.push((scope_name, cte.clone()));
                } else {
                    sources.insert(table_name.clone());
                    let columns = self.schema_columns(&table_name);
                    scope.push((
                        scope_name,
                        Relation {
                            columns,
                            sources: BTreeSet::from([table_name.clone()]),
                            table: Some(table_name),
                        },
                    ));
                }
            }
            TableFactor::Derived { subquery, alias, .. } => {
                let lineage = self.query_lineage(subquery, env)?;
                sources.extend(lineage.sources.iter().cloned());
                let scope_name = alias
                    .as_ref()
                    .map(|a| a.name.value.clone())
                    .unwrap_or_else(|| "_subquery".to_string());
                scope.push((
                    scope_name,
                    Relation {
                        columns: Some(lineage.columns),
                        sources: lineage.sources,
                        table: None,
                    },
                ));
            }
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => {
                self.scope_table(table_with_joins, env, scope, sources)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Known columns of a physical table, as Direct lineages, when a schema
    /// was supplied.
    fn schema_columns(&self, table: &str) -> Option<Vec<ColumnLineage>> {
        let schema = self.schema?;
        let columns = schema
            .get(table)
            .or_else(|| schema.get(table.rsplit('.').next().unwrap_or(table)))?;
        Some(
            columns
                .iter()
                .map(|column| {
                    ColumnLineage::direct(
                        column,
                        ColumnSource {
                            table: table.to_string(),
                            column: column.clone(),
                        },
                    )
                })
                .collect(),
        )
    }

    /// Resolve a (possibly qualified) column reference through the scope.
    ///
    /// Resolution through a CTE or derived table propagates that column's
    /// own lineage: a Direct CTE column stays Direct against the underlying
    /// physical table; anything else stays an Expression.
    fn resolve_column(
        &self,
        scope: &[(String, Relation)],
        hint: Option<&str>,
        column: &str,
    ) -> ColumnLineage {
        let through = |relation: &Relation| -> ColumnLineage {
            if let Some(columns) = &relation.columns {
                if let Some(found) = columns.iter().find(|c| c.name == column) {
                    let mut lineage = found.clone();
                    lineage.name = column.to_string();
                    return lineage;
                }
            }
            match &relation.table {
                Some(table) => ColumnLineage::direct(
                    column,
                    ColumnSource {
                        table: table.clone(),
                        column: column.to_string(),
                    },
                ),
                None => ColumnLineage {
                    name: column.to_string(),
                    transform: Transform::Direct,
                    function: None,
                    sources: Vec::new(),
                },
            }
        };

        if let Some(hint) = hint {
            if let Some((_, relation)) = scope.iter().find(|(alias, _)| alias == hint) {
                return through(relation);
            }
            // unknown alias: treat the prefix as a physical table reference
            return ColumnLineage::direct(
                column,
                ColumnSource {
                    table: hint.to_string(),
                    column: column.to_string(),
                },
            );
        }

        // unqualified: first relation that knows this column, else the only
        // relation in scope
        for (_, relation) in scope {
            if let Some(columns) = &relation.columns {
                if columns.iter().any(|c| c.name == column) {
                    return through(relation);
                }
            }
        }
        if let [(_, only)] = scope {
            return through(only);
        }
        ColumnLineage {
            name: column.to_string(),
            transform: Transform::Direct,
            function: None,
            sources: Vec::new(),
        }
    }

    /// Classify one projection expression.
    fn classify(
        &self,
        expr: &Expr,
        scope: &[(String, Relation)],
        env: &HashMap<String, Relation>,
        extra_sources: &mut BTreeSet<String>,
    ) -> SqlResult<ColumnLineage> {
        match expr {
            Expr::Identifier(ident) => Ok(self.resolve_column(scope, None, &ident.value)),

            Expr::CompoundIdentifier(idents) => {
                let column = idents
                    .last()
                    .map(|i| i.value.clone())
                    .unwrap_or_default();
                let hint = idents[..idents.len().saturating_sub(1)]
                    .iter()
                    .map(|i| i.value.clone())
                    .collect::<Vec<_>>()
                    .join(".");
                Ok(self.resolve_column(scope, Some(&hint), &column))
            }

            Expr::Function(function) => {
                self.classify_function(function, scope, env, extra_sources)
            }

            Expr::BinaryOp { left, right, .. } => {
                let mut sources = BTreeSet::new();
                sources.extend(self.classify(left, scope, env, extra_sources)?.sources);
                sources.extend(self.classify(right, scope, env, extra_sources)?.sources);
                Ok(ColumnLineage::expression(
                    &expr.to_string(),
                    sources.into_iter().collect(),
                ))
            }

            Expr::UnaryOp { expr: inner, .. } => {
                let inner = self.classify(inner, scope, env, extra_sources)?;
                Ok(ColumnLineage::expression(&inner.name, inner.sources))
            }

            Expr::Cast { expr: inner, .. } => {
                let inner = self.classify(inner, scope, env, extra_sources)?;
                Ok(ColumnLineage::expression(&inner.name, inner.sources))
            }

            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                let mut sources = BTreeSet::new();
                if let Some(operand) = operand {
                    sources.extend(self.classify(operand, scope, env, extra_sources)?.sources);
                }
                for part in conditions.iter().chain(results.iter()) {
                    sources.extend(self.classify(part, scope, env, extra_sources)?.sources);
                }
                if let Some(else_result) = else_result {
                    sources
                        .extend(self.classify(else_result, scope, env, extra_sources)?.sources);
                }
                Ok(ColumnLineage::expression(
                    "case",
                    sources.into_iter().collect(),
                ))
            }

            Expr::Nested(inner) => self.classify(inner, scope, env, extra_sources),

            Expr::Value(_) | Expr::TypedString { .. } => {
                Ok(ColumnLineage::expression(&expr.to_string(), Vec::new()))
            }

            Expr::IsNull(inner) | Expr::IsNotNull(inner) => {
                let inner = self.classify(inner, scope, env, extra_sources)?;
                Ok(ColumnLineage::expression(&inner.name, inner.sources))
            }

            Expr::Between {
                expr: subject,
                low,
                high,
                ..
            } => {
                let mut sources = BTreeSet::new();
                for part in [subject.as_ref(), low.as_ref(), high.as_ref()] {
                    sources.extend(self.classify(part, scope, env, extra_sources)?.sources);
                }
                Ok(ColumnLineage::expression(
                    "between",
                    sources.into_iter().collect(),
                ))
            }

            Expr::InList { expr: subject, list, .. } => {
                let mut sources = BTreeSet::new();
                sources.extend(self.classify(subject, scope, env, extra_sources)?.sources);
                for item in list {
                    sources.extend(self.classify(item, scope, env, extra_sources)?.sources);
                }
                Ok(ColumnLineage::expression(
                    "in",
                    sources.into_iter().collect(),
                ))
            }

            Expr::InSubquery { expr: subject, subquery, .. } => {
                let mut sources = BTreeSet::new();
                sources.extend(self.classify(subject, scope, env, extra_sources)?.sources);
                let inner = self.query_lineage(subquery, env)?;
                extra_sources.extend(inner.sources);
                Ok(ColumnLineage::expression(
                    "in",
                    sources.into_iter().collect(),
                ))
            }

            Expr::Subquery(subquery) => {
                let inner = self.query_lineage(subquery, env)?;
                extra_sources.extend(inner.sources.iter().cloned());
                let mut sources = BTreeSet::new();
                for column in inner.columns {
                    sources.extend(column.sources);
                }
                Ok(ColumnLineage::expression(
                    "subquery",
                    sources.into_iter().collect(),
                ))
            }

            Expr::Exists { subquery, .. } => {
                let inner = self.query_lineage(subquery, env)?;
                extra_sources.extend(inner.sources);
                Ok(ColumnLineage::expression("exists", Vec::new()))
            }

            Expr::Tuple(items) => {
                let mut sources = BTreeSet::new();
                for item in items {
                    sources.extend(self.classify(item, scope, env, extra_sources)?.sources);
                }
                Ok(ColumnLineage::expression(
                    "tuple",
                    sources.into_iter().collect(),
                ))
            }

            other => Ok(ColumnLineage::expression(&other.to_string(), Vec::new())),
        }
    }

    fn classify_function(
        &self,
        function: &sqlparser::ast::Function,
        scope: &[(String, Relation)],
        env: &HashMap<String, Relation>,
        extra_sources: &mut BTreeSet<String>,
    ) -> SqlResult<ColumnLineage> {
        let name = object_name_to_string(&function.name).to_lowercase();
        let is_window = function.over.is_some();

        let mut arg_lineages: Vec<ColumnLineage> = Vec::new();
        match &function.args {
            FunctionArguments::None => {}
            FunctionArguments::Subquery(subquery) => {
                let inner = self.query_lineage(subquery, env)?;
                extra_sources.extend(inner.sources.iter().cloned());
                let mut sources = BTreeSet::new();
                for column in inner.columns {
                    sources.extend(column.sources);
                }
                arg_lineages.push(ColumnLineage::expression(
                    "subquery",
                    sources.into_iter().collect(),
                ));
            }
            FunctionArguments::List(list) => {
                for arg in &list.args {
                    let arg_expr = match arg {
                        FunctionArg::Unnamed(arg_expr) => arg_expr,
                        FunctionArg::Named { arg, .. } => arg,
                    };
                    match arg_expr {
                        FunctionArgExpr::Expr(expr) => {
                            arg_lineages
                                .push(self.classify(expr, scope, env, extra_sources)?);
                        }
                        // wildcard arguments (COUNT(*)) contribute no sources
                        FunctionArgExpr::Wildcard | FunctionArgExpr::QualifiedWildcard(_) => {}
                    }
                }
            }
        }

        let mut sources: BTreeSet<ColumnSource> = BTreeSet::new();
        for arg in &arg_lineages {
            sources.extend(arg.sources.iter().cloned());
        }
        let sources: Vec<ColumnSource> = sources.into_iter().collect();

        let transform = if is_window || AGGREGATES.contains(&name.as_str()) {
            Transform::Expression
        } else if arg_lineages.is_empty() {
            // zero-argument generators (NOW(), RANDOM()) and wildcard-only calls
            Transform::Expression
        } else if name == "coalesce" {
            if sources.len() <= 1 {
                Transform::Direct
            } else {
                Transform::Expression
            }
        } else if DIRECT_SCALARS.contains(&name.as_str())
            && arg_lineages.len() == 1
            && arg_lineages[0].transform == Transform::Direct
            && sources.len() == 1
        {
            Transform::Direct
        } else {
            Transform::Expression
        };

        Ok(ColumnLineage {
            name: name.clone(),
            transform,
            function: Some(name),
            sources,
        })
    }
}

fn object_name_to_string(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.clone())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
#[path = "lineage_test.rs"]
mod tests;
