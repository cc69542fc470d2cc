//! The engine-facing query representation and its construction from the
//! sqlparser AST.

use std::collections::HashMap;

use sqlparser::ast as sql_ast;

use super::{ParseError, ParseResult};
use crate::types::FieldType;

/// The "all fields" marker accepted in a select's field list.
pub const WILDCARD: &str = "*";

/// The command carried by a [`ParsedQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// CREATE TABLE — handled by the registry, not a table store.
    Create,
    /// SELECT.
    Select,
    /// INSERT.
    Insert,
    /// UPDATE.
    Update,
    /// DELETE.
    Delete,
    /// DROP TABLE.
    Drop,
    /// CREATE INDEX — validates fields, builds no structure.
    CreateIndex,
}

/// A declared column in a CREATE TABLE command.
///
/// Carries both the resolved [`FieldType`] (possibly `Unknown`) and the
/// declared type text so creation failures can name the offending type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Resolved field type; `Unknown` if the declared type is unrecognized.
    pub field_type: FieldType,
    /// The type as written in the statement.
    pub type_name: String,
}

/// A comparison operator in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=` / `<>`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Gte,
    /// `<=`
    Lte,
}

/// One side of a condition: a field reference or a bare literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A reference to a schema field, resolved per record at evaluation.
    Field(String),
    /// A literal carried in its text form.
    Literal(String),
}

/// A single comparison test. A query's WHERE clause is a conjunction of
/// these, satisfied only if every condition is individually true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Left operand.
    pub lhs: Operand,
    /// Comparison operator.
    pub op: CompareOp,
    /// Right operand.
    pub rhs: Operand,
}

/// A fully parsed query command, the only input the executor accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    /// What to do.
    pub kind: CommandKind,
    /// Target table name.
    pub table: String,
    /// Requested field list; may contain the [`WILDCARD`] marker.
    pub fields: Vec<String>,
    /// field -> new value for UPDATE.
    pub updates: HashMap<String, String>,
    /// Row-literal tuples for INSERT, positionally aligned with `fields`.
    pub inserts: Vec<Vec<String>>,
    /// Conjunction of comparison conditions.
    pub conditions: Vec<Condition>,
    /// Declared columns for CREATE TABLE.
    pub columns: Vec<ColumnSpec>,
}

impl ParsedQuery {
    /// Creates an empty query of the given kind against a table.
    pub fn new(kind: CommandKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            fields: Vec::new(),
            updates: HashMap::new(),
            inserts: Vec::new(),
            conditions: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Converts from sqlparser's Statement.
    pub fn from_sql_ast(stmt: sql_ast::Statement) -> ParseResult<Self> {
        match stmt {
            sql_ast::Statement::Query(query) => from_select(*query),
            sql_ast::Statement::Insert {
                table_name,
                columns,
                source,
                ..
            } => from_insert(table_name, columns, source),
            sql_ast::Statement::Update {
                table,
                assignments,
                from,
                selection,
                ..
            } => from_update(table, assignments, from, selection),
            sql_ast::Statement::Delete {
                from, selection, ..
            } => from_delete(from, selection),
            sql_ast::Statement::CreateTable { name, columns, .. } => from_create(name, columns),
            sql_ast::Statement::CreateIndex {
                table_name,
                columns,
                ..
            } => from_create_index(table_name, columns),
            sql_ast::Statement::Drop {
                object_type: sql_ast::ObjectType::Table,
                names,
                ..
            } => from_drop(names),
            other => Err(ParseError::Unsupported(format!(
                "statement: {other}"
            ))),
        }
    }
}

fn from_select(query: sql_ast::Query) -> ParseResult<ParsedQuery> {
    if !query.order_by.is_empty() {
        return Err(ParseError::Unsupported("ORDER BY".into()));
    }
    if query.limit.is_some() || query.offset.is_some() {
        return Err(ParseError::Unsupported("LIMIT/OFFSET".into()));
    }

    let select = match *query.body {
        sql_ast::SetExpr::Select(select) => *select,
        other => {
            return Err(ParseError::Unsupported(format!(
                "query body: {other}"
            )))
        }
    };
    if select.distinct.is_some() {
        return Err(ParseError::Unsupported("DISTINCT".into()));
    }
    if select.having.is_some() {
        return Err(ParseError::Unsupported("HAVING".into()));
    }
    match &select.group_by {
        sql_ast::GroupByExpr::All => return Err(ParseError::Unsupported("GROUP BY".into())),
        sql_ast::GroupByExpr::Expressions(exprs) if !exprs.is_empty() => {
            return Err(ParseError::Unsupported("GROUP BY".into()))
        }
        _ => {}
    }

    let mut parsed = ParsedQuery::new(CommandKind::Select, table_name(&select.from)?);

    for item in select.projection {
        match item {
            sql_ast::SelectItem::Wildcard(_) => parsed.fields.push(WILDCARD.to_string()),
            sql_ast::SelectItem::UnnamedExpr(expr) => parsed.fields.push(field_name(&expr)?),
            other => {
                return Err(ParseError::Unsupported(format!(
                    "projection: {other}"
                )))
            }
        }
    }

    parsed.conditions = conditions(select.selection)?;
    Ok(parsed)
}

fn from_insert(
    table_name: sql_ast::ObjectName,
    columns: Vec<sql_ast::Ident>,
    source: Option<Box<sql_ast::Query>>,
) -> ParseResult<ParsedQuery> {
    if columns.is_empty() {
        return Err(ParseError::Unsupported(
            "INSERT requires an explicit column list".into(),
        ));
    }

    let mut parsed = ParsedQuery::new(CommandKind::Insert, object_name(&table_name)?);
    parsed.fields = columns.into_iter().map(|c| c.value).collect();

    let source = source.ok_or_else(|| {
        ParseError::Unsupported("INSERT without a VALUES clause".into())
    })?;
    let rows = match *source.body {
        sql_ast::SetExpr::Values(values) => values.rows,
        other => {
            return Err(ParseError::Unsupported(format!(
                "INSERT source: {other}"
            )))
        }
    };

    for row in rows {
        let mut cells = Vec::with_capacity(row.len());
        for expr in row {
            cells.push(literal_text(&expr)?);
        }
        parsed.inserts.push(cells);
    }

    Ok(parsed)
}

fn from_update(
    table: sql_ast::TableWithJoins,
    assignments: Vec<sql_ast::Assignment>,
    from: Option<sql_ast::TableWithJoins>,
    selection: Option<sql_ast::Expr>,
) -> ParseResult<ParsedQuery> {
    if from.is_some() {
        return Err(ParseError::Unsupported("UPDATE ... FROM".into()));
    }

    let mut parsed = ParsedQuery::new(
        CommandKind::Update,
        table_name(std::slice::from_ref(&table))?,
    );

    for assignment in assignments {
        let [column] = assignment.id.as_slice() else {
            return Err(ParseError::Unsupported(
                "qualified assignment target".into(),
            ));
        };
        parsed
            .updates
            .insert(column.value.clone(), literal_text(&assignment.value)?);
    }

    parsed.conditions = conditions(selection)?;
    Ok(parsed)
}

fn from_delete(
    from: Vec<sql_ast::TableWithJoins>,
    selection: Option<sql_ast::Expr>,
) -> ParseResult<ParsedQuery> {
    let mut parsed = ParsedQuery::new(CommandKind::Delete, table_name(&from)?);
    parsed.conditions = conditions(selection)?;
    Ok(parsed)
}

fn from_create(
    name: sql_ast::ObjectName,
    columns: Vec<sql_ast::ColumnDef>,
) -> ParseResult<ParsedQuery> {
    let mut parsed = ParsedQuery::new(CommandKind::Create, object_name(&name)?);

    for column in columns {
        let type_name = column.data_type.to_string();
        parsed.columns.push(ColumnSpec {
            name: column.name.value,
            field_type: field_type(&column.data_type),
            type_name,
        });
    }

    Ok(parsed)
}

fn from_create_index(
    table_name: sql_ast::ObjectName,
    columns: Vec<sql_ast::OrderByExpr>,
) -> ParseResult<ParsedQuery> {
    let mut parsed = ParsedQuery::new(CommandKind::CreateIndex, object_name(&table_name)?);
    for column in columns {
        parsed.fields.push(field_name(&column.expr)?);
    }
    Ok(parsed)
}

fn from_drop(names: Vec<sql_ast::ObjectName>) -> ParseResult<ParsedQuery> {
    let [name] = names.as_slice() else {
        return Err(ParseError::Unsupported(
            "DROP TABLE with multiple names".into(),
        ));
    };
    Ok(ParsedQuery::new(CommandKind::Drop, object_name(name)?))
}

/// Maps a declared SQL type onto the engine's field types. Anything outside
/// the supported set becomes the `Unknown` sentinel, which table creation
/// rejects.
fn field_type(data_type: &sql_ast::DataType) -> FieldType {
    match data_type {
        sql_ast::DataType::Text => FieldType::Text,
        sql_ast::DataType::Bool | sql_ast::DataType::Boolean => FieldType::Bool,
        sql_ast::DataType::Int(_) | sql_ast::DataType::Integer(_) => FieldType::Int,
        sql_ast::DataType::Datetime(_) => FieldType::DateTime,
        _ => FieldType::Unknown,
    }
}

/// Extracts the single unqualified table of a FROM clause.
fn table_name(from: &[sql_ast::TableWithJoins]) -> ParseResult<String> {
    let [table] = from else {
        return Err(ParseError::Unsupported(
            "queries must target exactly one table".into(),
        ));
    };
    if !table.joins.is_empty() {
        return Err(ParseError::Unsupported("JOIN".into()));
    }
    match &table.relation {
        sql_ast::TableFactor::Table { name, .. } => object_name(name),
        other => Err(ParseError::Unsupported(format!(
            "table factor: {other}"
        ))),
    }
}

fn object_name(name: &sql_ast::ObjectName) -> ParseResult<String> {
    let [ident] = name.0.as_slice() else {
        return Err(ParseError::Unsupported(format!(
            "qualified name: {name}"
        )));
    };
    Ok(ident.value.clone())
}

fn field_name(expr: &sql_ast::Expr) -> ParseResult<String> {
    match expr {
        sql_ast::Expr::Identifier(ident) => Ok(ident.value.clone()),
        other => Err(ParseError::Unsupported(format!(
            "expected a field name, found: {other}"
        ))),
    }
}

/// Flattens a WHERE clause into a conjunction of comparisons.
fn conditions(selection: Option<sql_ast::Expr>) -> ParseResult<Vec<Condition>> {
    let mut out = Vec::new();
    if let Some(expr) = selection {
        collect_conditions(expr, &mut out)?;
    }
    Ok(out)
}

fn collect_conditions(expr: sql_ast::Expr, out: &mut Vec<Condition>) -> ParseResult<()> {
    match expr {
        sql_ast::Expr::BinaryOp { left, op, right } => match compare_op(&op) {
            Some(op) => {
                out.push(Condition {
                    lhs: operand(*left)?,
                    op,
                    rhs: operand(*right)?,
                });
                Ok(())
            }
            None if op == sql_ast::BinaryOperator::And => {
                collect_conditions(*left, out)?;
                collect_conditions(*right, out)
            }
            None => Err(ParseError::Unsupported(format!("operator: {op}"))),
        },
        sql_ast::Expr::Nested(inner) => collect_conditions(*inner, out),
        other => Err(ParseError::Unsupported(format!(
            "condition: {other}"
        ))),
    }
}

fn compare_op(op: &sql_ast::BinaryOperator) -> Option<CompareOp> {
    match op {
        sql_ast::BinaryOperator::Eq => Some(CompareOp::Eq),
        sql_ast::BinaryOperator::NotEq => Some(CompareOp::Ne),
        sql_ast::BinaryOperator::Gt => Some(CompareOp::Gt),
        sql_ast::BinaryOperator::Lt => Some(CompareOp::Lt),
        sql_ast::BinaryOperator::GtEq => Some(CompareOp::Gte),
        sql_ast::BinaryOperator::LtEq => Some(CompareOp::Lte),
        _ => None,
    }
}

fn operand(expr: sql_ast::Expr) -> ParseResult<Operand> {
    match expr {
        sql_ast::Expr::Identifier(ident) => Ok(Operand::Field(ident.value)),
        sql_ast::Expr::Nested(inner) => operand(*inner),
        other => Ok(Operand::Literal(literal_text(&other)?)),
    }
}

/// Renders a literal expression as the text form stored in cells: numbers as
/// written (unary minus folded in), strings unquoted, booleans as
/// `true`/`false`.
fn literal_text(expr: &sql_ast::Expr) -> ParseResult<String> {
    match expr {
        sql_ast::Expr::Value(value) => match value {
            sql_ast::Value::Number(text, _) => Ok(text.clone()),
            sql_ast::Value::SingleQuotedString(text) => Ok(text.clone()),
            sql_ast::Value::Boolean(flag) => Ok(flag.to_string()),
            other => Err(ParseError::InvalidLiteral(other.to_string())),
        },
        sql_ast::Expr::UnaryOp {
            op: sql_ast::UnaryOperator::Minus,
            expr,
        } => Ok(format!("-{}", literal_text(expr)?)),
        sql_ast::Expr::Nested(inner) => literal_text(inner),
        other => Err(ParseError::InvalidLiteral(other.to_string())),
    }
}
