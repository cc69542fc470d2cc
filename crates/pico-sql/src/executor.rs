//! Query execution over a single table.
//!
//! Each operation validates every referenced field against the schema
//! before touching a row, so a schema error never leaves partial effects
//! behind. Reads take the table's shared lock, mutations the exclusive
//! lock; one operation is atomic with respect to other operations on the
//! same table, and nothing more is promised across requests.

use std::collections::HashMap;

use crate::error::{SqlError, SqlResult};
use crate::parser::{CompareOp, Condition, Operand, ParsedQuery, WILDCARD};
use crate::table::Table;
use crate::types::{FieldType, Record, Schema};

/// An output row: a name -> value projection limited to the requested
/// fields.
pub type OutputRow = HashMap<String, String>;

impl Table {
    /// Projects every record satisfying the condition conjunction onto the
    /// requested fields. An empty condition list selects all records; the
    /// wildcard marker projects every schema field.
    pub fn select(&self, query: &ParsedQuery) -> SqlResult<Vec<OutputRow>> {
        self.validate(query)?;

        let rows = self.rows.read();
        let mut out = Vec::new();
        for record in rows.iter() {
            if !self.matches(&query.conditions, record) {
                continue;
            }
            let mut fields = OutputRow::new();
            for field in &query.fields {
                if field == WILDCARD {
                    for (index, (name, _)) in self.schema().iter().enumerate() {
                        fields.insert(name.to_string(), record.cell(index).to_string());
                    }
                } else {
                    let index = self.field_index(field)?;
                    fields.insert(field.clone(), record.cell(index).to_string());
                }
            }
            out.push(fields);
        }
        Ok(out)
    }

    /// Appends one record per literal tuple. Cells are placed at the schema
    /// index of the corresponding requested field, so insert field order
    /// need not match schema order; unnamed columns default to the empty
    /// string. Nothing is appended if any tuple fails validation.
    pub fn insert(&self, query: &ParsedQuery) -> SqlResult<usize> {
        self.validate(query)?;

        let mut indices = Vec::with_capacity(query.fields.len());
        for field in &query.fields {
            indices.push(self.field_index(field)?);
        }

        let mut staged = Vec::with_capacity(query.inserts.len());
        for tuple in &query.inserts {
            if tuple.len() != indices.len() {
                return Err(SqlError::ArityMismatch {
                    expected: indices.len(),
                    actual: tuple.len(),
                });
            }
            let mut record = Record::empty(self.schema().len());
            for (value, &index) in tuple.iter().zip(&indices) {
                record.set_cell(index, value.clone());
            }
            staged.push(record);
        }

        let count = staged.len();
        self.rows.write().extend(staged);
        Ok(count)
    }

    /// Overwrites the updated cells of every record satisfying the
    /// condition conjunction, in place. Returns the number of records
    /// touched.
    pub fn update(&self, query: &ParsedQuery) -> SqlResult<usize> {
        self.validate(query)?;

        let mut updates = Vec::with_capacity(query.updates.len());
        for (field, value) in &query.updates {
            updates.push((self.field_index(field)?, value.clone()));
        }

        let mut rows = self.rows.write();
        let mut touched = 0;
        for i in 0..rows.len() {
            if !self.matches(&query.conditions, &rows[i]) {
                continue;
            }
            for (index, value) in &updates {
                rows[i].set_cell(*index, value.clone());
            }
            touched += 1;
        }
        Ok(touched)
    }

    /// Removes every record satisfying the condition conjunction with a
    /// two-pointer in-place compaction: a forward scan pulls the nearest
    /// surviving record down from the live tail into each vacated slot,
    /// then the collection is truncated to the live length. One linear
    /// pass, no allocation proportional to the table, row order not
    /// preserved. Running the same delete twice is a no-op the second time.
    pub fn delete(&self, query: &ParsedQuery) -> SqlResult<usize> {
        self.validate(query)?;

        let mut rows = self.rows.write();
        let total = rows.len();
        let mut live = total;
        let mut deleted = 0;
        let mut i = 0;
        'scan: while i < live {
            if self.matches(&query.conditions, &rows[i]) {
                deleted += 1;
                // Walk the live boundary backward to the nearest survivor;
                // matches passed over on the way are deleted as well.
                loop {
                    if live - 1 == i {
                        break 'scan;
                    }
                    live -= 1;
                    if self.matches(&query.conditions, &rows[live]) {
                        deleted += 1;
                    } else {
                        rows.swap(i, live);
                        break;
                    }
                }
            }
            i += 1;
        }
        rows.truncate(total - deleted);
        Ok(deleted)
    }

    /// Validates that all referenced fields exist. Builds no index
    /// structure; the operation is accepted so that a future index layer
    /// can slot in behind the same contract.
    pub fn create_index(&self, query: &ParsedQuery) -> SqlResult<()> {
        let _rows = self.rows.read();
        self.validate(query)
    }
}

/// Evaluates one condition against a record.
///
/// Operands resolve to `(text, type)` pairs: a field reference anchors its
/// declared type, a literal has none. A condition with no field operand is
/// unsatisfiable, as is one whose two field operands disagree on type. The
/// anchoring type then picks the operator table: TEXT and BOOL support
/// equality only, INT the full set over parsed integers (an unparseable
/// integer makes the condition false rather than erroring), and DATETIME
/// has no comparison semantics at all.
pub(crate) fn eval_condition(schema: &Schema, condition: &Condition, record: &Record) -> bool {
    let Some((lhs, lhs_type)) = resolve(schema, &condition.lhs, record) else {
        return false;
    };
    let Some((rhs, rhs_type)) = resolve(schema, &condition.rhs, record) else {
        return false;
    };

    let anchor = match (lhs_type, rhs_type) {
        (Some(a), Some(b)) if a != b => return false,
        (Some(a), _) => a,
        (None, Some(b)) => b,
        (None, None) => return false,
    };

    match anchor {
        FieldType::Text => match condition.op {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            _ => false,
        },
        FieldType::Bool => {
            let lhs = lhs == "true";
            let rhs = rhs == "true";
            match condition.op {
                CompareOp::Eq => lhs == rhs,
                CompareOp::Ne => lhs != rhs,
                _ => false,
            }
        }
        FieldType::Int => {
            let (Ok(lhs), Ok(rhs)) = (lhs.parse::<i64>(), rhs.parse::<i64>()) else {
                return false;
            };
            match condition.op {
                CompareOp::Eq => lhs == rhs,
                CompareOp::Ne => lhs != rhs,
                CompareOp::Gt => lhs > rhs,
                CompareOp::Lt => lhs < rhs,
                CompareOp::Gte => lhs >= rhs,
                CompareOp::Lte => lhs <= rhs,
            }
        }
        FieldType::DateTime | FieldType::Unknown => false,
    }
}

fn resolve<'a>(
    schema: &Schema,
    operand: &'a Operand,
    record: &'a Record,
) -> Option<(&'a str, Option<FieldType>)> {
    match operand {
        Operand::Field(field) => {
            let index = schema.field_index(field)?;
            Some((record.cell(index), schema.field_type(field)))
        }
        Operand::Literal(value) => Some((value.as_str(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn users_table() -> Table {
        let schema = Schema::new(vec![
            ("id".into(), FieldType::Int),
            ("name".into(), FieldType::Text),
            ("active".into(), FieldType::Bool),
            ("born".into(), FieldType::DateTime),
        ])
        .unwrap();
        Table::new("users", schema)
    }

    fn seed(table: &Table, rows: &[(&str, &str, &str)]) {
        for (id, name, active) in rows {
            let sql = format!(
                "INSERT INTO users (id, name, active) VALUES ({id}, '{name}', {active})"
            );
            table.insert(&parse(&sql).unwrap()).unwrap();
        }
    }

    fn ids(rows: &[OutputRow]) -> Vec<String> {
        let mut ids: Vec<String> = rows.iter().map(|r| r["id"].clone()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_insert_select_round_trip() {
        let table = users_table();
        seed(&table, &[("1", "alice", "true")]);

        let rows = table.select(&parse("SELECT * FROM users").unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "1");
        assert_eq!(rows[0]["name"], "alice");
        assert_eq!(rows[0]["active"], "true");
        assert_eq!(rows[0]["born"], "");
    }

    #[test]
    fn test_insert_field_order_independent_of_schema() {
        let table = users_table();
        let q = parse("INSERT INTO users (name, id) VALUES ('bob', 2)").unwrap();
        assert_eq!(table.insert(&q).unwrap(), 1);

        let rows = table
            .select(&parse("SELECT id, name FROM users").unwrap())
            .unwrap();
        assert_eq!(rows[0]["id"], "2");
        assert_eq!(rows[0]["name"], "bob");
    }

    #[test]
    fn test_select_projection_limited_to_requested_fields() {
        let table = users_table();
        seed(&table, &[("1", "alice", "true")]);

        let rows = table
            .select(&parse("SELECT name FROM users").unwrap())
            .unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["name"], "alice");
    }

    #[test]
    fn test_select_conditions_conjunction() {
        let table = users_table();
        seed(
            &table,
            &[("1", "alice", "true"), ("2", "bob", "true"), ("3", "carol", "false")],
        );

        let rows = table
            .select(&parse("SELECT id FROM users WHERE id > 1 AND active = true").unwrap())
            .unwrap();
        assert_eq!(ids(&rows), vec!["2"]);
    }

    #[test]
    fn test_schema_error_produces_no_side_effects() {
        let table = users_table();
        seed(&table, &[("1", "alice", "true")]);

        let bad_insert = parse("INSERT INTO users (id, missing) VALUES (9, 'x')").unwrap();
        assert_eq!(
            table.insert(&bad_insert),
            Err(SqlError::FieldNotFound("missing".into()))
        );
        assert_eq!(table.row_count(), 1);

        let bad_update = parse("UPDATE users SET missing = 'x' WHERE id = 1").unwrap();
        assert!(table.update(&bad_update).is_err());

        let bad_delete = parse("DELETE FROM users WHERE missing = 1").unwrap();
        assert!(table.delete(&bad_delete).is_err());
        assert_eq!(table.row_count(), 1);

        let rows = table.select(&parse("SELECT * FROM users").unwrap()).unwrap();
        assert_eq!(rows[0]["name"], "alice");
    }

    #[test]
    fn test_insert_arity_mismatch_appends_nothing() {
        let table = users_table();
        let q = parse("INSERT INTO users (id, name) VALUES (1, 'a'), (2, 'b', 'extra')").unwrap();
        assert_eq!(
            table.insert(&q),
            Err(SqlError::ArityMismatch {
                expected: 2,
                actual: 3
            })
        );
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_update_in_place() {
        let table = users_table();
        seed(&table, &[("1", "alice", "true"), ("2", "bob", "false")]);

        let touched = table
            .update(&parse("UPDATE users SET name = 'carol' WHERE id = 2").unwrap())
            .unwrap();
        assert_eq!(touched, 1);

        let rows = table
            .select(&parse("SELECT name FROM users WHERE id = 2").unwrap())
            .unwrap();
        assert_eq!(rows[0]["name"], "carol");
    }

    #[test]
    fn test_delete_scenario_id_below_two() {
        let table = users_table();
        seed(&table, &[("1", "a", "true"), ("2", "b", "true"), ("3", "c", "true")]);

        let deleted = table
            .delete(&parse("DELETE FROM users WHERE id < 2").unwrap())
            .unwrap();
        assert_eq!(deleted, 1);

        let rows = table.select(&parse("SELECT * FROM users").unwrap()).unwrap();
        assert_eq!(ids(&rows), vec!["2", "3"]);
    }

    #[test]
    fn test_delete_correctness_counts() {
        let table = users_table();
        for i in 0..50 {
            let active = if i % 3 == 0 { "true" } else { "false" };
            seed(&table, &[(&i.to_string(), "n", active)]);
        }
        let before = table.row_count();
        let matching = table
            .select(&parse("SELECT id FROM users WHERE active = true").unwrap())
            .unwrap()
            .len();

        let deleted = table
            .delete(&parse("DELETE FROM users WHERE active = true").unwrap())
            .unwrap();
        assert_eq!(deleted, matching);
        assert_eq!(table.row_count(), before - matching);

        // No survivor satisfies the predicate.
        let leftover = table
            .select(&parse("SELECT id FROM users WHERE active = true").unwrap())
            .unwrap();
        assert!(leftover.is_empty());
    }

    #[test]
    fn test_delete_preserves_non_matching_rows() {
        let table = users_table();
        seed(
            &table,
            &[("1", "keep", "false"), ("2", "kill", "true"), ("3", "keep", "false"),
              ("4", "kill", "true"), ("5", "kill", "true"), ("6", "keep", "false")],
        );

        table
            .delete(&parse("DELETE FROM users WHERE active = true").unwrap())
            .unwrap();

        let rows = table.select(&parse("SELECT id FROM users").unwrap()).unwrap();
        assert_eq!(ids(&rows), vec!["1", "3", "6"]);
    }

    #[test]
    fn test_delete_all_rows() {
        let table = users_table();
        seed(&table, &[("1", "a", "true"), ("2", "b", "true")]);

        let deleted = table.delete(&parse("DELETE FROM users").unwrap()).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let table = users_table();
        seed(&table, &[("1", "a", "true"), ("2", "b", "false"), ("3", "c", "true")]);

        let q = parse("DELETE FROM users WHERE active = true").unwrap();
        assert_eq!(table.delete(&q).unwrap(), 2);
        let after_first = ids(&table.select(&parse("SELECT id FROM users").unwrap()).unwrap());

        assert_eq!(table.delete(&q).unwrap(), 0);
        let after_second = ids(&table.select(&parse("SELECT id FROM users").unwrap()).unwrap());
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_delete_empty_table() {
        let table = users_table();
        assert_eq!(
            table.delete(&parse("DELETE FROM users WHERE id = 1").unwrap()).unwrap(),
            0
        );
    }

    #[test]
    fn test_type_mismatch_always_false() {
        let table = users_table();
        seed(&table, &[("1", "1", "true")]);

        // id is INT, name is TEXT: comparing the two fields is
        // unsatisfiable for every operator, even with equal cell text.
        for op in ["=", "!=", ">", "<", ">=", "<="] {
            let sql = format!("SELECT id FROM users WHERE id {op} name");
            let rows = table.select(&parse(&sql).unwrap()).unwrap();
            assert!(rows.is_empty(), "operator {op} matched across types");
        }
    }

    #[test]
    fn test_literal_only_condition_is_false() {
        let table = users_table();
        seed(&table, &[("1", "a", "true")]);

        let rows = table
            .select(&parse("SELECT id FROM users WHERE 1 = 1").unwrap())
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_datetime_conditions_always_false() {
        let table = users_table();
        table
            .insert(&parse("INSERT INTO users (id, born) VALUES (1, '2020-01-01')").unwrap())
            .unwrap();

        for op in ["=", "!=", ">", "<"] {
            let sql = format!("SELECT id FROM users WHERE born {op} '2020-01-01'");
            let rows = table.select(&parse(&sql).unwrap()).unwrap();
            assert!(rows.is_empty(), "DATETIME operator {op} matched");
        }
    }

    #[test]
    fn test_int_condition_with_unparseable_literal_is_false() {
        let table = users_table();
        seed(&table, &[("1", "a", "true")]);

        let rows = table
            .select(&parse("SELECT id FROM users WHERE id = 'nan'").unwrap())
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_bool_condition_non_true_text_is_false() {
        let table = users_table();
        // "yes" parses as false on the BOOL side.
        table
            .insert(&parse("INSERT INTO users (id, active) VALUES (1, 'yes')").unwrap())
            .unwrap();

        let rows = table
            .select(&parse("SELECT id FROM users WHERE active = false").unwrap())
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_int_comparison_operators() {
        let table = users_table();
        seed(&table, &[("1", "a", "true"), ("2", "b", "true"), ("3", "c", "true")]);

        let select = |sql: &str| ids(&table.select(&parse(sql).unwrap()).unwrap());
        assert_eq!(select("SELECT id FROM users WHERE id = 2"), vec!["2"]);
        assert_eq!(select("SELECT id FROM users WHERE id != 2"), vec!["1", "3"]);
        assert_eq!(select("SELECT id FROM users WHERE id > 2"), vec!["3"]);
        assert_eq!(select("SELECT id FROM users WHERE id < 2"), vec!["1"]);
        assert_eq!(select("SELECT id FROM users WHERE id >= 2"), vec!["2", "3"]);
        assert_eq!(select("SELECT id FROM users WHERE id <= 2"), vec!["1", "2"]);
    }

    #[test]
    fn test_create_index_validates_but_builds_nothing() {
        let table = users_table();
        seed(&table, &[("1", "a", "true")]);

        assert!(table
            .create_index(&parse("CREATE INDEX i ON users (id, name)").unwrap())
            .is_ok());
        assert_eq!(
            table.create_index(&parse("CREATE INDEX i ON users (missing)").unwrap()),
            Err(SqlError::FieldNotFound("missing".into()))
        );
        assert_eq!(table.row_count(), 1);
    }
}
