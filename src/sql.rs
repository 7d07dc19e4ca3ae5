use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlparser::ast::{self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertRoom {
        id: Ulid,
        hotel_id: Ulid,
        name: String,
        base_rate: Decimal,
        capacity: u32,
    },
    UpdateRoom {
        id: Ulid,
        base_rate: Option<Decimal>,
        capacity: Option<u32>,
        open: Option<bool>,
    },
    InsertBooking {
        id: Ulid,
        room_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    CancelBooking {
        id: Ulid,
        reason: Option<String>,
    },
    ConfirmBooking {
        id: Ulid,
    },
    CompleteBooking {
        id: Ulid,
    },
    RescheduleBooking {
        id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    InsertBlock {
        id: Ulid,
        room_id: Ulid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: BlockReason,
        note: Option<String>,
    },
    DeleteBlock {
        id: Ulid,
    },
    InsertSeason {
        id: Ulid,
        room_id: Ulid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        rate: Decimal,
        label: Option<String>,
    },
    DeleteSeason {
        id: Ulid,
    },
    SelectRooms {
        id: Option<Ulid>,
    },
    SelectBookings {
        id: Option<Ulid>,
        room_id: Option<Ulid>,
        guest_id: Option<Ulid>,
    },
    SelectBlocks {
        room_id: Ulid,
    },
    SelectSeasons {
        room_id: Ulid,
    },
    SelectCalendar {
        room_id: Ulid,
        year: i32,
        month: u32,
    },
    SelectAvailability {
        room_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    SelectQuote {
        room_id: Ulid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(table, assignments, selection),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let values = extract_insert_values(insert)?;

    match table.as_str() {
        // (id, hotel_id, name, base_rate [, capacity]); owner is the session user
        "rooms" => {
            if values.len() < 4 {
                return Err(SqlError::WrongArity("rooms", 4, values.len()));
            }
            let capacity = if values.len() >= 5 {
                parse_u32(&values[4])?
            } else {
                1
            };
            Ok(Command::InsertRoom {
                id: parse_ulid_expr(&values[0])?,
                hotel_id: parse_ulid_expr(&values[1])?,
                name: parse_string_expr(&values[2])?,
                base_rate: parse_decimal_expr(&values[3])?,
                capacity,
            })
        }
        // (id, room_id, check_in, check_out); guest is the session user
        "bookings" => {
            if values.len() < 4 {
                return Err(SqlError::WrongArity("bookings", 4, values.len()));
            }
            Ok(Command::InsertBooking {
                id: parse_ulid_expr(&values[0])?,
                room_id: parse_ulid_expr(&values[1])?,
                check_in: parse_date_expr(&values[2])?,
                check_out: parse_date_expr(&values[3])?,
            })
        }
        "blocks" => {
            if values.len() < 5 {
                return Err(SqlError::WrongArity("blocks", 5, values.len()));
            }
            let note = if values.len() >= 6 {
                parse_string_or_null(&values[5])?
            } else {
                None
            };
            Ok(Command::InsertBlock {
                id: parse_ulid_expr(&values[0])?,
                room_id: parse_ulid_expr(&values[1])?,
                start_date: parse_date_expr(&values[2])?,
                end_date: parse_date_expr(&values[3])?,
                reason: parse_block_reason_expr(&values[4])?,
                note,
            })
        }
        "seasons" => {
            if values.len() < 5 {
                return Err(SqlError::WrongArity("seasons", 5, values.len()));
            }
            let label = if values.len() >= 6 {
                parse_string_or_null(&values[5])?
            } else {
                None
            };
            Ok(Command::InsertSeason {
                id: parse_ulid_expr(&values[0])?,
                room_id: parse_ulid_expr(&values[1])?,
                start_date: parse_date_expr(&values[2])?,
                end_date: parse_date_expr(&values[3])?,
                rate: parse_decimal_expr(&values[4])?,
                label,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_update(
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let table = table_factor_name(&table.relation)?;
    let id = extract_where_id(selection)?;

    match table.as_str() {
        "rooms" => {
            let (mut base_rate, mut capacity, mut open) = (None, None, None);
            for a in assignments {
                let col = assignment_column(a)?;
                match col.as_str() {
                    "base_rate" => base_rate = Some(parse_decimal_expr(&a.value)?),
                    "capacity" => capacity = Some(parse_u32(&a.value)?),
                    "open" => open = Some(parse_bool(&a.value)?),
                    _ => return Err(SqlError::UnknownColumn(col)),
                }
            }
            if base_rate.is_none() && capacity.is_none() && open.is_none() {
                return Err(SqlError::Parse("UPDATE rooms with nothing to set".into()));
            }
            Ok(Command::UpdateRoom { id, base_rate, capacity, open })
        }
        "bookings" => {
            let (mut status, mut reason, mut check_in, mut check_out) = (None, None, None, None);
            for a in assignments {
                let col = assignment_column(a)?;
                match col.as_str() {
                    "status" => status = Some(parse_string_expr(&a.value)?),
                    "cancellation_reason" => reason = parse_string_or_null(&a.value)?,
                    "check_in" => check_in = Some(parse_date_expr(&a.value)?),
                    "check_out" => check_out = Some(parse_date_expr(&a.value)?),
                    _ => return Err(SqlError::UnknownColumn(col)),
                }
            }

            if check_in.is_some() || check_out.is_some() {
                if status.is_some() || reason.is_some() {
                    return Err(SqlError::Unsupported(
                        "mixing status and date changes in one UPDATE".into(),
                    ));
                }
                let (Some(check_in), Some(check_out)) = (check_in, check_out) else {
                    return Err(SqlError::Parse(
                        "reschedule requires both check_in and check_out".into(),
                    ));
                };
                return Ok(Command::RescheduleBooking { id, check_in, check_out });
            }

            let Some(status) = status else {
                return Err(SqlError::Parse("UPDATE bookings with nothing to set".into()));
            };
            let parsed = BookingStatus::parse(&status)
                .ok_or_else(|| SqlError::Parse(format!("bad status: {status}")))?;
            match parsed {
                BookingStatus::Cancelled => Ok(Command::CancelBooking { id, reason }),
                _ if reason.is_some() => Err(SqlError::Unsupported(
                    "cancellation_reason only applies to CANCELLED".into(),
                )),
                BookingStatus::Confirmed => Ok(Command::ConfirmBooking { id }),
                BookingStatus::Completed => Ok(Command::CompleteBooking { id }),
                BookingStatus::Pending => Err(SqlError::Unsupported(
                    "cannot set status back to PENDING".into(),
                )),
            }
        }
        "blocks" | "seasons" => Err(SqlError::Unsupported(format!(
            "UPDATE {table}; remove and re-add instead"
        ))),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;

    match table.as_str() {
        "blocks" => Ok(Command::DeleteBlock {
            id: extract_where_id(&delete.selection)?,
        }),
        "seasons" => Ok(Command::DeleteSeason {
            id: extract_where_id(&delete.selection)?,
        }),
        // Bookings are never removed; history stays queryable
        "bookings" => Err(SqlError::Unsupported(
            "DELETE FROM bookings; cancel with UPDATE bookings SET status = 'CANCELLED'".into(),
        )),
        "rooms" => Err(SqlError::Unsupported(
            "DELETE FROM rooms; close with UPDATE rooms SET open = false".into(),
        )),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    let mut filters = Filters::default();
    if let Some(selection) = &select.selection {
        collect_filters(selection, &mut filters)?;
    }

    match table.as_str() {
        "rooms" => Ok(Command::SelectRooms { id: filters.id }),
        "bookings" => {
            if filters.id.is_none() && filters.room_id.is_none() && filters.guest_id.is_none() {
                return Err(SqlError::MissingFilter("id, room_id, or guest_id"));
            }
            Ok(Command::SelectBookings {
                id: filters.id,
                room_id: filters.room_id,
                guest_id: filters.guest_id,
            })
        }
        "blocks" => Ok(Command::SelectBlocks {
            room_id: filters.room_id.ok_or(SqlError::MissingFilter("room_id"))?,
        }),
        "seasons" => Ok(Command::SelectSeasons {
            room_id: filters.room_id.ok_or(SqlError::MissingFilter("room_id"))?,
        }),
        "calendar" => {
            let (year, month) = filters.month.ok_or(SqlError::MissingFilter("month"))?;
            Ok(Command::SelectCalendar {
                room_id: filters.room_id.ok_or(SqlError::MissingFilter("room_id"))?,
                year,
                month,
            })
        }
        "availability" => Ok(Command::SelectAvailability {
            room_id: filters.room_id.ok_or(SqlError::MissingFilter("room_id"))?,
            check_in: filters.check_in.ok_or(SqlError::MissingFilter("check_in"))?,
            check_out: filters.check_out.ok_or(SqlError::MissingFilter("check_out"))?,
        }),
        "quote" => Ok(Command::SelectQuote {
            room_id: filters.room_id.ok_or(SqlError::MissingFilter("room_id"))?,
            check_in: filters.check_in.ok_or(SqlError::MissingFilter("check_in"))?,
            check_out: filters.check_out.ok_or(SqlError::MissingFilter("check_out"))?,
        }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// WHERE-clause equality filters. Unrecognized columns are ignored, missing
/// required ones are caught per table in `parse_select`.
#[derive(Default)]
struct Filters {
    id: Option<Ulid>,
    room_id: Option<Ulid>,
    guest_id: Option<Ulid>,
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
    month: Option<(i32, u32)>,
}

fn collect_filters(expr: &Expr, filters: &mut Filters) -> Result<(), SqlError> {
    if let Expr::BinaryOp { left, op, right } = expr {
        match op {
            ast::BinaryOperator::And => {
                collect_filters(left, filters)?;
                collect_filters(right, filters)?;
            }
            ast::BinaryOperator::Eq => match expr_column_name(left).as_deref() {
                Some("id") => filters.id = Some(parse_ulid_expr(right)?),
                Some("room_id") => filters.room_id = Some(parse_ulid_expr(right)?),
                Some("guest_id") => filters.guest_id = Some(parse_ulid_expr(right)?),
                Some("check_in") => filters.check_in = Some(parse_date_expr(right)?),
                Some("check_out") => filters.check_out = Some(parse_date_expr(right)?),
                Some("month") => filters.month = Some(parse_month_expr(right)?),
                _ => {}
            },
            _ => {}
        }
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn assignment_column(a: &ast::Assignment) -> Result<String, SqlError> {
    match &a.target {
        ast::AssignmentTarget::ColumnName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty column name".into()))
        }
        _ => Err(SqlError::Parse("unsupported assignment target".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.as_slice() {
            [] => Err(SqlError::Parse("empty VALUES".into())),
            [row] => Ok(row.clone()),
            _ => Err(SqlError::Unsupported("multi-row INSERT".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>) -> Result<Ulid, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => {
            if expr_column_name(left).as_deref() == Some("id") {
                parse_ulid_expr(right)
            } else {
                Err(SqlError::MissingFilter("id"))
            }
        }
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_ulid_expr(expr: &Expr) -> Result<Ulid, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) | Value::Number(s, _) => {
                Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID: {e}")))
            }
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_date_expr(expr: &Expr) -> Result<NaiveDate, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| SqlError::BadDate(s.clone()))
        }
        Some(value) => Err(SqlError::Parse(format!("expected date string, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

fn parse_month_expr(expr: &Expr) -> Result<(i32, u32), SqlError> {
    let Some(Value::SingleQuotedString(s)) = extract_value(expr) else {
        return Err(SqlError::Parse(format!("expected 'YYYY-MM' string, got {expr:?}")));
    };
    s.split_once('-')
        .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)))
        .filter(|(_, m)| (1..=12).contains(m))
        .ok_or_else(|| SqlError::BadDate(s.clone()))
}

fn parse_decimal_expr(expr: &Expr) -> Result<Decimal, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) | Value::SingleQuotedString(s) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad numeric: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_decimal_expr(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_i64_expr(expr: &Expr) -> Result<i64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad i64: {e}"))),
            Value::SingleQuotedString(s) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad i64: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_i64_expr(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_u32(expr: &Expr) -> Result<u32, SqlError> {
    let v = parse_i64_expr(expr)?;
    u32::try_from(v).map_err(|_| SqlError::Parse(format!("{v} out of u32 range")))
}

fn parse_bool(expr: &Expr) -> Result<bool, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::SingleQuotedString(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "1" => Ok(true),
                "false" | "f" | "0" => Ok(false),
                _ => Err(SqlError::Parse(format!("bad bool: {s}"))),
            },
            Value::Number(n, _) => Ok(n != "0"),
            _ => Err(SqlError::Parse(format!("expected bool, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_string_expr(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => Ok(s.clone()),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr:?}"))),
    }
}

fn parse_string_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        _ => Ok(Some(parse_string_expr(expr)?)),
    }
}

fn parse_block_reason_expr(expr: &Expr) -> Result<BlockReason, SqlError> {
    let s = parse_string_expr(expr)?;
    BlockReason::parse(&s).ok_or_else(|| SqlError::Parse(format!("bad block reason: {s}")))
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
    BadDate(String),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(c) => write!(f, "unknown column: {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::BadDate(s) => write!(f, "bad date: {s}"),
        }
    }
}

impl std::error::Error for SqlError {}
