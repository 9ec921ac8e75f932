//! Row scanning: native cells to loosely-typed row mappings.

use crate::client::Cursor;
use crate::error::{OrmError, OrmResult};
use crate::value::{Cell, RowMap, Value};

/// Normalize one native cell.
///
/// Booleans pass through, byte buffers become text, every integer width
/// becomes a 64-bit integer, floats widen to `f64`, and anything else is kept
/// as the backend produced it.
pub fn normalize_cell(cell: Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Bool(v) => Value::Bool(v),
        Cell::I16(v) => Value::Int(i64::from(v)),
        Cell::I32(v) => Value::Int(i64::from(v)),
        Cell::I64(v) => Value::Int(v),
        Cell::F32(v) => Value::Float(f64::from(v)),
        Cell::F64(v) => Value::Float(v),
        Cell::Bytes(v) => Value::Text(String::from_utf8_lossy(&v).into_owned()),
        Cell::Text(v) => Value::Text(v),
        other => Value::Native(other),
    }
}

/// Read one row into a row mapping.
pub fn scan_row(columns: &[String], cells: Vec<Cell>) -> OrmResult<RowMap> {
    if cells.len() != columns.len() {
        return Err(OrmError::decode(
            columns.join(","),
            format!(
                "row has {} value(s) for {} column(s)",
                cells.len(),
                columns.len()
            ),
        ));
    }

    Ok(columns
        .iter()
        .cloned()
        .zip(cells.into_iter().map(normalize_cell))
        .collect())
}

/// Drain a cursor into row mappings, closing it on every exit path.
pub fn scan_all(mut cursor: Cursor) -> OrmResult<Vec<RowMap>> {
    let columns = cursor.columns().to_vec();
    let mut out = Vec::with_capacity(cursor.remaining());
    let result = loop {
        let Some(cells) = cursor.next_row() else {
            break Ok(());
        };
        match scan_row(&columns, cells) {
            Ok(row) => out.push(row),
            Err(e) => break Err(e),
        }
    };
    cursor.close();
    result.map(|()| out)
}
