//! Sheet repository: the `sheets` / `sheet_rows` tables behind [`Workbook`].
//!
//! Each data row is stored as a JSON array of cell strings keyed by its
//! 1-based sheet row number. Every write runs in its own IMMEDIATE
//! transaction and is committed before the call returns. `table_leases`
//! holds the named leases that keep writers in different processes out of
//! each other's critical sections.

use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{Database, DatabaseError};
use crate::workbook::{check_cell, SheetSnapshot, Workbook, WorkbookError, MAX_ROWS};

fn encode(sheet: &str, row: usize, cells: &[String]) -> Result<String, DatabaseError> {
    serde_json::to_string(cells).map_err(|e| DatabaseError::InvalidCells {
        sheet: sheet.to_string(),
        row,
        reason: e.to_string(),
    })
}

fn decode(sheet: &str, row: usize, raw: &str) -> Result<Vec<String>, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::InvalidCells {
        sheet: sheet.to_string(),
        row,
        reason: e.to_string(),
    })
}

fn load_headers(conn: &Connection, sheet: &str) -> Result<Option<Vec<String>>, DatabaseError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT headers FROM sheets WHERE name = ?1",
            params![sheet],
            |r| r.get(0),
        )
        .optional()?;
    raw.map(|raw| decode(sheet, 1, &raw)).transpose()
}

fn load_snapshot(conn: &Connection, sheet: &str) -> Result<Option<SheetSnapshot>, DatabaseError> {
    let Some(headers) = load_headers(conn, sheet)? else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT row_number, cells FROM sheet_rows WHERE sheet = ?1 ORDER BY row_number",
    )?;
    let stored = stmt
        .query_map(params![sheet], |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(stored.len());
    for (number, raw) in stored {
        let number = usize::try_from(number)
            .ok()
            .filter(|n| *n <= MAX_ROWS)
            .ok_or_else(|| DatabaseError::InvalidCells {
                sheet: sheet.to_string(),
                row: 0,
                reason: format!("row number {} is outside the sheet", number),
            })?;
        let index = number.saturating_sub(2);
        // Rows never written read back as empty.
        if rows.len() < index {
            rows.resize(index, Vec::new());
        }
        rows.push(decode(sheet, number, &raw)?);
    }

    Ok(Some(SheetSnapshot::new(sheet, headers, rows)))
}

fn upsert_row(
    conn: &Connection,
    sheet: &str,
    row: usize,
    cells: &[String],
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sheet_rows (sheet, row_number, cells, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(sheet, row_number) DO UPDATE SET
            cells = excluded.cells, updated_at = excluded.updated_at",
        params![sheet, row as i64, encode(sheet, row, cells)?],
    )?;
    Ok(())
}

/// Stored cells of one row: the header row for row 1, an empty row when
/// nothing was written there yet. `None` when the sheet does not exist.
fn load_row(conn: &Connection, sheet: &str, row: usize) -> Result<Option<Vec<String>>, DatabaseError> {
    let Some(headers) = load_headers(conn, sheet)? else {
        return Ok(None);
    };
    if row == 1 {
        return Ok(Some(headers));
    }
    let raw: Option<String> = conn
        .query_row(
            "SELECT cells FROM sheet_rows WHERE sheet = ?1 AND row_number = ?2",
            params![sheet, row as i64],
            |r| r.get(0),
        )
        .optional()?;
    raw.map(|raw| decode(sheet, row, &raw))
        .transpose()
        .map(|cells| Some(cells.unwrap_or_default()))
}

fn store_row(conn: &Connection, sheet: &str, row: usize, cells: &[String]) -> Result<(), DatabaseError> {
    if row == 1 {
        conn.execute(
            "UPDATE sheets SET headers = ?2, updated_at = datetime('now') WHERE name = ?1",
            params![sheet, encode(sheet, 1, cells)?],
        )?;
        return Ok(());
    }
    upsert_row(conn, sheet, row, cells)?;
    touch(conn, sheet)
}

fn put(cells: &mut Vec<String>, column: usize, value: &str) {
    if cells.len() < column {
        cells.resize(column, String::new());
    }
    cells[column - 1] = value.to_string();
}

fn touch(conn: &Connection, sheet: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE sheets SET updated_at = datetime('now') WHERE name = ?1",
        params![sheet],
    )?;
    Ok(())
}

/// Reads a whole sheet.
pub fn load(db: &Database, sheet: &str) -> Result<Option<SheetSnapshot>, DatabaseError> {
    db.with_conn(|conn| load_snapshot(conn, sheet))
}

/// Creates a sheet unless one with that name exists. Returns whether it was created.
pub fn create(db: &Database, sheet: &str, headers: &[String]) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO sheets (name, headers) VALUES (?1, ?2)",
            params![sheet, encode(sheet, 1, headers)?],
        )?;
        Ok(changed == 1)
    })
}

/// Appends after the last non-blank row. `None` when the sheet does not exist.
pub fn append(
    db: &Database,
    sheet: &str,
    cells: &[String],
) -> Result<Option<usize>, DatabaseError> {
    db.write(|tx| {
        let Some(snapshot) = load_snapshot(tx, sheet)? else {
            return Ok(None);
        };
        let row = snapshot.last_row().max(1) + 1;
        if row > MAX_ROWS {
            return Err(DatabaseError::InvalidCells {
                sheet: sheet.to_string(),
                row,
                reason: "sheet is full".to_string(),
            });
        }
        upsert_row(tx, sheet, row, cells)?;
        touch(tx, sheet)?;
        Ok(Some(row))
    })
}

/// Writes one cell. Returns `false` when the sheet does not exist.
pub fn write_cell(
    db: &Database,
    sheet: &str,
    row: usize,
    column: usize,
    value: &str,
) -> Result<bool, DatabaseError> {
    db.write(|tx| {
        let Some(mut cells) = load_row(tx, sheet, row)? else {
            return Ok(false);
        };
        put(&mut cells, column, value);
        store_row(tx, sheet, row, &cells)?;
        Ok(true)
    })
}

/// Writes one cell when `expected` accepts its current text. `None` when the
/// sheet does not exist, otherwise whether the write happened.
pub fn write_cell_if(
    db: &Database,
    sheet: &str,
    row: usize,
    column: usize,
    value: &str,
    expected: &dyn Fn(&str) -> bool,
) -> Result<Option<bool>, DatabaseError> {
    db.write(|tx| {
        let Some(mut cells) = load_row(tx, sheet, row)? else {
            return Ok(None);
        };
        if !expected(cells.get(column - 1).map(String::as_str).unwrap_or("")) {
            return Ok(Some(false));
        }
        put(&mut cells, column, value);
        store_row(tx, sheet, row, &cells)?;
        Ok(Some(true))
    })
}

/// Overwrites a sheet's headers and rows, creating it if needed.
pub fn replace(
    db: &Database,
    sheet: &str,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<(), DatabaseError> {
    db.write(|tx| {
        tx.execute(
            "INSERT INTO sheets (name, headers) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET
                headers = excluded.headers, updated_at = datetime('now')",
            params![sheet, encode(sheet, 1, headers)?],
        )?;
        tx.execute("DELETE FROM sheet_rows WHERE sheet = ?1", params![sheet])?;
        for (i, cells) in rows.iter().enumerate() {
            upsert_row(tx, sheet, i + 2, cells)?;
        }
        Ok(())
    })
}

/// Takes lease `name` for `holder` when it is free, expired, or already
/// `holder`'s. Returns whether `holder` owns it afterwards.
pub fn take_lease(
    db: &Database,
    name: &str,
    holder: &str,
    ttl: Duration,
) -> Result<bool, DatabaseError> {
    let now = Utc::now().timestamp_millis();
    let expires_at = now.saturating_add(ttl.as_millis().min(i64::MAX as u128) as i64);
    db.write(|tx| {
        let changed = tx.execute(
            "INSERT INTO table_leases (name, holder, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET
                holder = excluded.holder, expires_at = excluded.expires_at
             WHERE table_leases.expires_at <= ?4 OR table_leases.holder = excluded.holder",
            params![name, holder, expires_at, now],
        )?;
        Ok(changed == 1)
    })
}

/// Drops lease `name` if `holder` still owns it.
pub fn drop_lease(db: &Database, name: &str, holder: &str) -> Result<(), DatabaseError> {
    db.write(|tx| {
        tx.execute(
            "DELETE FROM table_leases WHERE name = ?1 AND holder = ?2",
            params![name, holder],
        )?;
        Ok(())
    })
}

/// Names of all stored sheets, sorted.
pub fn sheet_names(db: &Database) -> Result<Vec<String>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sheets ORDER BY name")?;
        let names = stmt
            .query_map([], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    })
}

impl Workbook for Database {
    fn snapshot(&self, sheet: &str) -> Result<Option<SheetSnapshot>, WorkbookError> {
        Ok(load(self, sheet)?)
    }

    fn create_sheet(&self, sheet: &str, headers: &[String]) -> Result<bool, WorkbookError> {
        Ok(create(self, sheet, headers)?)
    }

    fn append_row(&self, sheet: &str, cells: Vec<String>) -> Result<usize, WorkbookError> {
        check_cell(sheet, 2, cells.len().max(1))?;
        let row = append(self, sheet, &cells)?
            .ok_or_else(|| WorkbookError::SheetNotFound(sheet.to_string()))?;
        Ok(row)
    }

    fn set_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<(), WorkbookError> {
        check_cell(sheet, row, column)?;
        if write_cell(self, sheet, row, column, value)? {
            Ok(())
        } else {
            Err(WorkbookError::SheetNotFound(sheet.to_string()))
        }
    }

    fn set_cell_if(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
        expected: &dyn Fn(&str) -> bool,
    ) -> Result<bool, WorkbookError> {
        check_cell(sheet, row, column)?;
        write_cell_if(self, sheet, row, column, value, expected)?
            .ok_or_else(|| WorkbookError::SheetNotFound(sheet.to_string()))
    }

    fn replace_rows(
        &self,
        sheet: &str,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<(), WorkbookError> {
        if rows.len() + 1 > MAX_ROWS {
            return Err(WorkbookError::InvalidCell {
                sheet: sheet.to_string(),
                row: rows.len() + 1,
                column: 1,
            });
        }
        Ok(replace(self, sheet, &headers, &rows)?)
    }

    fn try_lease(&self, name: &str, holder: &str, ttl: Duration) -> Result<bool, WorkbookError> {
        Ok(take_lease(self, name, holder, ttl)?)
    }

    fn release_lease(&self, name: &str, holder: &str) -> Result<(), WorkbookError> {
        Ok(drop_lease(self, name, holder)?)
    }
}
