use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;

/// One indexed chunk of a report, as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunk {
    pub id: String,
    pub report_id: String,
    pub chunk_index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

pub fn insert_report_chunk(
    conn: &Connection,
    report_id: &str,
    chunk_index: usize,
    content: &str,
    embedding: &[f32],
) -> Result<String, DatabaseError> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO report_chunks (id, report_id, chunk_index, content, embedding, dimension)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            report_id,
            chunk_index as i64,
            content,
            encode_embedding(embedding),
            embedding.len() as i64,
        ],
    )?;
    Ok(id)
}

pub fn load_report_chunks(conn: &Connection, report_id: &str) -> Result<Vec<StoredChunk>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, report_id, chunk_index, content, embedding FROM report_chunks
         WHERE report_id = ?1 ORDER BY chunk_index",
    )?;
    let rows = stmt.query_map(params![report_id], |row| {
        Ok(StoredChunk {
            id: row.get(0)?,
            report_id: row.get(1)?,
            chunk_index: row.get::<_, i64>(2)? as usize,
            content: row.get(3)?,
            embedding: decode_embedding(&row.get::<_, Vec<u8>>(4)?),
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn delete_report_chunks(conn: &Connection, report_id: &str) -> Result<usize, DatabaseError> {
    Ok(conn.execute("DELETE FROM report_chunks WHERE report_id = ?1", params![report_id])?)
}

pub fn count_report_chunks(conn: &Connection, report_id: &str) -> Result<usize, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM report_chunks WHERE report_id = ?1",
        params![report_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Little-endian f32 packing.
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}
