use rusqlite::Connection;

use super::types::{TextChunk, VectorStore};
use super::StorageError;
use crate::db::repository;

/// Report chunk index kept in the `report_chunks` table.
///
/// Callers that need atomicity pass a connection inside an open transaction.
pub struct SqliteVectorStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteVectorStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'a Connection {
        self.conn
    }

    pub fn count_for_report(&self, report_id: &str) -> Result<usize, StorageError> {
        Ok(repository::count_report_chunks(self.conn, report_id)?)
    }
}

impl VectorStore for SqliteVectorStore<'_> {
    /// Replaces any existing index for the report.
    fn store_chunks(
        &self,
        report_id: &str,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, StorageError> {
        if chunks.len() != embeddings.len() {
            return Err(StorageError::VectorDb(format!(
                "Chunk count ({}) does not match embedding count ({})",
                chunks.len(),
                embeddings.len()
            )));
        }
        if let Some(first) = embeddings.first() {
            if embeddings.iter().any(|e| e.len() != first.len()) {
                return Err(StorageError::VectorDb(
                    "Embeddings have mixed dimensions".into(),
                ));
            }
        }

        repository::delete_report_chunks(self.conn, report_id)?;
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            repository::insert_report_chunk(
                self.conn,
                report_id,
                chunk.chunk_index,
                &chunk.content,
                embedding,
            )?;
        }
        Ok(chunks.len())
    }

    fn delete_by_report(&self, report_id: &str) -> Result<usize, StorageError> {
        Ok(repository::delete_report_chunks(self.conn, report_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::{insert_report, load_report_chunks, now_timestamp};
    use crate::models::Report;

    fn make_chunks(n: usize) -> Vec<TextChunk> {
        (0..n)
            .map(|i| TextChunk {
                content: format!("Chunk {i} content"),
                chunk_index: i,
            })
            .collect()
    }

    fn make_embeddings(n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n).map(|i| vec![(i + 1) as f32 / n as f32; dim]).collect()
    }

    fn seeded_report(conn: &Connection) -> String {
        let report = Report::new("scan.pdf", now_timestamp());
        insert_report(conn, &report).unwrap();
        report.id
    }

    #[test]
    fn store_and_count() {
        let conn = open_memory_database().unwrap();
        let report_id = seeded_report(&conn);
        let store = SqliteVectorStore::new(&conn);

        let stored = store
            .store_chunks(&report_id, &make_chunks(5), &make_embeddings(5, 8))
            .unwrap();
        assert_eq!(stored, 5);
        assert_eq!(store.count_for_report(&report_id).unwrap(), 5);

        let loaded = load_report_chunks(&conn, &report_id).unwrap();
        assert_eq!(loaded[4].content, "Chunk 4 content");
        assert_eq!(loaded[4].embedding.len(), 8);
    }

    #[test]
    fn restore_replaces_previous_index() {
        let conn = open_memory_database().unwrap();
        let report_id = seeded_report(&conn);
        let store = SqliteVectorStore::new(&conn);

        store
            .store_chunks(&report_id, &make_chunks(5), &make_embeddings(5, 8))
            .unwrap();
        store
            .store_chunks(&report_id, &make_chunks(2), &make_embeddings(2, 8))
            .unwrap();
        assert_eq!(store.count_for_report(&report_id).unwrap(), 2);
    }

    #[test]
    fn delete_removes_only_matching_report() {
        let conn = open_memory_database().unwrap();
        let first = seeded_report(&conn);
        let second = seeded_report(&conn);
        let store = SqliteVectorStore::new(&conn);

        store
            .store_chunks(&first, &make_chunks(3), &make_embeddings(3, 8))
            .unwrap();
        store
            .store_chunks(&second, &make_chunks(2), &make_embeddings(2, 8))
            .unwrap();

        assert_eq!(store.delete_by_report(&first).unwrap(), 3);
        assert_eq!(store.count_for_report(&first).unwrap(), 0);
        assert_eq!(store.count_for_report(&second).unwrap(), 2);
    }

    #[test]
    fn mismatched_chunks_and_embeddings_errors() {
        let conn = open_memory_database().unwrap();
        let report_id = seeded_report(&conn);
        let store = SqliteVectorStore::new(&conn);

        let result = store.store_chunks(&report_id, &make_chunks(3), &make_embeddings(2, 8));
        assert!(matches!(result, Err(StorageError::VectorDb(_))));
    }

    #[test]
    fn unknown_report_is_rejected_by_foreign_key() {
        let conn = open_memory_database().unwrap();
        let store = SqliteVectorStore::new(&conn);
        let result = store.store_chunks("RPT-missing", &make_chunks(1), &make_embeddings(1, 8));
        assert!(matches!(result, Err(StorageError::Database(_))));
    }
}
