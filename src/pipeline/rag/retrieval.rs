use std::cmp::Ordering;

use super::types::{ScoredChunk, VectorSearch};
use super::RagError;
use crate::db::repository;
use crate::pipeline::storage::vectordb::SqliteVectorStore;

impl VectorSearch for SqliteVectorStore<'_> {
    /// Brute-force cosine ranking. Ties keep document order.
    fn search(
        &self,
        report_id: &str,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let stored = repository::load_report_chunks(self.connection(), report_id)?;

        let mut scored: Vec<ScoredChunk> = stored
            .into_iter()
            .map(|chunk| ScoredChunk {
                score: cosine_similarity(query_embedding, &chunk.embedding),
                chunk_index: chunk.chunk_index,
                content: chunk.content,
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Cosine similarity; 0 for empty, mismatched or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::{insert_report, now_timestamp};
    use crate::models::Report;
    use crate::pipeline::storage::types::{TextChunk, VectorStore};

    fn chunk(i: usize, content: &str) -> TextChunk {
        TextChunk {
            content: content.to_string(),
            chunk_index: i,
        }
    }

    fn seeded(conn: &rusqlite::Connection, embeddings: &[Vec<f32>]) -> String {
        let report = Report::new("r.pdf", now_timestamp());
        insert_report(conn, &report).unwrap();
        let chunks: Vec<TextChunk> = (0..embeddings.len())
            .map(|i| chunk(i, &format!("chunk {i}")))
            .collect();
        SqliteVectorStore::new(conn)
            .store_chunks(&report.id, &chunks, embeddings)
            .unwrap();
        report.id
    }

    #[test]
    fn ranks_by_similarity() {
        let conn = open_memory_database().unwrap();
        let report_id = seeded(
            &conn,
            &[vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]],
        );

        let hits = SqliteVectorStore::new(&conn)
            .search(&report_id, &[1.0, 0.0], 2)
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_index, 1);
        assert_eq!(hits[1].chunk_index, 2);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn ties_keep_chunk_order() {
        let conn = open_memory_database().unwrap();
        let report_id = seeded(&conn, &[vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]]);

        let hits = SqliteVectorStore::new(&conn)
            .search(&report_id, &[1.0, 0.0], 3)
            .unwrap();
        let order: Vec<usize> = hits.iter().map(|h| h.chunk_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn search_is_scoped_to_one_report() {
        let conn = open_memory_database().unwrap();
        let first = seeded(&conn, &[vec![1.0, 0.0]]);
        let second = seeded(&conn, &[vec![1.0, 0.0], vec![0.0, 1.0]]);
        let store = SqliteVectorStore::new(&conn);

        assert_eq!(store.search(&first, &[1.0, 0.0], 5).unwrap().len(), 1);
        assert_eq!(store.search(&second, &[1.0, 0.0], 5).unwrap().len(), 2);
        assert!(store.search("RPT-none", &[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn cosine_edge_cases() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
