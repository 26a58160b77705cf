//! Property and persistence tests for the vector index.

use docqa_rag::document::{Chunk, Metadata, SOURCE_KEY};
use docqa_rag::{IndexManifest, SourceStamp, VectorIndex};
use proptest::prelude::*;

const DIM: usize = 16;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

fn chunk(text: &str, source: &str, chunk_index: usize) -> Chunk {
    let mut metadata = Metadata::new();
    metadata.insert(SOURCE_KEY.to_string(), source.to_string());
    Chunk { text: text.to_string(), start_offset: 0, chunk_index, metadata }
}

/// Chunks paired with normalized embeddings.
fn arb_entries(dim: usize) -> impl Strategy<Value = Vec<(Chunk, Vec<f32>)>> {
    proptest::collection::vec(("[a-z ]{5,30}", arb_normalized_embedding(dim)), 1..20).prop_map(
        |pairs| {
            pairs
                .into_iter()
                .enumerate()
                .map(|(i, (text, embedding))| (chunk(&text, "docs/prop.txt", i), embedding))
                .collect()
        },
    )
}

fn index_from(entries: Vec<(Chunk, Vec<f32>)>) -> VectorIndex {
    let (chunks, embeddings): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
    VectorIndex::from_embeddings(DIM, chunks, embeddings).unwrap()
}

fn manifest() -> IndexManifest {
    IndexManifest {
        chunk_size: 1000,
        chunk_overlap: 200,
        embedding_model: "test-embedding".to_string(),
        document_count: 1,
        sources: vec![SourceStamp { name: "a.txt".to_string(), len: 12, modified_ms: 1_700_000_000_000 }],
    }
}

/// Query results are ordered by descending cosine similarity, hold at most
/// `k` entries, and hold every entry when `k` exceeds the index size.
mod prop_index_query_ordering {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_k(
            entries in arb_entries(DIM),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let count = entries.len();
            let index = index_from(entries);
            let results = index.query(&query, k).unwrap();

            prop_assert_eq!(results.len(), k.min(count));
            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}

#[test]
fn saved_index_answers_queries_identically() {
    let temp = tempfile::tempdir().unwrap();
    let index = index_from(vec![
        (chunk("alpha", "docs/a.txt", 0), unit(0)),
        (chunk("beta", "docs/a.txt", 1), unit(1)),
        (chunk("gamma", "docs/b.pdf", 0), mix(0, 2)),
    ]);

    let path = index.save(temp.path(), &manifest()).unwrap();
    assert!(path.ends_with("index.json"));
    assert!(VectorIndex::exists(temp.path()));

    let (loaded, loaded_manifest) = VectorIndex::load(temp.path()).unwrap();
    assert_eq!(loaded, index);
    assert_eq!(loaded_manifest, manifest());

    let query = mix(0, 1);
    assert_eq!(loaded.query(&query, 3).unwrap(), index.query(&query, 3).unwrap());
}

#[test]
fn saving_twice_replaces_the_previous_index() {
    let temp = tempfile::tempdir().unwrap();
    index_from(vec![(chunk("old", "docs/a.txt", 0), unit(0))]).save(temp.path(), &manifest()).unwrap();
    let replacement = index_from(vec![
        (chunk("new one", "docs/a.txt", 0), unit(1)),
        (chunk("new two", "docs/a.txt", 1), unit(2)),
    ]);
    replacement.save(temp.path(), &manifest()).unwrap();

    let (loaded, _) = VectorIndex::load(temp.path()).unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(loaded.chunks().all(|c| c.text.starts_with("new")));
    assert!(!temp.path().join("index.json.tmp").exists());
}

#[test]
fn empty_index_round_trips_and_returns_nothing() {
    let temp = tempfile::tempdir().unwrap();
    VectorIndex::new(DIM).save(temp.path(), &manifest()).unwrap();

    let (loaded, _) = VectorIndex::load(temp.path()).unwrap();
    assert!(loaded.is_empty());
    assert!(loaded.query(&unit(0), 3).unwrap().is_empty());
}

#[test]
fn ties_keep_insertion_order() {
    let index = index_from(vec![
        (chunk("first", "docs/a.txt", 0), unit(3)),
        (chunk("second", "docs/a.txt", 1), unit(3)),
        (chunk("third", "docs/a.txt", 2), unit(3)),
    ]);

    let ids: Vec<u64> = index.query(&unit(3), 3).unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn missing_index_fails_to_load() {
    let temp = tempfile::tempdir().unwrap();
    assert!(!VectorIndex::exists(temp.path()));
    assert!(VectorIndex::load(temp.path()).is_err());
}

fn unit(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[axis] = 1.0;
    v
}

fn mix(a: usize, b: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[a] = 0.6;
    v[b] = 0.8;
    v
}
