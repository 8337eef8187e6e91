//! Offset and keyset pagination, including cursor resumability.

mod common;

use common::{setup, timestamp, Note};
use rowhaus::prelude::*;
use std::collections::HashMap;

async fn seed_notes(rowhaus: &RowHaus, count: usize) -> Vec<Note> {
    let notes = rowhaus.dao::<Note>();
    let mut seeded = Vec::with_capacity(count);
    for rank in 0..count {
        let mut note = Note::new(
            &format!("note-{}", rank),
            rank as i32,
            timestamp("2021-01-01T00:00:00"),
        );
        notes.insert(&mut note).await.unwrap();
        seeded.push(note);
    }
    seeded
}

#[tokio::test]
async fn offset_pages_partition_the_table() {
    let (rowhaus, _db) = setup().await;
    let seeded = seed_notes(&rowhaus, 7).await;
    let notes = rowhaus.dao::<Note>();

    let first = notes.load_page(0, 3, Query::new()).await.unwrap();
    let second = notes.load_page(1, 3, Query::new()).await.unwrap();
    let third = notes.load_page(2, 3, Query::new()).await.unwrap();
    let fourth = notes.load_page(3, 3, Query::new()).await.unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    assert_eq!(third.len(), 1);
    assert!(fourth.is_empty());

    let mut collected: Vec<Note> = Vec::new();
    collected.extend(first);
    collected.extend(second);
    collected.extend(third);
    assert_eq!(collected, seeded);
}

#[tokio::test]
async fn keyset_pages_iterate_in_key_order() {
    let (rowhaus, _db) = setup().await;
    let seeded = seed_notes(&rowhaus, 5).await;
    let notes = rowhaus.dao::<Note>();

    let mut cursor = KeysetCursor::<i64>::start();
    let mut collected: Vec<Note> = Vec::new();
    loop {
        let page = notes
            .load_page_from_primary(cursor.last(), 2, Query::new())
            .await
            .unwrap();
        if page.is_empty() {
            break;
        }
        cursor.advance_past(&page);
        collected.extend(page);
    }
    assert_eq!(collected, seeded);
}

#[tokio::test]
async fn keyset_iteration_resumes_from_stored_cursor() {
    let (rowhaus, _db) = setup().await;
    let seeded = seed_notes(&rowhaus, 6).await;
    let notes = rowhaus.dao::<Note>();

    // first execution reads one page and persists its position
    let mut store: HashMap<String, serde_json::Value> = HashMap::new();
    let mut cursor = KeysetCursor::<i64>::start();
    let page = notes
        .load_page_from_primary(cursor.last(), 4, Query::new())
        .await
        .unwrap();
    assert_eq!(page.len(), 4);
    cursor.advance_past(&page);
    cursor.save(&mut store, "note_reader.last_primary");

    // a fresh execution restores the position and reads the remainder
    let cursor = KeysetCursor::<i64>::restore(&store, "note_reader.last_primary").unwrap();
    let rest = notes
        .load_page_from_primary(cursor.last(), 4, Query::new())
        .await
        .unwrap();
    assert_eq!(rest, seeded[4..].to_vec());
}

#[tokio::test]
async fn keyset_pages_respect_extra_filters() {
    let (rowhaus, _db) = setup().await;
    seed_notes(&rowhaus, 10).await;
    let notes = rowhaus.dao::<Note>();

    let filtered = Query::new().filter("rank>=?").param(Parameter::of(5i32));
    let page = notes
        .load_page_from_primary(None, 3, filtered.clone())
        .await
        .unwrap();
    assert_eq!(page.len(), 3);
    assert!(page.iter().all(|note| note.rank.unwrap() >= 5));

    let last = page.last().and_then(|note| note.key());
    let next = notes.load_page_from_primary(last, 3, filtered).await.unwrap();
    assert_eq!(next.len(), 2);
    assert!(next.iter().all(|note| note.rank.unwrap() >= 5));
}

#[tokio::test]
async fn write_saves_mixed_batch() {
    let (rowhaus, _db) = setup().await;
    let notes = rowhaus.dao::<Note>();

    let mut existing = Note::new("old", 0, timestamp("2021-01-01T00:00:00"));
    notes.insert(&mut existing).await.unwrap();
    existing.body = Some("rewritten".to_string());

    let fresh = Note::new("new", 1, timestamp("2021-01-02T00:00:00"));
    let mut batch = vec![existing.clone(), fresh];

    notes.write(&mut batch).await.unwrap();
    assert!(batch.iter().all(|note| note.key().is_some()));
    assert_eq!(notes.count().await.unwrap(), 2);

    let reloaded = notes.load(existing.key().unwrap()).await.unwrap();
    assert_eq!(reloaded.body.as_deref(), Some("rewritten"));
}
