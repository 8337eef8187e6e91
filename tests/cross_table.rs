//! Cross-table relationship behavior: 2-way symmetry, ternary combinations,
//! relation scans and counts.

mod common;

use common::{setup, timestamp, Author, Note, Tag};
use rowhaus::prelude::*;

fn note_tags(rowhaus: &RowHaus) -> CrossDao<Note, Tag> {
    CrossDao::new(rowhaus.pool().clone(), "note_tag", "note_id", "tag_id")
}

fn note_tag_authors(rowhaus: &RowHaus) -> CrossDao3<Note, Tag, Author> {
    CrossDao3::new(
        rowhaus.pool().clone(),
        "note_tag_author",
        "note_id",
        "tag_id",
        "author_id",
    )
}

async fn persisted_note(rowhaus: &RowHaus, body: &str) -> Note {
    let mut note = Note::new(body, 1, timestamp("2020-02-02T02:02:02"));
    rowhaus.dao::<Note>().insert(&mut note).await.unwrap();
    note
}

async fn persisted_tag(rowhaus: &RowHaus, label: &str) -> Tag {
    let mut tag = Tag::new(label);
    rowhaus.dao::<Tag>().insert(&mut tag).await.unwrap();
    tag
}

#[tokio::test]
async fn relation_is_symmetric_and_deletable() {
    let (rowhaus, _db) = setup().await;
    let relations = note_tags(&rowhaus);

    let note = persisted_note(&rowhaus, "tagged").await;
    let tag = persisted_tag(&rowhaus, "rust").await;

    relations.create_relation(&note, &tag).await.unwrap();

    let notes_of_tag = relations.load_a_from_b(&tag).await.unwrap();
    assert_eq!(notes_of_tag, vec![note.clone()]);

    let tags_of_note = relations.load_b_from_a(&note).await.unwrap();
    assert_eq!(tags_of_note, vec![tag.clone()]);

    relations.delete_relation(&note, &tag).await.unwrap();
    assert!(relations.load_a_from_b(&tag).await.unwrap().is_empty());
    assert!(relations.load_b_from_a(&note).await.unwrap().is_empty());
}

#[tokio::test]
async fn relation_scan_resolves_entities() {
    let (rowhaus, _db) = setup().await;
    let relations = note_tags(&rowhaus);

    let note = persisted_note(&rowhaus, "scanned").await;
    let tag_a = persisted_tag(&rowhaus, "a").await;
    let tag_b = persisted_tag(&rowhaus, "b").await;

    relations.create_relation(&note, &tag_a).await.unwrap();
    relations.create_relation(&note, &tag_b).await.unwrap();

    let all = relations.load_relations().await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|relation| relation.a == Some(note.clone())));
    let labels: Vec<_> = all
        .iter()
        .filter_map(|relation| relation.b.as_ref())
        .filter_map(|tag| tag.label.clone())
        .collect();
    assert!(labels.contains(&"a".to_string()));
    assert!(labels.contains(&"b".to_string()));

    assert_eq!(relations.count_relations(Query::new()).await.unwrap(), 2);
    let counted = relations
        .count_relations(
            Query::new()
                .filter("tag_id=?")
                .param(Parameter::of(tag_a.key().unwrap())),
        )
        .await
        .unwrap();
    assert_eq!(counted, 1);
}

#[tokio::test]
async fn relation_scan_prefers_loaded_set() {
    let (rowhaus, _db) = setup().await;
    let relations = note_tags(&rowhaus);

    let note = persisted_note(&rowhaus, "cached").await;
    let tag = persisted_tag(&rowhaus, "hot").await;
    relations.create_relation(&note, &tag).await.unwrap();

    // A divergent in-memory copy: resolution must come from the loaded set,
    // not from a fresh query.
    let mut cached_tag = tag.clone();
    cached_tag.label = Some("from-loaded-set".to_string());
    let loaded = LoadedSet::new().with(cached_tag.clone());

    let all = relations
        .load_relations_where(Query::new(), &loaded)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].b, Some(cached_tag));
}

#[tokio::test]
async fn detached_endpoint_refuses_join_load() {
    let (rowhaus, _db) = setup().await;
    let relations = note_tags(&rowhaus);

    let detached = Tag::new("unsaved");
    assert!(matches!(
        relations.load_a_from_b(&detached).await,
        Err(DaoError::IllegalState(_))
    ));
}

#[tokio::test]
async fn ternary_relation_pairwise_loads() {
    let (rowhaus, _db) = setup().await;
    let relations = note_tag_authors(&rowhaus);

    let note = persisted_note(&rowhaus, "ternary").await;
    let tag = persisted_tag(&rowhaus, "triple").await;
    let mut author = Author::new(true);
    rowhaus.dao::<Author>().insert(&mut author).await.unwrap();

    relations.create_relation(&note, &tag, &author).await.unwrap();

    let notes = relations.load_a_from_b_and_c(&tag, &author).await.unwrap();
    assert_eq!(notes, vec![note.clone()]);

    let tags = relations.load_b_from_a_and_c(&note, &author).await.unwrap();
    assert_eq!(tags, vec![tag.clone()]);

    let authors = relations.load_c_from_a_and_b(&note, &tag).await.unwrap();
    assert_eq!(authors, vec![author.clone()]);

    let all = relations.load_relations().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].a, Some(note.clone()));
    assert_eq!(all[0].b, Some(tag.clone()));
    assert_eq!(all[0].c, Some(author.clone()));

    assert_eq!(relations.count_relations(Query::new()).await.unwrap(), 1);

    relations.delete_relation(&note, &tag, &author).await.unwrap();
    assert!(relations
        .load_a_from_b_and_c(&tag, &author)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(relations.count_relations(Query::new()).await.unwrap(), 0);
}
