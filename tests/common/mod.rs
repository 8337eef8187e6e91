//! Shared fixtures: a note/author/tag schema on a temp-file SQLite database.

#![allow(dead_code)]

use chrono::NaiveDateTime;
use rowhaus::prelude::*;
use tempfile::NamedTempFile;

pub const SCHEMA: &str = "
    CREATE TABLE authors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        active BOOLEAN
    );
    CREATE TABLE notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        body TEXT,
        rank INTEGER,
        written_at TIMESTAMP,
        author_id BIGINT
    );
    CREATE TABLE tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT
    );
    CREATE TABLE note_tag (
        note_id BIGINT,
        tag_id BIGINT
    );
    CREATE TABLE note_tag_author (
        note_id BIGINT,
        tag_id BIGINT,
        author_id BIGINT
    )
";

#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub primary: Primary<i64>,
    pub active: Option<bool>,
}

impl Author {
    pub fn new(active: bool) -> Self {
        Self {
            primary: Primary::absent(),
            active: Some(active),
        }
    }
}

impl Entity for Author {
    type Key = i64;

    fn primary(&self) -> &Primary<i64> {
        &self.primary
    }

    fn primary_mut(&mut self) -> &mut Primary<i64> {
        &mut self.primary
    }
}

#[async_trait::async_trait]
impl TableBinding for Author {
    fn table() -> &'static str {
        "authors"
    }

    fn primary_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str] {
        &["active"]
    }

    fn to_params(&self) -> ParameterList {
        ParameterList::new().with(Parameter::of(self.active))
    }

    async fn from_row(
        reader: &mut RowReader<'_>,
        _ctx: &LoadContext<'_>,
    ) -> Result<Self, DaoError> {
        let key = reader.next_primary::<i64>()?;
        Ok(Author {
            primary: key.map(Primary::from_key).unwrap_or_default(),
            active: reader.next_bool()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub primary: Primary<i64>,
    pub body: Option<String>,
    pub rank: Option<i32>,
    pub written_at: Option<NaiveDateTime>,
    pub author: Option<Author>,
}

impl Note {
    pub fn new(body: &str, rank: i32, written_at: NaiveDateTime) -> Self {
        Self {
            primary: Primary::absent(),
            body: Some(body.to_string()),
            rank: Some(rank),
            written_at: Some(written_at),
            author: None,
        }
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }
}

impl Entity for Note {
    type Key = i64;

    fn primary(&self) -> &Primary<i64> {
        &self.primary
    }

    fn primary_mut(&mut self) -> &mut Primary<i64> {
        &mut self.primary
    }
}

#[async_trait::async_trait]
impl TableBinding for Note {
    fn table() -> &'static str {
        "notes"
    }

    fn primary_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str] {
        &["body", "rank", "written_at", "author_id"]
    }

    fn to_params(&self) -> ParameterList {
        let author_ref = match &self.author {
            Some(author) => KeyRef::of(author),
            None => KeyRef::absent(),
        };
        ParameterList::new()
            .with(Parameter::of(self.body.clone()))
            .with(Parameter::of(self.rank))
            .with(Parameter::of(self.written_at))
            .with(Parameter::convertible(author_ref))
    }

    async fn from_row(reader: &mut RowReader<'_>, ctx: &LoadContext<'_>) -> Result<Self, DaoError> {
        let key = reader.next_primary::<i64>()?;
        let body = reader.next_text()?;
        let rank = reader.next_int()?;
        let written_at = reader.next_date_time()?;
        let author_key = reader.next_primary::<i64>()?;
        Ok(Note {
            primary: key.map(Primary::from_key).unwrap_or_default(),
            body,
            rank,
            written_at,
            author: ctx.resolve::<Author>(author_key).await?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub primary: Primary<i64>,
    pub label: Option<String>,
}

impl Tag {
    pub fn new(label: &str) -> Self {
        Self {
            primary: Primary::absent(),
            label: Some(label.to_string()),
        }
    }
}

impl Entity for Tag {
    type Key = i64;

    fn primary(&self) -> &Primary<i64> {
        &self.primary
    }

    fn primary_mut(&mut self) -> &mut Primary<i64> {
        &mut self.primary
    }
}

#[async_trait::async_trait]
impl TableBinding for Tag {
    fn table() -> &'static str {
        "tags"
    }

    fn primary_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str] {
        &["label"]
    }

    fn to_params(&self) -> ParameterList {
        ParameterList::new().with(Parameter::of(self.label.clone()))
    }

    async fn from_row(
        reader: &mut RowReader<'_>,
        _ctx: &LoadContext<'_>,
    ) -> Result<Self, DaoError> {
        let key = reader.next_primary::<i64>()?;
        Ok(Tag {
            primary: key.map(Primary::from_key).unwrap_or_default(),
            label: reader.next_text()?,
        })
    }
}

pub fn timestamp(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").unwrap()
}

/// A coordinator over a fresh temp-file SQLite database with the schema
/// applied. The temp file must stay alive as long as the coordinator.
pub async fn setup() -> (RowHaus, NamedTempFile) {
    setup_with_policy(PoolPolicy::CloseAlways).await
}

pub async fn setup_with_policy(policy: PoolPolicy) -> (RowHaus, NamedTempFile) {
    let file = NamedTempFile::new().unwrap();
    let url = format!("sqlite://{}", file.path().display());
    let config = DatabaseConfig::new(url, PoolSettings::default(), policy);
    let rowhaus = RowHaus::new(config).unwrap();
    rowhaus.run_script(SCHEMA).await.unwrap();
    (rowhaus, file)
}
