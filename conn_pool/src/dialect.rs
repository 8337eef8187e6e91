//! Database dialect detection
//!
//! The dialect is matched from the connection URL scheme and decides three
//! things only: whether a LIMIT fragment is emitted, whether placeholders are
//! numbered, and whether generated keys come back through a RETURNING clause.

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
    /// Unmatched product. Connections cannot be opened, and composed SQL
    /// omits the LIMIT fragment; limiting is then the caller's problem.
    Unknown,
}

impl Dialect {
    /// Match the dialect from a connection URL.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Self::PostgreSQL
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Self::MySQL
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Self::SQLite
        } else {
            Self::Unknown
        }
    }

    /// Get the display name for this dialect.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
            Self::Unknown => "unknown",
        }
    }

    /// Whether composed SQL may carry a `LIMIT n` fragment.
    pub fn supports_limit(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Whether placeholders are numbered (`$1`) instead of positional (`?`).
    pub fn numbered_placeholders(&self) -> bool {
        matches!(self, Self::PostgreSQL)
    }

    /// Whether generated keys are retrieved through a `RETURNING` clause
    /// instead of the statement's last-insert id.
    pub fn uses_returning(&self) -> bool {
        matches!(self, Self::PostgreSQL)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
