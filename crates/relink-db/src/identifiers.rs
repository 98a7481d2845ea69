//! Identifier validation for table and column names spliced into SQL.
//!
//! Content columns and container tables are only known at runtime, so they
//! cannot be bound as parameters. Every such name goes through
//! [`validate_identifier`] before being quoted.

use relink_core::{Error, Result};

/// PostgreSQL identifier length limit.
pub const MAX_IDENTIFIER_LEN: usize = 63;

const RESERVED_NAMES: &[&str] = &[
    "pg_catalog",
    "information_schema",
    "pg_toast",
    "select",
    "insert",
    "update",
    "delete",
    "drop",
    "create",
    "alter",
    "grant",
    "revoke",
    "truncate",
];

/// Validate a table or column name.
///
/// Names must be non-empty, at most 63 characters, start with a letter or
/// underscore and contain only ASCII letters, digits and underscores.
///
/// ```
/// use relink_db::validate_identifier;
///
/// assert!(validate_identifier("field_cta_ab12cd34").is_ok());
/// assert!(validate_identifier("matrixcontent_blocks").is_ok());
/// assert!(validate_identifier("1field").is_err());
/// assert!(validate_identifier("field\"; drop").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput("Identifier cannot be empty".to_string()));
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::InvalidInput(format!(
            "Identifier exceeds 63 character limit: {} characters",
            name.len()
        )));
    }

    if let Some(first) = name.chars().next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::InvalidInput(format!(
                "Identifier must start with a letter or underscore, found: '{}'",
                first
            )));
        }
    }

    if let Some(ch) = name.chars().find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
        return Err(Error::InvalidInput(format!(
            "Identifier \"{}\" contains invalid character: '{}'",
            name, ch
        )));
    }

    if RESERVED_NAMES.contains(&name.to_lowercase().as_str()) {
        return Err(Error::InvalidInput(format!(
            "Identifier '{}' is a reserved name",
            name
        )));
    }

    Ok(())
}

/// Validate and double-quote an identifier.
pub fn quote_identifier(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name))
}

/// Resolves bare CMS table names against the installation's table prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableNames {
    prefix: String,
}

impl TableNames {
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        if !prefix.is_empty() && !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::InvalidInput(format!(
                "Table prefix may only contain letters, digits and underscores, got: {}",
                prefix
            )));
        }
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Quoted, prefixed name of a bare table.
    pub fn table(&self, bare: &str) -> Result<String> {
        quote_identifier(&format!("{}{}", self.prefix, bare))
    }
}
