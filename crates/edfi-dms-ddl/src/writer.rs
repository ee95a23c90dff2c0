//! Canonicalizing SQL text builder.
//!
//! Output rules:
//! - `\n` line endings only (`\r\n` and lone `\r` are normalized on append)
//! - 4 spaces per indent level, applied at the start of each written line
//! - no trailing whitespace on any line of the final text

use crate::dialect::{Dialect, SqlDialect};
use crate::model::{DbTableName, RelationalScalarType};
use std::fmt;
use std::ops::{Deref, DerefMut};

const SPACES_PER_INDENT: usize = 4;

/// SQL text accumulator bound to a dialect.
#[derive(Debug)]
pub struct SqlWriter<'d> {
    dialect: &'d Dialect,
    buffer: String,
    indent_level: usize,
    at_line_start: bool,
}

impl<'d> SqlWriter<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        Self::with_capacity(dialect, 4096)
    }

    pub fn with_capacity(dialect: &'d Dialect, capacity: usize) -> Self {
        Self {
            dialect,
            buffer: String::with_capacity(capacity),
            indent_level: 0,
            at_line_start: true,
        }
    }

    /// The dialect used for quoting and type rendering.
    pub fn dialect(&self) -> &'d Dialect {
        self.dialect
    }

    /// Open an indented scope. The level is restored when the guard drops.
    ///
    /// ```rust
    /// use edfi_dms_ddl::dialect::{Dialect, SqlDialectKind};
    /// use edfi_dms_ddl::writer::SqlWriter;
    ///
    /// let dialect = Dialect::create(SqlDialectKind::Pgsql);
    /// let mut writer = SqlWriter::new(&dialect);
    /// writer.append_line("BEGIN");
    /// {
    ///     let mut inner = writer.indent();
    ///     inner.append_line("RETURN NULL;");
    /// }
    /// writer.append_line("END;");
    /// assert_eq!(writer.to_string(), "BEGIN\n    RETURN NULL;\nEND;\n");
    /// ```
    pub fn indent(&mut self) -> IndentGuard<'_, 'd> {
        self.indent_level += 1;
        IndentGuard { writer: self }
    }

    /// Append text without a newline.
    pub fn append(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        self.write_indent_if_needed();
        push_normalized(&mut self.buffer, text);
        self
    }

    /// Append text followed by a newline.
    pub fn append_line(&mut self, text: &str) -> &mut Self {
        if !text.is_empty() {
            self.write_indent_if_needed();
            push_normalized(&mut self.buffer, text);
        }
        self.new_line()
    }

    /// Append an empty line break.
    pub fn new_line(&mut self) -> &mut Self {
        self.buffer.push('\n');
        self.at_line_start = true;
        self
    }

    pub fn append_quoted(&mut self, identifier: &str) -> &mut Self {
        let quoted = self.dialect.quote_identifier(identifier);
        self.append(&quoted)
    }

    pub fn append_table(&mut self, table: &DbTableName) -> &mut Self {
        let qualified = self.dialect.qualify_table(table);
        self.append(&qualified)
    }

    pub fn append_column_type(&mut self, scalar_type: &RelationalScalarType) -> &mut Self {
        let rendered = self.dialect.render_column_type(scalar_type);
        self.append(&rendered)
    }

    /// Raw buffer length in bytes, before canonicalization.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Reset the buffer and indentation.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.indent_level = 0;
        self.at_line_start = true;
    }

    /// Consume the writer, returning the canonical text.
    pub fn into_sql(self) -> String {
        canonicalize(&self.buffer)
    }

    fn outdent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent_if_needed(&mut self) {
        if self.at_line_start && self.indent_level > 0 {
            self.buffer
                .extend(std::iter::repeat(' ').take(self.indent_level * SPACES_PER_INDENT));
        }
        self.at_line_start = false;
    }
}

impl fmt::Display for SqlWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&canonicalize(&self.buffer))
    }
}

/// Indentation scope returned by [`SqlWriter::indent`].
///
/// Derefs to the writer so appends go through the guard while it is alive.
#[derive(Debug)]
pub struct IndentGuard<'w, 'd> {
    writer: &'w mut SqlWriter<'d>,
}

impl<'d> Deref for IndentGuard<'_, 'd> {
    type Target = SqlWriter<'d>;

    fn deref(&self) -> &Self::Target {
        self.writer
    }
}

impl DerefMut for IndentGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.writer
    }
}

impl Drop for IndentGuard<'_, '_> {
    fn drop(&mut self) {
        self.writer.outdent();
    }
}

fn push_normalized(buffer: &mut String, text: &str) {
    if !text.contains('\r') {
        buffer.push_str(text);
        return;
    }
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            buffer.push('\n');
        } else {
            buffer.push(c);
        }
    }
}

/// Strip trailing whitespace from every line, keeping the final newline.
fn canonicalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut lines = raw.split('\n').peekable();
    while let Some(line) = lines.next() {
        out.push_str(line.trim_end());
        if lines.peek().is_some() {
            out.push('\n');
        }
    }
    out
}
