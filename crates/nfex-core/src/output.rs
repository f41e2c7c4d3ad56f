//! Delimited tabular output.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{Terminator, Writer, WriterBuilder};

use crate::error::Result;
use crate::models::config::Delimiter;
use crate::models::record::{Row, columns};

/// Writes rows under the fixed column header.
pub struct RecordWriter<W: Write> {
    inner: Writer<W>,
    rows: usize,
}

impl RecordWriter<File> {
    /// Create `path` and write the header.
    pub fn create(path: &Path, delimiter: Delimiter) -> Result<Self> {
        Self::new(File::create(path)?, delimiter)
    }
}

impl<W: Write> RecordWriter<W> {
    /// Wrap `writer` and write the header.
    pub fn new(writer: W, delimiter: Delimiter) -> Result<Self> {
        let mut inner = WriterBuilder::new()
            .delimiter(delimiter.as_byte())
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);
        inner.write_record(columns())?;
        Ok(Self { inner, rows: 0 })
    }

    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        self.inner
            .write_record(row.values().into_iter().map(|v| v.unwrap_or_default()))?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_rows<'r>(&mut self, rows: impl IntoIterator<Item = &'r Row>) -> Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    /// Rows written so far, excluding the header.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| std::io::Error::new(e.error().kind(), e.error().to_string()).into())
    }
}
