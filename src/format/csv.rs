//! CSV output for flattened rows.
//!
//! Every field is quoted and records end with `\n`, so cells holding
//! delimiters or line breaks survive spreadsheet imports unchanged.

use crate::error::Result;
use crate::model::Row;
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use std::io::Write;

/// Incremental CSV writer: one header, then rows in column order.
pub struct CsvSink<W: Write> {
    writer: Writer<W>,
    columns: Vec<String>,
    rows_written: usize,
}

impl<W: Write> CsvSink<W> {
    /// Wrap `writer` and emit the header row immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn new(writer: W, columns: &[String]) -> Result<Self> {
        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);
        writer.write_record(columns)?;

        Ok(Self {
            writer,
            columns: columns.to_vec(),
            rows_written: 0,
        })
    }

    /// Write one row; cells missing from the row are written empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        self.writer.write_record(row.values_for(&self.columns))?;
        self.rows_written += 1;
        Ok(())
    }

    #[must_use]
    pub const fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the underlying writer fails.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }
}

/// Write a header and all rows in one go.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv<W: Write>(writer: W, columns: &[String], rows: &[Row]) -> Result<usize> {
    let mut sink = CsvSink::new(writer, columns)?;
    for row in rows {
        sink.write_row(row)?;
    }
    sink.finish()
}
