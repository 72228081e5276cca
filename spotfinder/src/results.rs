//! Accumulation and export of detected spots.
//!
//! Detection writes into anything implementing [`ResultsSink`]. The standard
//! sink is [`ResultsTable`], an append-only list that keeps insertion order
//! and can render itself as a text table or export CSV/JSON with the columns
//! `Channel, X, Y, Z`.

use serde::Serialize;
use std::fmt;
use std::io::{self, Write};

use crate::detection::Spot;

/// Append-only destination for detected spots.
pub trait ResultsSink {
    /// Add one record after all previously appended records.
    fn append(&mut self, spot: Spot);
}

impl ResultsSink for Vec<Spot> {
    fn append(&mut self, spot: Spot) {
        self.push(spot);
    }
}

/// Column names shared by the text and CSV renderings.
pub const COLUMNS: [&str; 4] = ["Channel", "X", "Y", "Z"];

/// Ordered table of spots accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultsTable {
    spots: Vec<Spot>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.spots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }

    pub fn spots(&self) -> &[Spot] {
        &self.spots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Spot> {
        self.spots.iter()
    }

    /// Number of rows recorded for `channel`.
    pub fn count_for_channel(&self, channel: usize) -> usize {
        self.spots.iter().filter(|s| s.channel == channel).count()
    }

    /// Render as a fixed-width text table with a 1-based row number column.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Write CSV with a `Channel,X,Y,Z` header, even when the table is empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(COLUMNS)?;
        for spot in &self.spots {
            csv_writer.serialize(spot)?;
        }
        csv_writer.flush()
    }

    /// Write the spots as a pretty-printed JSON array.
    pub fn write_json<W: Write>(&self, writer: W) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, &self.spots)?;
        Ok(())
    }
}

impl ResultsSink for ResultsTable {
    fn append(&mut self, spot: Spot) {
        self.spots.push(spot);
    }
}

impl Extend<Spot> for ResultsTable {
    fn extend<I: IntoIterator<Item = Spot>>(&mut self, iter: I) {
        self.spots.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ResultsTable {
    type Item = &'a Spot;
    type IntoIter = std::slice::Iter<'a, Spot>;

    fn into_iter(self) -> Self::IntoIter {
        self.spots.iter()
    }
}

impl fmt::Display for ResultsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>6} {:>8} {:>6} {:>6} {:>6}",
            " ", COLUMNS[0], COLUMNS[1], COLUMNS[2], COLUMNS[3]
        )?;
        for (row, spot) in self.spots.iter().enumerate() {
            writeln!(
                f,
                "{:>6} {:>8} {:>6} {:>6} {:>6}",
                row + 1,
                spot.channel,
                spot.x,
                spot.y,
                spot.z
            )?;
        }
        Ok(())
    }
}
