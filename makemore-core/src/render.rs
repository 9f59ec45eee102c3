use std::io::Write;

use crate::{alphabet::Alphabet, bigram_model::FrequencyTable, error::Result};

/// Something that can display a frequency table, e.g. as a heatmap. Each
/// cell `(i, j)` is labelled by the symbol pair `symbol_at(i)` followed by
/// `symbol_at(j)`.
pub trait BigramRenderer {
    fn render(&mut self, counts: &FrequencyTable, alphabet: &Alphabet) -> Result<()>;
}

/// Renders the table as a plain-text grid, one line per row, each cell
/// showing its symbol pair and count.
pub struct TextGridRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextGridRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BigramRenderer for TextGridRenderer<W> {
    fn render(&mut self, counts: &FrequencyTable, alphabet: &Alphabet) -> Result<()> {
        alphabet.check_table_size(counts.size())?;
        let widest = (0..counts.size())
            .flat_map(|i| counts.row(i).iter())
            .max()
            .map_or(1, |max| max.to_string().len());
        let symbols = alphabet.symbols();

        for (i, &first) in symbols.iter().enumerate() {
            let cells: Vec<String> = symbols
                .iter()
                .enumerate()
                .map(|(j, &second)| format!("{first}{second} {:>widest$}", counts.get(i, j)))
                .collect();
            writeln!(self.out, "{}", cells.join("  "))?;
        }
        self.out.flush()?;
        Ok(())
    }
}
