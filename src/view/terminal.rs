//! Terminal page
//!
//! Redraws the whole view as a text frame on every committed render step.

use std::io::Write;

use super::document::Document;
use super::surface::{Field, FormKind, PersonRow, Surface, TABLE_HEADERS};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// [`Surface`] that prints frames to a writer
pub struct TerminalSurface<W: Write + Send> {
    document: Document,
    out: W,
    clear_screen: bool,
}

impl TerminalSurface<std::io::Stdout> {
    /// Draw on standard output
    pub fn stdout(clear_screen: bool) -> Self {
        Self::new(std::io::stdout(), clear_screen)
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W, clear_screen: bool) -> Self {
        Self {
            document: Document::new(),
            out,
            clear_screen,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self) -> std::io::Result<()> {
        if self.clear_screen {
            self.out.write_all(CLEAR_SCREEN.as_bytes())?;
        }
        self.out.write_all(render_frame(&self.document).as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write + Send> Surface for TerminalSurface<W> {
    fn set_text(&mut self, field: Field, text: &str) {
        self.document.set_text(field, text);
    }

    fn replace_rows(&mut self, rows: Vec<PersonRow>) {
        self.document.replace_rows(rows);
    }

    fn set_tree_src(&mut self, url: &str) {
        self.document.set_tree_src(url);
    }

    fn set_output(&mut self, form: FormKind, text: &str) {
        self.document.set_output(form, text);
    }

    fn reset_form(&mut self, form: FormKind) {
        self.document.reset_form(form);
    }

    fn commit(&mut self) {
        self.document.commit();
        if let Err(e) = self.draw() {
            tracing::warn!(error = %e, "Failed to draw terminal frame");
        }
    }
}

/// Format a document as one text frame
pub fn render_frame(document: &Document) -> String {
    let mut frame = String::new();

    let counters: Vec<String> = Field::ALL
        .iter()
        .map(|field| format!("{}: {}", field.label(), document.text(*field).unwrap_or("-")))
        .collect();
    frame.push_str(&counters.join("  |  "));
    frame.push_str("\n\n");

    let widths = [12, 20, 5, 5, 12, 5];
    push_row(&mut frame, &TABLE_HEADERS.map(String::from), &widths);
    frame.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len()));
    frame.push('\n');
    for row in document.rows() {
        push_row(&mut frame, &row.cells(), &widths);
    }
    if document.rows().is_empty() {
        frame.push_str("(sin personas)\n");
    }

    if let Some(src) = document.tree_src() {
        frame.push_str(&format!("\nÁrbol: {}\n", src));
    }

    for form in [FormKind::Family, FormKind::Person] {
        if let Some(output) = document.output(form) {
            frame.push_str(&format!("\n[{}]\n{}\n", form.name(), output));
        }
    }

    frame
}

fn push_row(frame: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    frame.push_str(line.join("  ").trim_end());
    frame.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PersonSummary;

    #[test]
    fn test_frame_lists_counters_rows_and_outputs() {
        let mut document = Document::new();
        document.set_text(Field::Year, "1995");
        document.set_text(Field::People, "1");
        document.replace_rows(vec![PersonRow::from(&PersonSummary::new("101", "Ana", 30))]);
        document.set_tree_src("http://localhost:5001/tree.svg?ts=4");
        document.set_output(FormKind::Family, "{\n  \"ok\": true\n}");

        let frame = render_frame(&document);
        assert!(frame.contains("Año: 1995"));
        assert!(frame.contains("Vivos: -"));
        assert!(frame.contains("Ana"));
        assert!(frame.contains("✔"));
        assert!(frame.contains("Árbol: http://localhost:5001/tree.svg?ts=4"));
        assert!(frame.contains("[family]"));
        assert!(!frame.contains("[person]"));
        assert!(!frame.contains("sin personas"));
    }

    #[test]
    fn test_commit_draws_frame() {
        let mut surface = TerminalSurface::new(Vec::new(), false);
        surface.set_text(Field::Version, "7");
        surface.commit();
        surface.commit();

        assert_eq!(surface.document().commits(), 2);
        let printed = String::from_utf8(surface.into_inner()).unwrap();
        assert_eq!(printed.matches("Versión: 7").count(), 2);
        assert!(printed.contains("(sin personas)"));
    }
}
