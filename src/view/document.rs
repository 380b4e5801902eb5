//! In-memory page
//!
//! Holds the last value written to every element, the way the DOM does.

use std::collections::HashMap;

use super::surface::{Field, FormKind, PersonRow, Surface};

/// In-memory [`Surface`]
#[derive(Debug, Clone, Default)]
pub struct Document {
    fields: HashMap<Field, String>,
    rows: Vec<PersonRow>,
    tree_src: Option<String>,
    tree_loads: usize,
    outputs: HashMap<FormKind, String>,
    form_resets: HashMap<FormKind, usize>,
    commits: usize,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text content of a counter, `None` if never written
    pub fn text(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn rows(&self) -> &[PersonRow] {
        &self.rows
    }

    pub fn tree_src(&self) -> Option<&str> {
        self.tree_src.as_deref()
    }

    /// How many times the tree image was pointed at a URL
    pub fn tree_loads(&self) -> usize {
        self.tree_loads
    }

    pub fn output(&self, form: FormKind) -> Option<&str> {
        self.outputs.get(&form).map(String::as_str)
    }

    pub fn form_resets(&self, form: FormKind) -> usize {
        self.form_resets.get(&form).copied().unwrap_or(0)
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl Surface for Document {
    fn set_text(&mut self, field: Field, text: &str) {
        self.fields.insert(field, text.to_string());
    }

    fn replace_rows(&mut self, rows: Vec<PersonRow>) {
        self.rows.clear();
        self.rows.extend(rows);
    }

    fn set_tree_src(&mut self, url: &str) {
        self.tree_src = Some(url.to_string());
        self.tree_loads += 1;
    }

    fn set_output(&mut self, form: FormKind, text: &str) {
        self.outputs.insert(form, text.to_string());
    }

    fn reset_form(&mut self, form: FormKind) {
        *self.form_resets.entry(form).or_insert(0) += 1;
    }

    fn commit(&mut self) {
        self.commits += 1;
    }
}
