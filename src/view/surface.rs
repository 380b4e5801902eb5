//! Rendering target
//!
//! [`Surface`] is the page the view draws on. Every write the renderer and
//! the submitter perform goes through it, and nothing else holds view state.

use crate::model::PersonSummary;

/// Scalar counters displayed above the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Year,
    People,
    Living,
    Unions,
    Families,
    Version,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Year,
        Field::People,
        Field::Living,
        Field::Unions,
        Field::Families,
        Field::Version,
    ];

    /// Element id on the page
    pub fn id(&self) -> &'static str {
        match self {
            Field::Year => "year",
            Field::People => "people",
            Field::Living => "living",
            Field::Unions => "unions",
            Field::Families => "families",
            Field::Version => "version",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Field::Year => "Año",
            Field::People => "Personas",
            Field::Living => "Vivos",
            Field::Unions => "Uniones",
            Field::Families => "Familias",
            Field::Version => "Versión",
        }
    }
}

/// The two mutation forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    Family,
    Person,
}

impl FormKind {
    pub fn name(&self) -> &'static str {
        match self {
            FormKind::Family => "family",
            FormKind::Person => "person",
        }
    }
}

/// One displayed table row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRow {
    pub cedula: String,
    pub nombre: String,
    pub edad: u64,
    pub vivo: bool,
    pub pareja: String,
    pub hijos: usize,
}

impl PersonRow {
    /// Cell texts in column order
    pub fn cells(&self) -> [String; 6] {
        [
            self.cedula.clone(),
            self.nombre.clone(),
            self.edad.to_string(),
            if self.vivo { "✔" } else { "✖" }.to_string(),
            self.pareja.clone(),
            self.hijos.to_string(),
        ]
    }
}

impl From<&PersonSummary> for PersonRow {
    fn from(person: &PersonSummary) -> Self {
        Self {
            cedula: person.cedula.clone().unwrap_or_default(),
            nombre: person.nombre.clone(),
            edad: person.edad,
            vivo: person.vivo,
            pareja: person.pareja.clone().unwrap_or_default(),
            hijos: person.child_count(),
        }
    }
}

/// Column headers matching [`PersonRow::cells`]
pub const TABLE_HEADERS: [&str; 6] = ["Cédula", "Nombre", "Edad", "Vivo", "Pareja", "Hijos"];

/// Something the view can be drawn on
pub trait Surface: Send {
    /// Set a counter's text content
    fn set_text(&mut self, field: Field, text: &str);

    /// Clear the people table and fill it with `rows`
    fn replace_rows(&mut self, rows: Vec<PersonRow>);

    /// Point the tree image at a new URL, which reloads it
    fn set_tree_src(&mut self, url: &str);

    /// Replace a form's debug output area
    fn set_output(&mut self, form: FormKind, text: &str);

    /// Clear a form's input fields
    fn reset_form(&mut self, form: FormKind);

    /// End of one render step
    fn commit(&mut self) {}
}
