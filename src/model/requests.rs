//! Create-requests sent by the mutation forms

use serde::{Deserialize, Serialize};

/// Body of `POST /families`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCreateRequest {
    pub name: String,
}

/// Body of `POST /people`
///
/// Only the shape is fixed here. `genero`, `provincia` and `estado_civil`
/// are validated by the server, as is `nombre`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonCreateRequest {
    pub cedula: Option<String>,
    pub nombre: String,
    /// `None` when the form value was not a number; sent as `null`
    pub edad: Option<i64>,
    pub genero: String,
    pub provincia: String,
    pub estado_civil: String,
    pub intereses: Vec<String>,
    pub padres: Vec<String>,
    pub familia_id: Option<String>,
}
