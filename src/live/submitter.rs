//! Mutation Submitter
//!
//! Turns raw form input into create-requests, sends them, echoes the server
//! answer into the form's output area and refreshes the whole view.

use std::sync::Arc;

use super::loader::SnapshotLoader;
use crate::api::{ServerResponse, StateApi};
use crate::error::{PadronError, PadronResult};
use crate::model::{FamilyCreateRequest, PersonCreateRequest};
use crate::view::{FormKind, Surface, ViewRenderer};

/// Raw input of the family form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyForm {
    pub name: String,
}

impl FamilyForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Build the request; a blank name is the one client-side rejection
    pub fn normalize(&self) -> PadronResult<FamilyCreateRequest> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PadronError::Validation("family name is required".to_string()));
        }
        Ok(FamilyCreateRequest {
            name: name.to_string(),
        })
    }
}

/// Raw input of the person form, one string per field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonForm {
    pub cedula: String,
    pub nombre: String,
    pub edad: String,
    pub genero: String,
    pub provincia: String,
    pub estado_civil: String,
    /// Comma-separated
    pub intereses: String,
    /// Comma-separated parent cédulas
    pub padres: String,
    pub familia_id: String,
}

impl PersonForm {
    /// Field names accepted by [`PersonForm::set_field`]
    pub const FIELDS: [&'static str; 9] = [
        "cedula",
        "nombre",
        "edad",
        "genero",
        "provincia",
        "estado_civil",
        "intereses",
        "padres",
        "familia_id",
    ];

    /// Set one field by its wire name
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> PadronResult<()> {
        let slot = match name.trim() {
            "cedula" => &mut self.cedula,
            "nombre" => &mut self.nombre,
            "edad" => &mut self.edad,
            "genero" => &mut self.genero,
            "provincia" => &mut self.provincia,
            "estado_civil" => &mut self.estado_civil,
            "intereses" => &mut self.intereses,
            "padres" => &mut self.padres,
            "familia_id" => &mut self.familia_id,
            other => {
                return Err(PadronError::Validation(format!(
                    "unknown person field '{}' (expected one of: {})",
                    other,
                    Self::FIELDS.join(", ")
                )))
            }
        };
        *slot = value.into();
        Ok(())
    }

    /// Build the request. Everything except shape is left to the server.
    pub fn normalize(&self) -> PersonCreateRequest {
        PersonCreateRequest {
            cedula: optional_field(&self.cedula),
            nombre: self.nombre.trim().to_string(),
            edad: parse_edad(&self.edad),
            genero: self.genero.trim().to_string(),
            provincia: self.provincia.trim().to_string(),
            estado_civil: self.estado_civil.trim().to_string(),
            intereses: split_list(&self.intereses),
            padres: split_list(&self.padres),
            familia_id: optional_field(&self.familia_id),
        }
    }
}

/// Split a comma-separated field into trimmed, non-empty entries
///
/// Order is kept and duplicates are not removed.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trimmed value, or `None` when blank
pub fn optional_field(raw: &str) -> Option<String> {
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Blank is 0; anything that is not an integer is left for the server to reject
pub fn parse_edad(raw: &str) -> Option<i64> {
    let value = raw.trim();
    if value.is_empty() {
        return Some(0);
    }
    value.parse().ok()
}

/// A user submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Family(FamilyForm),
    Person(PersonForm),
}

impl Mutation {
    pub fn kind(&self) -> FormKind {
        match self {
            Mutation::Family(_) => FormKind::Family,
            Mutation::Person(_) => FormKind::Person,
        }
    }
}

/// Sends mutations and refreshes the view after them
pub struct MutationSubmitter<S: Surface> {
    api: Arc<dyn StateApi>,
    renderer: Arc<ViewRenderer<S>>,
    loader: SnapshotLoader<S>,
}

impl<S: Surface> MutationSubmitter<S> {
    pub fn new(
        api: Arc<dyn StateApi>,
        renderer: Arc<ViewRenderer<S>>,
        loader: SnapshotLoader<S>,
    ) -> Self {
        Self {
            api,
            renderer,
            loader,
        }
    }

    /// Submit a mutation
    ///
    /// Returns `Validation` without touching the view or the network when
    /// the family name is blank. Any server answer, success or rejection,
    /// is echoed into the output area, followed by a form reset and exactly
    /// one snapshot pull. A network failure is echoed as text and nothing
    /// else happens.
    pub async fn submit(&self, mutation: &Mutation) -> PadronResult<ServerResponse> {
        let kind = mutation.kind();

        let result = match mutation {
            Mutation::Family(form) => {
                let request = form.normalize()?;
                self.api.create_family(&request).await
            }
            Mutation::Person(form) => self.api.create_person(&form.normalize()).await,
        };

        match result {
            Ok(response) => {
                tracing::info!(form = kind.name(), status = response.status, "Mutation submitted");
                self.renderer.show_output(kind, &response.render()).await;
                self.renderer.reset_form(kind).await;
                self.loader.refresh().await;
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(form = kind.name(), error = %e, "Mutation failed");
                self.renderer.show_output(kind, &e.to_string()).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::testing::FakeServer;
    use crate::model::PersonSummary;
    use crate::view::{Document, Field};
    use std::sync::atomic::Ordering;

    const TREE: &str = "http://localhost:5001/tree.svg";

    fn submitter(server: Arc<FakeServer>) -> (MutationSubmitter<Document>, Arc<ViewRenderer<Document>>) {
        let renderer = Arc::new(ViewRenderer::new(Document::new(), TREE, true));
        let api: Arc<dyn StateApi> = server;
        let loader = SnapshotLoader::new(Arc::clone(&api), Arc::clone(&renderer));
        (
            MutationSubmitter::new(api, Arc::clone(&renderer), loader),
            renderer,
        )
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a, b,, c ,"), vec!["a", "b", "c"]);
        assert_eq!(split_list("música,cine,música"), vec!["música", "cine", "música"]);
        assert!(split_list("").is_empty());
        assert!(split_list("  ,  , ").is_empty());
    }

    #[test]
    fn test_optional_fields_and_edad() {
        assert_eq!(optional_field("   "), None);
        assert_eq!(optional_field(" 123 "), Some("123".to_string()));
        assert_eq!(parse_edad(""), Some(0));
        assert_eq!(parse_edad(" 42 "), Some(42));
        assert_eq!(parse_edad("cuarenta"), None);
    }

    #[test]
    fn test_family_name_guard() {
        assert!(matches!(
            FamilyForm::new(" \t ").normalize(),
            Err(PadronError::Validation(_))
        ));
        assert_eq!(FamilyForm::new("  Mora ").normalize().unwrap().name, "Mora");
    }

    #[test]
    fn test_person_form_normalization() {
        let form = PersonForm {
            cedula: "  ".to_string(),
            nombre: " Ana ".to_string(),
            edad: "".to_string(),
            genero: "F".to_string(),
            provincia: "SJ".to_string(),
            estado_civil: "soltero".to_string(),
            intereses: "cine, lectura,".to_string(),
            padres: "101,102".to_string(),
            familia_id: " 000001 ".to_string(),
        };
        let request = form.normalize();

        assert_eq!(request.cedula, None);
        assert_eq!(request.nombre, "Ana");
        assert_eq!(request.edad, Some(0));
        assert_eq!(request.intereses, vec!["cine", "lectura"]);
        assert_eq!(request.padres, vec!["101", "102"]);
        assert_eq!(request.familia_id.as_deref(), Some("000001"));
    }

    #[test]
    fn test_set_field_by_name() {
        let mut form = PersonForm::default();
        form.set_field("nombre", "Ana").unwrap();
        form.set_field(" padres ", "101,102").unwrap();

        assert_eq!(form.nombre, "Ana");
        assert_eq!(form.padres, "101,102");
        assert!(matches!(
            form.set_field("apellido", "Mora"),
            Err(PadronError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_family_sends_nothing() {
        let server = Arc::new(FakeServer::default());
        let (submitter, renderer) = submitter(Arc::clone(&server));

        let result = submitter.submit(&Mutation::Family(FamilyForm::new("   "))).await;

        assert!(matches!(result, Err(PadronError::Validation(_))));
        assert_eq!(server.requests(), 0);
        renderer
            .with_surface(|d| {
                assert_eq!(d.output(FormKind::Family), None);
                assert_eq!(d.form_resets(FormKind::Family), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_person_submission_refreshes_once() {
        let server = Arc::new(FakeServer::with_people(vec![PersonSummary::new("101", "Ana", 30)
            .hijo("103")
            .hijo("104")]));
        let (submitter, renderer) = submitter(Arc::clone(&server));

        let form = PersonForm {
            cedula: "555".to_string(),
            nombre: "Rosa".to_string(),
            edad: "27".to_string(),
            padres: "101".to_string(),
            ..PersonForm::default()
        };
        let response = submitter.submit(&Mutation::Person(form)).await.unwrap();

        assert!(response.is_success());
        assert_eq!(server.person_posts.load(Ordering::SeqCst), 1);
        assert_eq!(server.fetches.load(Ordering::SeqCst), 1);
        renderer
            .with_surface(|d| {
                assert_eq!(d.rows().len(), 2);
                assert_eq!(d.rows()[0].hijos, 2);
                let rosa = &d.rows()[1];
                assert_eq!(rosa.cedula, "555");
                assert_eq!(rosa.nombre, "Rosa");
                assert_eq!(rosa.edad, 27);
                assert!(rosa.vivo);
                assert_eq!(rosa.pareja, "");
                assert_eq!(rosa.hijos, 0);
                assert_eq!(d.text(Field::People), Some("2"));
                assert!(d.output(FormKind::Person).unwrap().contains("\"ok\": true"));
                assert_eq!(d.form_resets(FormKind::Person), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_server_rejection_echoed_and_refreshed() {
        let server = Arc::new(FakeServer::default());
        let (submitter, renderer) = submitter(Arc::clone(&server));

        let response = submitter
            .submit(&Mutation::Person(PersonForm::default()))
            .await
            .unwrap();

        assert_eq!(response.status, 400);
        assert_eq!(server.fetches.load(Ordering::SeqCst), 1);
        renderer
            .with_surface(|d| {
                assert!(d.output(FormKind::Person).unwrap().contains("Nombre requerido"));
                assert_eq!(d.form_resets(FormKind::Person), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_network_failure_echoed_without_refresh() {
        let server = Arc::new(FakeServer::default());
        server.offline.store(true, Ordering::SeqCst);
        let (submitter, renderer) = submitter(Arc::clone(&server));

        let result = submitter.submit(&Mutation::Family(FamilyForm::new("Mora"))).await;

        assert!(matches!(result, Err(PadronError::Network(_))));
        assert_eq!(server.family_posts.load(Ordering::SeqCst), 1);
        assert_eq!(server.fetches.load(Ordering::SeqCst), 0);
        renderer
            .with_surface(|d| {
                assert!(d.output(FormKind::Family).unwrap().contains("connection refused"));
                assert_eq!(d.form_resets(FormKind::Family), 0);
            })
            .await;
    }
}
