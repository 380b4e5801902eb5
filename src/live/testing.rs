//! In-memory server doubles for the live view tests

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::api::{EventSource, MessageStream, ServerResponse, StateApi};
use crate::error::{PadronError, PadronResult};
use crate::model::{
    Counts, FamilyCreateRequest, PersonCreateRequest, PersonSummary, StateSnapshot, Version,
};

/// Event source replaying one scripted message list per connect
pub struct ScriptedSource {
    scripts: Mutex<VecDeque<Vec<String>>>,
    connects: Arc<AtomicUsize>,
    hanging: bool,
}

impl ScriptedSource {
    pub fn new(scripts: Vec<Vec<String>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            connects: Arc::new(AtomicUsize::new(0)),
            hanging: false,
        }
    }

    /// A source whose single subscription never delivers or ends
    pub fn hanging() -> Self {
        Self {
            hanging: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn connects(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.connects)
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn connect(&self) -> PadronResult<MessageStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.hanging {
            return Ok(futures_util::stream::pending().boxed());
        }

        match self.scripts.lock().unwrap().pop_front() {
            Some(messages) => Ok(futures_util::stream::iter(messages.into_iter().map(Ok)).boxed()),
            None => Err(PadronError::Network("connection refused".to_string())),
        }
    }
}

/// Population server keeping people in memory
#[derive(Default)]
pub struct FakeServer {
    people: Mutex<Vec<PersonSummary>>,
    families: AtomicUsize,
    version: Mutex<i64>,
    pub fetches: AtomicUsize,
    pub family_posts: AtomicUsize,
    pub person_posts: AtomicUsize,
    pub offline: AtomicBool,
    /// Pulls wait for `release_fetch` before answering
    pub hold_fetches: AtomicBool,
    pub release_fetch: Notify,
}

impl FakeServer {
    pub fn with_people(people: Vec<PersonSummary>) -> Self {
        Self {
            people: Mutex::new(people),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
            + self.family_posts.load(Ordering::SeqCst)
            + self.person_posts.load(Ordering::SeqCst)
    }

    pub fn set_version(&self, version: i64) {
        *self.version.lock().unwrap() = version;
    }

    fn check_online(&self) -> PadronResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(PadronError::Network("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn bump(&self) -> i64 {
        let mut version = self.version.lock().unwrap();
        *version += 1;
        *version
    }
}

#[async_trait]
impl StateApi for FakeServer {
    async fn fetch_state(&self) -> PadronResult<StateSnapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self.hold_fetches.load(Ordering::SeqCst) {
            self.release_fetch.notified().await;
        }

        let people = self.people.lock().unwrap().clone();
        let version = *self.version.lock().unwrap();
        Ok(StateSnapshot {
            year: 1990 + version,
            counts: Counts {
                people: people.len() as u64,
                living: people.iter().filter(|p| p.vivo).count() as u64,
                unions: 0,
                families: self.families.load(Ordering::SeqCst) as u64,
            },
            version: Version::from(version),
            people,
        })
    }

    async fn create_family(&self, request: &FamilyCreateRequest) -> PadronResult<ServerResponse> {
        self.family_posts.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        let id = self.families.fetch_add(1, Ordering::SeqCst) + 1;
        self.bump();
        Ok(ServerResponse::json(
            200,
            json!({"ok": true, "family": {"id": format!("{:06}", id), "name": request.name}}),
        ))
    }

    async fn create_person(&self, request: &PersonCreateRequest) -> PadronResult<ServerResponse> {
        self.person_posts.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        if request.nombre.is_empty() {
            return Ok(ServerResponse::json(
                400,
                json!({"ok": false, "error": "Nombre requerido"}),
            ));
        }

        let version = self.bump();
        let cedula = request
            .cedula
            .clone()
            .unwrap_or_else(|| format!("{:09}", version));
        let person = PersonSummary::new(
            cedula.clone(),
            request.nombre.clone(),
            request.edad.unwrap_or(0).max(0) as u64,
        );
        self.people.lock().unwrap().push(person);

        Ok(ServerResponse::json(
            200,
            json!({"ok": true, "person": {"cedula": cedula, "nombre": request.nombre, "vivo": true}}),
        ))
    }
}
