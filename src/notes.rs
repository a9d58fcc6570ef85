//! In-memory notes API served by the `apigate` binary.
//!
//! ```text
//! GET    /notes?tagName=x    list notes, optionally by tag
//! POST   /notes              {"title": "...", "tagName": "..."}
//! DELETE /notes?id=1         remove one note
//! ```
//!
//! Keys are camelCase on the wire and snake_case in Rust.

use apigate::convert::KeyCase;
use apigate::http::{SameSite, SetCookie};
use apigate::schema::{JsonSchema, SchemaError};
use apigate::{ConverterChain, Endpoint, Handlers, Json, Reply, SchemaTable, Server, ServerConfig};
use axum::http::Method;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

const VISITOR_COOKIE: &str = "visitor";

/// API marker for the notes endpoints.
pub struct NotesApi;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub id: u64,
    pub title: String,
    pub tag_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NoteFilter {
    #[serde(default)]
    pub tag_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewNote {
    pub title: String,
    #[serde(default)]
    pub tag_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteId {
    pub id: String,
}

pub struct ListNotes;
impl Endpoint for ListNotes {
    type Api = NotesApi;
    const PATH: &'static str = "/notes";
    const METHOD: Method = Method::GET;
    type Body = NoteFilter;
    type Reply = Json<200, Vec<Note>>;
}

pub struct CreateNote;
impl Endpoint for CreateNote {
    type Api = NotesApi;
    const PATH: &'static str = "/notes";
    const METHOD: Method = Method::POST;
    type Body = NewNote;
    type Reply = Json<201, Note>;
}

pub struct DeleteNote;
impl Endpoint for DeleteNote {
    type Api = NotesApi;
    const PATH: &'static str = "/notes";
    const METHOD: Method = Method::DELETE;
    type Body = NoteId;
    type Reply = Deleted;
}

/// Reply for `DELETE /notes`: the removed note, or 404.
pub enum Deleted {
    Removed(Note),
    Missing,
}

impl Reply for Deleted {
    fn status(&self) -> u16 {
        match self {
            Self::Removed(_) => 200,
            Self::Missing => 404,
        }
    }

    fn to_payload(&self) -> serde_json::Result<Value> {
        match self {
            Self::Removed(note) => serde_json::to_value(note),
            Self::Missing => Ok(json!({ "error": "note not found" })),
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    notes: Vec<Note>,
}

/// Shared note storage.
#[derive(Debug, Clone, Default)]
pub struct Notes {
    inner: Arc<Mutex<Store>>,
}

impl Notes {
    fn list(&self, tag_name: Option<&str>) -> Vec<Note> {
        self.inner
            .lock()
            .notes
            .iter()
            .filter(|note| tag_name.is_none() || note.tag_name.as_deref() == tag_name)
            .cloned()
            .collect()
    }

    fn create(&self, new: &NewNote) -> Note {
        let mut store = self.inner.lock();
        store.next_id += 1;
        let note = Note {
            id: store.next_id,
            title: new.title.clone(),
            tag_name: new.tag_name.clone(),
            created_at: Utc::now(),
        };
        store.notes.push(note.clone());
        note
    }

    fn remove(&self, id: u64) -> Option<Note> {
        let mut store = self.inner.lock();
        let index = store.notes.iter().position(|note| note.id == id)?;
        Some(store.notes.remove(index))
    }
}

/// Schema table for the notes API. `POST` bodies are checked against a
/// JSON Schema on the wire (camelCase) form.
pub fn schema() -> Result<SchemaTable<NotesApi>, SchemaError> {
    let new_note = JsonSchema::compile(&json!({
        "type": "object",
        "required": ["title"],
        "properties": {
            "title": { "type": "string", "minLength": 1 },
            "tagName": { "type": "string" }
        }
    }))?;

    Ok(SchemaTable::new()
        .route::<ListNotes>()
        .route_with::<CreateNote>(Arc::new(new_note))
        .route::<DeleteNote>())
}

/// Workers bound to `notes`.
pub fn handlers(notes: Notes) -> Handlers<NotesApi> {
    let mut handlers = Handlers::new();

    let store = notes.clone();
    handlers.handle::<ListNotes, _, _>(move |req| {
        let store = store.clone();
        async move {
            if req.cookie(VISITOR_COOKIE).is_none() {
                req.set_cookie(
                    SetCookie::new(VISITOR_COOKIE, uuid::Uuid::new_v4().to_string())
                        .path("/")
                        .same_site(SameSite::Lax)
                        .http_only(true),
                );
            }
            req.set_cache_control("private, max-age=5");
            req.reply(Json(store.list(req.body().tag_name.as_deref())));
            Ok(())
        }
    });

    let store = notes.clone();
    handlers.handle::<CreateNote, _, _>(move |req| {
        let store = store.clone();
        async move {
            let note = store.create(req.body());
            tracing::debug!(id = note.id, remote = ?req.remote_address(), "Created note");
            req.reply(Json(note));
            Ok(())
        }
    });

    handlers.handle::<DeleteNote, _, _>(move |req| {
        let store = notes.clone();
        async move {
            let id: u64 = req.body().id.parse()?;
            req.reply(match store.remove(id) {
                Some(note) => Deleted::Removed(note),
                None => Deleted::Missing,
            });
            Ok(())
        }
    });

    handlers
}

/// The fully wired notes server.
pub fn server(config: &ServerConfig, notes: Notes) -> Result<Server<NotesApi>, SchemaError> {
    let mut server = Server::new(schema()?)
        .with_config(config)
        .with_converters(ConverterChain::new().with(KeyCase));
    server.with_handlers(handlers(notes));
    Ok(server)
}
