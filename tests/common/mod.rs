//! Shared fixtures for integration tests.
#![allow(dead_code)]

use apigate::config::ServerConfig;
use apigate::http::{SameSite, SetCookie};
use apigate::schema::AnyPayload;
use apigate::{
    ConverterChain, Endpoint, Handlers, Json, RequestLog, RequestLogger, SchemaTable, Server,
    ServerHandle,
};
use axum::http::Method;
use parking_lot::Mutex;
use serde::{ser::Error as _, Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct TestApi;

#[derive(Debug, Deserialize)]
pub struct NewItem {
    pub name: String,
}

macro_rules! endpoint {
    ($name:ident, $method:ident, $path:literal, $body:ty, $reply:ty) => {
        pub struct $name;
        impl Endpoint for $name {
            type Api = TestApi;
            const PATH: &'static str = $path;
            const METHOD: Method = Method::$method;
            type Body = $body;
            type Reply = $reply;
        }
    };
}

/// Serializes to an error, whatever the serializer.
pub struct Opaque;

impl Serialize for Opaque {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(S::Error::custom("opaque value"))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    pub first_name: String,
    pub home_town: Option<String>,
}

endpoint!(CreateItem, POST, "/item", NewItem, Json<200, Value>);
endpoint!(ListItems, GET, "/item", Value, Json<200, Value>);
endpoint!(Silent, POST, "/silent", Value, Json<200, Value>);
endpoint!(Broken, GET, "/broken", Value, Json<200, Opaque>);
endpoint!(Failing, GET, "/failing", Value, Json<200, Value>);
endpoint!(Panicking, GET, "/panic", Value, Json<200, Value>);
endpoint!(Slow, GET, "/slow", Value, Json<200, Value>);
endpoint!(Cookies, GET, "/cookies", Value, Json<200, Value>);
endpoint!(QueryEcho, GET, "/echo", Value, Json<200, Value>);
endpoint!(DeleteEcho, DELETE, "/echo", Value, Json<200, Value>);
endpoint!(Whoami, GET, "/whoami", Value, Json<200, Value>);
endpoint!(First, GET, "/first", Value, Json<200, Value>);
endpoint!(UpdateProfile, PUT, "/profile", Profile, Json<200, Profile>);

pub fn schema() -> SchemaTable<TestApi> {
    SchemaTable::new()
        .route::<CreateItem>()
        .route::<ListItems>()
        .route::<Silent>()
        .route::<Broken>()
        .route::<Failing>()
        .route::<Panicking>()
        .route::<Slow>()
        .route::<Cookies>()
        .route::<QueryEcho>()
        .route::<DeleteEcho>()
        .route::<Whoami>()
        .route::<First>()
        // Converters run after validation, so this route sees camelCase keys.
        .route_with::<UpdateProfile>(Arc::new(AnyPayload))
}

fn echo(tag: &'static str) -> Handlers<TestApi> {
    let mut handlers = Handlers::new();
    handlers.handle::<First, _, _>(move |req| async move {
        req.reply(Json(json!({ "registry": tag })));
        Ok(())
    });
    handlers
}

pub fn handlers() -> Handlers<TestApi> {
    let mut handlers = Handlers::new();
    handlers
        .handle::<CreateItem, _, _>(|req| async move {
            req.reply(Json(json!({ "id": 1, "name": req.body().name })));
            Ok(())
        })
        .handle::<Silent, _, _>(|_req| async move { Ok(()) })
        .handle::<Broken, _, _>(|req| async move {
            req.reply(Json(Opaque));
            Ok(())
        })
        .handle::<Failing, _, _>(|_req| async move { Err(anyhow::anyhow!("storage offline")) })
        .handle::<Panicking, _, _>(|_req| async move {
            let missing: Option<()> = None;
            missing.expect("worker bug");
            Ok(())
        })
        .handle::<Slow, _, _>(|req| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            req.reply(Json(json!("late")));
            Ok(())
        })
        .handle::<Cookies, _, _>(|req| async move {
            req.set_cookie(SetCookie::new("session", "abc").path("/").http_only(true));
            req.set_cookie(
                SetCookie::new("theme", "dark")
                    .max_age(3600)
                    .same_site(SameSite::Strict),
            );
            req.set_cache_control("no-cache");
            req.reply(Json(json!({ "ok": true })));
            Ok(())
        })
        .handle::<QueryEcho, _, _>(|req| async move {
            req.reply(Json(req.body().clone()));
            Ok(())
        })
        .handle::<DeleteEcho, _, _>(|req| async move {
            req.reply(Json(req.body().clone()));
            Ok(())
        })
        .handle::<Whoami, _, _>(|req| async move {
            req.reply(Json(json!({
                "remote": req.remote_address(),
                "agent": req.user_agent(),
                "session": req.cookie("session").map(|c| c.value.clone()),
            })));
            Ok(())
        })
        .handle::<UpdateProfile, _, _>(|req| async move {
            let profile = req.body();
            req.reply(Json(Profile {
                first_name: profile.first_name.to_uppercase(),
                home_town: profile.home_town.clone(),
            }));
            Ok(())
        });

    handlers.merge(echo("first")).merge(echo("second"));
    handlers
}

/// Logger that keeps every entry.
#[derive(Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<RequestLog>>,
}

impl RecordingLogger {
    pub fn entries(&self) -> Vec<RequestLog> {
        self.entries.lock().clone()
    }
}

impl RequestLogger for RecordingLogger {
    fn request(&self, entry: &RequestLog) {
        self.entries.lock().push(entry.clone());
    }
}

pub struct TestServer {
    pub handle: ServerHandle,
    pub logs: Arc<RecordingLogger>,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.handle.local_addr(), path)
    }
}

/// Start the test API on an ephemeral port.
pub async fn start(config: ServerConfig, converters: ConverterChain) -> TestServer {
    let logs = Arc::new(RecordingLogger::default());
    let mut server = Server::new(schema())
        .with_config(&config)
        .with_converters(converters)
        .with_logger(logs.clone());
    server.with_handlers(handlers());
    server.cors("https://app.example");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let handle = server.serve(listener).await.unwrap();

    TestServer {
        handle,
        logs,
        client: reqwest::Client::new(),
    }
}

pub async fn start_default() -> TestServer {
    start(ServerConfig::default(), ConverterChain::new()).await
}
