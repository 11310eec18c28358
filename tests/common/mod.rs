//! Common test utilities
//!
//! This module is shared across the integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use compass::conversation::{ConversationEngine, EngineSettings, Event, Inbound, Reply, Session};
use compass::llm::ResponseClient;
use compass::sheets::Spreadsheet;
use compass::storage::UserStore;
use tempfile::TempDir;

use crate::mocks::{MockGenerator, RecordingAppender};

pub const USER: i64 = 4242;

/// Engine wired to a temp user store, a scripted model and an in-memory sheet.
pub struct TestEnvironment {
    pub dir: TempDir,
    pub store: Arc<UserStore>,
    pub generator: Arc<MockGenerator>,
    pub appender: Arc<RecordingAppender>,
    pub engine: Arc<ConversationEngine>,
}

pub struct EnvBuilder {
    settings: EngineSettings,
    generator: MockGenerator,
    appender: RecordingAppender,
    timeout: Duration,
    knowledge: Option<String>,
    unwritable_store: bool,
}

impl EnvBuilder {
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn generator(mut self, generator: MockGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn appender(mut self, appender: RecordingAppender) -> Self {
        self.appender = appender;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn knowledge(mut self, knowledge: &str) -> Self {
        self.knowledge = Some(knowledge.to_string());
        self
    }

    /// Points the store into a directory that does not exist, so every write fails.
    pub fn unwritable_store(mut self) -> Self {
        self.unwritable_store = true;
        self
    }

    pub async fn build(self) -> TestEnvironment {
        let dir = TempDir::new().unwrap();
        let path = if self.unwritable_store {
            dir.path().join("missing").join("users.json")
        } else {
            dir.path().join("users.json")
        };
        let store = Arc::new(UserStore::load(path).await);
        let generator = Arc::new(self.generator);
        let appender = Arc::new(self.appender);

        let responder = ResponseClient::new(generator.clone())
            .with_models("primary", Some("fallback".to_string()))
            .with_timeout(self.timeout);

        let engine = Arc::new(ConversationEngine::new(
            Arc::clone(&store),
            responder,
            Spreadsheet::new(appender.clone()),
            self.knowledge,
            self.settings,
        ));

        TestEnvironment {
            dir,
            store,
            generator,
            appender,
            engine,
        }
    }
}

impl TestEnvironment {
    pub fn builder() -> EnvBuilder {
        EnvBuilder {
            settings: EngineSettings::default(),
            generator: MockGenerator::replying("Привет! Что привело тебя в QAIYRYM?"),
            appender: RecordingAppender::default(),
            timeout: Duration::from_secs(5),
            knowledge: None,
            unwritable_store: false,
        }
    }

    pub async fn new() -> Self {
        Self::builder().build().await
    }

    pub async fn start(&self) -> Vec<Reply> {
        self.engine.handle(Inbound::new(USER, Event::Start)).await
    }

    pub async fn press(&self, data: &str) -> Vec<Reply> {
        self.engine.handle(Inbound::new(USER, Event::Button(data.to_string()))).await
    }

    pub async fn say(&self, text: &str) -> Vec<Reply> {
        self.engine
            .handle(Inbound::new(USER, Event::Text(text.to_string())).with_username(Some("volunteer".to_string())))
            .await
    }

    pub async fn session(&self) -> Session {
        self.engine.snapshot(USER).await.unwrap()
    }

    /// Start, pick Russian, open chat mode.
    pub async fn enter_chat(&self) {
        self.start().await;
        self.press("lang:ru").await;
        self.press("menu:chat").await;
    }

    /// Start, pick a language, walk through registration with the given age.
    pub async fn register(&self, lang: &str, age: &str) -> Vec<Reply> {
        self.start().await;
        self.press(&format!("lang:{}", lang)).await;
        self.press("menu:join").await;
        self.say("Дана").await;
        let replies = self.say(age).await;
        if self.session().await.stage != compass::conversation::Stage::RegistrationSkill {
            return replies;
        }
        self.say("дизайн").await
    }
}
