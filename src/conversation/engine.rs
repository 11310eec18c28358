//! Session registry and the onboarding/menu state machine.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::action::{AboutTopic, Action, MenuItem};
use super::chat::{self, ChatContext, TurnOutcome};
use super::reply::{Keyboard, Reply};
use super::session::{PendingRegistration, Session, Stage};
use crate::core::config;
use crate::core::utils::markdown_to_html;
use crate::i18n::{t, Language, TextKey};
use crate::llm::ResponseClient;
use crate::sheets::{RegistrationRow, Spreadsheet};
use crate::storage::{Registration, Role, UserRecord, UserStore};

/// What the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Explicit restart (`/start`).
    Start,
    /// Inline button press with its raw callback data.
    Button(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub user_id: i64,
    pub username: Option<String>,
    pub event: Event,
}

impl Inbound {
    pub fn new(user_id: i64, event: Event) -> Self {
        Self {
            user_id,
            username: None,
            event,
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }
}

/// Policy and limits of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub consent_required: bool,
    pub webapp_url: Option<String>,
    pub history_limit: usize,
    pub max_output_tokens: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            consent_required: false,
            webapp_url: None,
            history_limit: config::chat::HISTORY_LIMIT,
            max_output_tokens: config::gemini::MAX_OUTPUT_TOKENS,
        }
    }
}

impl EngineSettings {
    pub fn from_config() -> Self {
        Self {
            consent_required: *config::CONSENT_REQUIRED,
            webapp_url: config::WEBAPP_URL.clone(),
            ..Self::default()
        }
    }
}

/// Landing page served next to the mini-app (`.../app/index.html` -> `.../app/landing.html`).
pub fn landing_url(webapp_url: &str) -> String {
    let has_host = |base: &str| base.split_once("://").is_some_and(|(_, host)| !host.is_empty());
    let base = match webapp_url.rsplit_once('/') {
        Some((base, _)) if has_host(base) => base,
        _ => webapp_url.trim_end_matches('/'),
    };
    format!("{}/landing.html", base)
}

/// Transport-independent conversation engine.
///
/// Events of one user are serialized by that user's session lock; different
/// users proceed concurrently.
pub struct ConversationEngine {
    sessions: DashMap<i64, Arc<Mutex<Session>>>,
    store: Arc<UserStore>,
    responder: ResponseClient,
    sheets: Spreadsheet,
    knowledge: Option<String>,
    settings: EngineSettings,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<UserStore>,
        responder: ResponseClient,
        sheets: Spreadsheet,
        knowledge: Option<String>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            store,
            responder,
            sheets,
            knowledge,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<UserStore> {
        &self.store
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn session(&self, user_id: i64) -> Arc<Mutex<Session>> {
        let entry = self
            .sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(Session::with_history_limit(self.settings.history_limit))));
        Arc::clone(entry.value())
    }

    /// Copy of the user's session, if one exists.
    pub async fn snapshot(&self, user_id: i64) -> Option<Session> {
        let session = self.sessions.get(&user_id).map(|s| Arc::clone(s.value()))?;
        let guard = session.lock().await;
        Some(guard.clone())
    }

    /// Whether a text from this user would go to the model.
    pub async fn is_chatting(&self, user_id: i64) -> bool {
        match self.snapshot(user_id).await {
            Some(session) => session.stage == Stage::ChatMode,
            None => false,
        }
    }

    /// Handles one inbound event and returns the replies to send, in order.
    pub async fn handle(&self, inbound: Inbound) -> Vec<Reply> {
        let session = self.session(inbound.user_id);
        let mut session = session.lock().await;
        let user_id = inbound.user_id;

        match inbound.event {
            Event::Start => self.on_start(&mut session, user_id),
            Event::Button(data) => match Action::parse(&data) {
                Some(action) => self.on_action(&mut session, user_id, action).await,
                None => {
                    log::debug!("[CALLBACK] Ignoring unknown data from {}: {}", user_id, data);
                    Vec::new()
                }
            },
            Event::Text(text) => self.on_text(&mut session, user_id, inbound.username, &text).await,
        }
    }

    fn on_start(&self, session: &mut Session, user_id: i64) -> Vec<Reply> {
        log::info!("[START] User {}", user_id);
        session.reset();
        vec![Reply::with_keyboard(
            t(Language::DEFAULT, TextKey::ChooseLang),
            Keyboard::LanguagePicker,
        )]
    }

    async fn on_action(&self, session: &mut Session, user_id: i64, action: Action) -> Vec<Reply> {
        match action {
            Action::Language(language) => self.choose_language(session, user_id, language).await,
            Action::Consent(agreed) => self.record_consent(session, user_id, agreed).await,
            Action::Menu(item) => self.open_menu_item(session, user_id, item).await,
            Action::About(topic) => {
                session.stage = Stage::AboutSubmenu;
                let key = match topic {
                    AboutTopic::Mission => TextKey::Mission,
                    AboutTopic::Creator => TextKey::Creator,
                    AboutTopic::Partners => TextKey::Partners,
                    AboutTopic::Details => TextKey::Details,
                };
                vec![Reply::with_keyboard(
                    t(session.language(), key),
                    self.about_keyboard(session.language()),
                )]
            }
        }
    }

    async fn choose_language(&self, session: &mut Session, user_id: i64, language: Language) -> Vec<Reply> {
        log::info!("[LANG] User {} selected {}", user_id, language.code());
        session.language = Some(language);
        session.pending = None;
        if let Err(e) = self.store.set_language(user_id, language).await {
            log::error!("[DB] Failed to store language for {}: {}", user_id, e);
        }

        if self.settings.consent_required {
            session.stage = Stage::Consent;
            return vec![Reply::with_keyboard(
                t(language, TextKey::AgreementText),
                Keyboard::Consent(language),
            )];
        }

        self.open_main_menu(session, user_id).await
    }

    async fn record_consent(&self, session: &mut Session, user_id: i64, agreed: bool) -> Vec<Reply> {
        log::info!("[CONSENT] User {} agreed: {}", user_id, agreed);
        if let Err(e) = self.store.set_consent(user_id, agreed).await {
            log::error!("[DB] Failed to store consent for {}: {}", user_id, e);
        }

        let language = session.language();
        let role = self.store.role(user_id).await;
        session.stage = Stage::menu_for(role);
        let key = if agreed {
            TextKey::AgreeAccepted
        } else {
            TextKey::AgreeDeclined
        };
        vec![Reply::with_keyboard(t(language, key), menu_keyboard(role, language))]
    }

    async fn open_menu_item(&self, session: &mut Session, user_id: i64, item: MenuItem) -> Vec<Reply> {
        let language = session.language();
        match item {
            MenuItem::Chat => {
                log::info!("[MENU] User {} entered chat mode", user_id);
                session.stage = Stage::ChatMode;
                vec![Reply::text(t(language, TextKey::ChatModeOn))]
            }
            MenuItem::About => {
                session.stage = Stage::AboutSubmenu;
                vec![Reply::with_keyboard(t(language, TextKey::About), self.about_keyboard(language))]
            }
            MenuItem::Join => {
                if self.settings.consent_required && self.store.consent(user_id).await != Some(true) {
                    return vec![Reply::text(t(language, TextKey::RegistrationUnavailable))];
                }
                log::info!("[REG] User {} started registration", user_id);
                session.stage = Stage::RegistrationName;
                session.pending = Some(PendingRegistration::default());
                vec![Reply::text(format!(
                    "{}\n\n{}",
                    t(language, TextKey::JoinIntro),
                    t(language, TextKey::AskName)
                ))]
            }
            MenuItem::Instruction => vec![Reply::with_keyboard(
                t(language, TextKey::Instruction),
                Keyboard::MemberMenu(language),
            )],
            MenuItem::Profile => match &self.settings.webapp_url {
                Some(url) => vec![Reply::with_keyboard(
                    t(language, TextKey::ProfileOpen),
                    Keyboard::MiniApp {
                        language,
                        url: url.clone(),
                    },
                )],
                None => vec![Reply::text(t(language, TextKey::ProfileUnavailable))],
            },
            MenuItem::BackToMain => self.open_main_menu(session, user_id).await,
        }
    }

    async fn open_main_menu(&self, session: &mut Session, user_id: i64) -> Vec<Reply> {
        let language = session.language();
        let role = self.store.role(user_id).await;
        session.stage = Stage::menu_for(role);
        let intro = match role {
            Role::Member => TextKey::IntroMember,
            Role::Guest => TextKey::IntroGuest,
        };
        vec![Reply::with_keyboard(t(language, intro), menu_keyboard(role, language))]
    }

    async fn on_text(&self, session: &mut Session, user_id: i64, username: Option<String>, text: &str) -> Vec<Reply> {
        let language = session.language();
        match session.stage {
            Stage::ChooseLanguage => vec![Reply::with_keyboard(
                t(Language::DEFAULT, TextKey::ChooseLang),
                Keyboard::LanguagePicker,
            )],
            Stage::Consent => vec![Reply::with_keyboard(
                t(language, TextKey::AgreementText),
                Keyboard::Consent(language),
            )],
            Stage::GuestMenu | Stage::MemberMenu => {
                let role = self.store.role(user_id).await;
                vec![Reply::with_keyboard(
                    t(language, TextKey::UseMenuButtons),
                    menu_keyboard(role, language),
                )]
            }
            Stage::AboutSubmenu => vec![Reply::with_keyboard(
                t(language, TextKey::UseMenuButtons),
                self.about_keyboard(language),
            )],
            Stage::RegistrationName => {
                let name = text.trim();
                if name.is_empty() {
                    return vec![Reply::text(t(language, TextKey::AskName))];
                }
                session.pending = Some(PendingRegistration {
                    name: name.to_string(),
                    age: None,
                });
                session.stage = Stage::RegistrationAge;
                vec![Reply::text(t(language, TextKey::AskAge))]
            }
            Stage::RegistrationAge => self.on_age(session, user_id, text),
            Stage::RegistrationSkill => {
                let skill = text.trim();
                if skill.is_empty() {
                    return vec![Reply::text(t(language, TextKey::AskSkill))];
                }
                self.complete_registration(session, user_id, username, skill).await
            }
            Stage::ChatMode => self.on_chat(session, user_id, text).await,
        }
    }

    fn on_age(&self, session: &mut Session, user_id: i64, text: &str) -> Vec<Reply> {
        let language = session.language();
        let Some(age) = parse_age(text) else {
            return vec![Reply::text(t(language, TextKey::InvalidAge))];
        };

        if age < config::registration::MIN_AGE {
            log::info!("[REG] User {} is underage ({}), registration rejected", user_id, age);
            session.reset();
            return vec![Reply::text(t(language, TextKey::Underage))];
        }

        match session.pending.as_mut() {
            Some(pending) => {
                pending.age = Some(age);
                session.stage = Stage::RegistrationSkill;
                vec![Reply::text(t(language, TextKey::AskSkill))]
            }
            None => {
                session.stage = Stage::RegistrationName;
                session.pending = Some(PendingRegistration::default());
                vec![Reply::text(t(language, TextKey::AskName))]
            }
        }
    }

    async fn complete_registration(
        &self,
        session: &mut Session,
        user_id: i64,
        username: Option<String>,
        skill: &str,
    ) -> Vec<Reply> {
        let language = session.language();
        let Some(PendingRegistration { name, age: Some(age) }) = session.pending.clone() else {
            session.stage = Stage::RegistrationName;
            session.pending = Some(PendingRegistration::default());
            return vec![Reply::text(t(language, TextKey::AskName))];
        };

        let registration = Registration {
            user_id,
            name,
            age,
            skill: skill.to_string(),
            language,
            registered_at: Utc::now(),
        };

        match self.store.register(registration).await {
            Ok(record) => {
                log::info!("[REG] User {} registered as MEMBER", user_id);
                self.sheets.submit(registration_row(&record, username));
                session.pending = None;
                session.stage = Stage::MemberMenu;
                vec![
                    Reply::text(t(language, TextKey::Registered)),
                    Reply::with_keyboard(t(language, TextKey::IntroMember), Keyboard::MemberMenu(language)),
                ]
            }
            Err(e) => {
                log::error!("[REG] Failed to save registration for {}: {}", user_id, e);
                session.reset();
                vec![Reply::text(t(language, TextKey::RegistrationFailed))]
            }
        }
    }

    async fn on_chat(&self, session: &mut Session, user_id: i64, text: &str) -> Vec<Reply> {
        let ctx = ChatContext {
            responder: &self.responder,
            role: self.store.role(user_id).await,
            knowledge: self.knowledge.as_deref(),
            max_output_tokens: self.settings.max_output_tokens,
        };

        match chat::run_turn(session, &ctx, text).await {
            TurnOutcome::Skipped => Vec::new(),
            TurnOutcome::Replied(answer) => vec![Reply::text(markdown_to_html(&answer))],
            TurnOutcome::Failed(e) => vec![Reply::text(t(session.language(), chat::failure_text(&e)))],
        }
    }

    fn about_keyboard(&self, language: Language) -> Keyboard {
        Keyboard::About {
            language,
            landing_url: self.settings.webapp_url.as_deref().map(landing_url),
        }
    }
}

fn menu_keyboard(role: Role, language: Language) -> Keyboard {
    match role {
        Role::Member => Keyboard::MemberMenu(language),
        Role::Guest => Keyboard::GuestMenu(language),
    }
}

/// Accepts only a plain non-negative integer literal. Literals beyond `u32`
/// saturate, so they still count as adult.
fn parse_age(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(text.parse().unwrap_or(u32::MAX))
}

fn registration_row(record: &UserRecord, username: Option<String>) -> RegistrationRow {
    RegistrationRow {
        user_id: record.user_id.clone(),
        name: record.name.clone().unwrap_or_default(),
        age: record.age.unwrap_or_default(),
        skill: record.skill.clone().unwrap_or_default(),
        language: record.language.code().to_string(),
        username: username.unwrap_or_default(),
        registered_at: record.registered_at.clone().unwrap_or_default(),
    }
}
