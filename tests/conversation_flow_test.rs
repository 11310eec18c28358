//! End-to-end conversation scenarios against the transport-independent engine
//!
//! Run with: cargo test --test conversation_flow_test

mod common;
mod mocks;

use std::time::Duration;

use common::{TestEnvironment, USER};
use compass::conversation::prompt::{GREETING_ALLOWED, GREETING_FORBIDDEN};
use compass::conversation::{EngineSettings, Keyboard, Speaker, Stage};
use compass::i18n::{t, Language, TextKey};
use compass::llm::GenerationError;
use compass::storage::Role;
use mocks::{MockGenerator, RecordingAppender};
use pretty_assertions::assert_eq;

// ============================================================================
// Onboarding
// ============================================================================

#[tokio::test]
async fn test_start_shows_language_picker() {
    let env = TestEnvironment::new().await;

    let replies = env.start().await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, "Выберите язык:");
    assert_eq!(replies[0].keyboard, Some(Keyboard::LanguagePicker));
    assert_eq!(env.session().await.stage, Stage::ChooseLanguage);
}

#[tokio::test]
async fn test_language_choice_persists_and_opens_guest_menu() {
    let env = TestEnvironment::new().await;
    env.start().await;

    let replies = env.press("lang:kz").await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, t(Language::Kz, TextKey::IntroGuest));
    assert_eq!(replies[0].keyboard, Some(Keyboard::GuestMenu(Language::Kz)));

    let session = env.session().await;
    assert_eq!(session.stage, Stage::GuestMenu);
    assert_eq!(session.language, Some(Language::Kz));
    assert_eq!(env.store.get(USER).await.map(|r| r.language), Some(Language::Kz));
}

#[tokio::test]
async fn test_text_in_menu_asks_for_buttons() {
    let env = TestEnvironment::new().await;
    env.start().await;
    env.press("lang:ru").await;

    let replies = env.say("Здравствуйте").await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, t(Language::Ru, TextKey::UseMenuButtons));
    assert_eq!(replies[0].keyboard, Some(Keyboard::GuestMenu(Language::Ru)));
    assert_eq!(env.session().await.stage, Stage::GuestMenu);
    assert_eq!(env.generator.call_count(), 0);
}

#[tokio::test]
async fn test_text_before_language_repeats_picker() {
    let env = TestEnvironment::new().await;
    env.start().await;

    let replies = env.say("привет").await;

    assert_eq!(replies[0].keyboard, Some(Keyboard::LanguagePicker));
    assert_eq!(env.session().await.stage, Stage::ChooseLanguage);
}

#[tokio::test]
async fn test_unknown_button_is_idempotent() {
    let env = TestEnvironment::new().await;
    env.start().await;
    env.press("lang:ru").await;
    let before = env.session().await;
    let record_before = env.store.get(USER).await;

    for data in ["menu:settings", "lang:en", "about:", "garbage", "menu:settings"] {
        assert!(env.press(data).await.is_empty());
    }

    assert_eq!(env.session().await, before);
    assert_eq!(env.store.get(USER).await, record_before);
}

#[tokio::test]
async fn test_about_submenu_and_back() {
    let env = TestEnvironment::builder()
        .settings(EngineSettings {
            webapp_url: Some("https://compass.example/app/index.html".to_string()),
            ..EngineSettings::default()
        })
        .build()
        .await;
    env.start().await;
    env.press("lang:ru").await;

    let about = env.press("menu:about").await;
    assert_eq!(about[0].text, t(Language::Ru, TextKey::About));
    assert_eq!(
        about[0].keyboard,
        Some(Keyboard::About {
            language: Language::Ru,
            landing_url: Some("https://compass.example/app/landing.html".to_string()),
        })
    );
    assert_eq!(env.session().await.stage, Stage::AboutSubmenu);

    let mission = env.press("about:mission").await;
    assert_eq!(mission[0].text, t(Language::Ru, TextKey::Mission));

    let back = env.press("menu:back_to_main").await;
    assert_eq!(back[0].keyboard, Some(Keyboard::GuestMenu(Language::Ru)));
    assert_eq!(env.session().await.stage, Stage::GuestMenu);
}

#[tokio::test]
async fn test_profile_without_mini_app() {
    let env = TestEnvironment::new().await;
    env.start().await;
    env.press("lang:ru").await;

    let replies = env.press("menu:profile").await;

    assert_eq!(replies[0].text, t(Language::Ru, TextKey::ProfileUnavailable));
    assert_eq!(replies[0].keyboard, None);
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_invalid_age_reprompts_without_advancing() {
    let env = TestEnvironment::new().await;
    env.start().await;
    env.press("lang:ru").await;
    env.press("menu:join").await;
    env.say("Дана").await;
    let before = env.session().await;
    assert_eq!(before.stage, Stage::RegistrationAge);

    let replies = env.say("abc").await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, t(Language::Ru, TextKey::InvalidAge));
    let after = env.session().await;
    assert_eq!(after.stage, Stage::RegistrationAge);
    assert_eq!(after.pending, before.pending);
}

#[tokio::test]
async fn test_underage_resets_session() {
    let env = TestEnvironment::new().await;

    let replies = env.register("ru", "15").await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, t(Language::Ru, TextKey::Underage));
    let session = env.session().await;
    assert_eq!(session.stage, Stage::ChooseLanguage);
    assert_eq!(session.pending, None);
    assert_eq!(env.store.role(USER).await, Role::Guest);
    assert!(env.appender.rows().is_empty());
}

#[tokio::test]
async fn test_oversized_age_counts_as_adult() {
    let env = TestEnvironment::new().await;

    let replies = env.register("ru", "99999999999999999999").await;

    assert_eq!(replies[0].text, t(Language::Ru, TextKey::Registered));
    assert_eq!(env.session().await.stage, Stage::MemberMenu);
    assert_eq!(env.store.role(USER).await, Role::Member);
}

#[tokio::test]
async fn test_registration_creates_member_and_appends_once() {
    let env = TestEnvironment::new().await;

    let replies = env.register("ru", "22").await;

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].text, t(Language::Ru, TextKey::Registered));
    assert_eq!(replies[1].keyboard, Some(Keyboard::MemberMenu(Language::Ru)));
    assert_eq!(env.session().await.stage, Stage::MemberMenu);
    assert_eq!(env.session().await.pending, None);

    let record = env.store.get(USER).await.unwrap();
    assert_eq!(record.role, Role::Member);
    assert_eq!(record.name.as_deref(), Some("Дана"));
    assert_eq!(record.age, Some(22));
    assert_eq!(record.skill.as_deref(), Some("дизайн"));
    assert!(record.registered_at.is_some());

    let rows = env.appender.wait_for_rows(1).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, USER.to_string());
    assert_eq!(rows[0].username, "volunteer");
    assert_eq!(rows[0].age, 22);
}

#[tokio::test]
async fn test_sheet_failure_does_not_affect_registration() {
    let env = TestEnvironment::builder()
        .appender(RecordingAppender::failing())
        .build()
        .await;

    let replies = env.register("kz", "30").await;

    assert_eq!(replies[0].text, t(Language::Kz, TextKey::Registered));
    assert_eq!(env.store.role(USER).await, Role::Member);
    assert_eq!(env.appender.wait_for_rows(1).await.len(), 1);
}

#[tokio::test]
async fn test_store_failure_aborts_registration() {
    let env = TestEnvironment::builder().unwritable_store().build().await;

    let replies = env.register("ru", "25").await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, t(Language::Ru, TextKey::RegistrationFailed));
    assert_eq!(env.session().await.stage, Stage::ChooseLanguage);
    assert_eq!(env.store.role(USER).await, Role::Guest);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(env.appender.rows().is_empty());
}

#[tokio::test]
async fn test_language_reselection_keeps_member_menu() {
    let env = TestEnvironment::new().await;
    env.register("ru", "40").await;

    env.start().await;
    let replies = env.press("lang:kz").await;

    assert_eq!(replies[0].text, t(Language::Kz, TextKey::IntroMember));
    assert_eq!(replies[0].keyboard, Some(Keyboard::MemberMenu(Language::Kz)));
    assert_eq!(env.store.role(USER).await, Role::Member);
}

// ============================================================================
// Consent policy
// ============================================================================

#[tokio::test]
async fn test_consent_gates_registration() {
    let env = TestEnvironment::builder()
        .settings(EngineSettings {
            consent_required: true,
            ..EngineSettings::default()
        })
        .build()
        .await;
    env.start().await;

    let agreement = env.press("lang:ru").await;
    assert_eq!(agreement[0].text, t(Language::Ru, TextKey::AgreementText));
    assert_eq!(agreement[0].keyboard, Some(Keyboard::Consent(Language::Ru)));
    assert_eq!(env.session().await.stage, Stage::Consent);

    let declined = env.press("agree:no").await;
    assert_eq!(declined[0].text, t(Language::Ru, TextKey::AgreeDeclined));
    assert_eq!(env.store.consent(USER).await, Some(false));

    let refused = env.press("menu:join").await;
    assert_eq!(refused[0].text, t(Language::Ru, TextKey::RegistrationUnavailable));
    assert_eq!(env.session().await.stage, Stage::GuestMenu);

    env.press("agree:yes").await;
    assert_eq!(env.store.consent(USER).await, Some(true));

    env.press("menu:join").await;
    assert_eq!(env.session().await.stage, Stage::RegistrationName);
}

// ============================================================================
// Chat mode
// ============================================================================

#[tokio::test]
async fn test_chat_turn_records_history_and_escapes_reply() {
    let env = TestEnvironment::builder()
        .generator(MockGenerator::replying("QAIYRYM <помогает> семьям & детям"))
        .build()
        .await;
    env.start().await;
    env.press("lang:ru").await;
    let chat = env.press("menu:chat").await;
    assert_eq!(chat[0].text, t(Language::Ru, TextKey::ChatModeOn));
    assert!(env.engine.is_chatting(USER).await);

    let replies = env.say("Расскажи о проекте").await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, "QAIYRYM &lt;помогает&gt; семьям &amp; детям");
    let turns: Vec<(Speaker, String)> = env
        .session()
        .await
        .history
        .iter()
        .map(|turn| (turn.speaker, turn.text.clone()))
        .collect();
    assert_eq!(
        turns,
        vec![
            (Speaker::User, "Расскажи о проекте".to_string()),
            (Speaker::Assistant, "QAIYRYM <помогает> семьям & детям".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_chat_reply_markdown_renders_as_html() {
    let env = TestEnvironment::builder()
        .generator(MockGenerator::replying("*Сбор* в _субботу_ у `QA-7`, 2*3 < 7"))
        .build()
        .await;
    env.enter_chat().await;

    let replies = env.say("Когда следующий сбор?").await;

    assert_eq!(
        replies[0].text,
        "<b>Сбор</b> в <i>субботу</i> у <code>QA-7</code>, 2*3 &lt; 7"
    );
    assert_eq!(
        env.session().await.history.last().map(|t| t.text.clone()),
        Some("*Сбор* в _субботу_ у `QA-7`, 2*3 < 7".to_string())
    );
}

#[tokio::test]
async fn test_noise_is_ignored() {
    let env = TestEnvironment::new().await;
    env.enter_chat().await;

    let replies = env.say("ok").await;

    assert!(replies.is_empty());
    assert!(env.session().await.history.is_empty());
    assert_eq!(env.generator.call_count(), 0);
}

#[tokio::test]
async fn test_timeout_keeps_user_turn() {
    let env = TestEnvironment::builder()
        .generator(MockGenerator::replying("too late").with_delay(Duration::from_secs(2)))
        .timeout(Duration::from_millis(50))
        .build()
        .await;
    env.enter_chat().await;

    let replies = env.say("Как записаться на сбор?").await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, t(Language::Ru, TextKey::ChatTimeout));
    let session = env.session().await;
    assert_eq!(session.history.len(), 1);
    assert_eq!(session.history.last().map(|t| t.text.as_str()), Some("Как записаться на сбор?"));
    assert_eq!(session.stage, Stage::ChatMode);
}

#[tokio::test]
async fn test_invalid_credentials_message_is_distinct() {
    let env = TestEnvironment::builder()
        .generator(MockGenerator::failing(GenerationError::InvalidCredentials(
            "HTTP 403".to_string(),
        )))
        .build()
        .await;
    env.enter_chat().await;

    let replies = env.say("Есть вопрос").await;

    assert_eq!(replies[0].text, t(Language::Ru, TextKey::ChatApiError));
    assert_ne!(replies[0].text, t(Language::Ru, TextKey::ChatFailed));
    assert_eq!(env.generator.call_count(), 1);
}

#[tokio::test]
async fn test_not_found_uses_fallback_model() {
    let env = TestEnvironment::builder()
        .generator(
            MockGenerator::replying("ответ запасной модели")
                .with_model_result("primary", Err(GenerationError::NotFound("gone".to_string()))),
        )
        .build()
        .await;
    env.enter_chat().await;

    let replies = env.say("Что нового?").await;

    assert_eq!(replies[0].text, "ответ запасной модели");
    assert_eq!(env.generator.models(), vec!["primary", "fallback"]);
}

#[tokio::test]
async fn test_prompt_greeting_and_knowledge() {
    let env = TestEnvironment::builder().knowledge("Фонд работает с 2023 года.").build().await;
    env.enter_chat().await;

    env.say("Привет, я Дана").await;
    env.say("Чем можно помочь?").await;

    let requests = env.generator.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].system_instruction.contains(GREETING_ALLOWED));
    assert!(requests[1].system_instruction.contains(GREETING_FORBIDDEN));
    assert!(requests[1]
        .system_instruction
        .ends_with("[CONTEXT_DATA]\nФонд работает с 2023 года.\n[END_CONTEXT_DATA]"));
    assert!(requests[1].prompt.starts_with("🧑 ПОЛЬЗОВАТЕЛЬ: Привет, я Дана"));
}

#[tokio::test]
async fn test_history_is_capped() {
    let env = TestEnvironment::new().await;
    env.enter_chat().await;

    for i in 0..15 {
        env.say(&format!("Вопрос номер {}", i)).await;
        assert!(env.session().await.history.len() <= 20);
    }

    let session = env.session().await;
    assert_eq!(session.history.len(), 20);
    assert_eq!(
        session.history.iter().next().map(|t| t.text.as_str()),
        Some("Вопрос номер 5")
    );
}

#[tokio::test]
async fn test_prompt_holds_every_retained_turn_before_eviction() {
    let env = TestEnvironment::new().await;
    env.enter_chat().await;

    for i in 0..11 {
        env.say(&format!("Вопрос номер {}", i)).await;
    }

    let requests = env.generator.requests();
    assert_eq!(requests.len(), 11);
    let prompt = &requests[10].prompt;
    let turns = prompt.matches("🧑 ПОЛЬЗОВАТЕЛЬ:").count() + prompt.matches("🤖 КОМПАС:").count();
    assert_eq!(turns, 21);
    assert!(prompt.starts_with("🧑 ПОЛЬЗОВАТЕЛЬ: Вопрос номер 0\n"));
    assert_eq!(env.session().await.history.len(), 20);
}

#[tokio::test]
async fn test_sessions_are_per_user() {
    let env = TestEnvironment::new().await;
    env.enter_chat().await;

    let other = compass::conversation::Inbound::new(7, compass::conversation::Event::Start);
    env.engine.handle(other).await;

    assert_eq!(env.session().await.stage, Stage::ChatMode);
    assert_eq!(env.engine.snapshot(7).await.map(|s| s.stage), Some(Stage::ChooseLanguage));
    assert_eq!(env.engine.active_sessions(), 2);
}
