//! Inline keyboard layouts.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};

use crate::conversation::{AboutTopic, Action, Keyboard, MenuItem};
use crate::i18n::{t, Language, TextKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonKind {
    Callback(String),
    WebApp(String),
}

/// Transport-neutral button description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
    pub label: String,
    pub kind: ButtonKind,
}

impl ButtonSpec {
    fn action(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            kind: ButtonKind::Callback(action.callback_data()),
        }
    }

    fn web_app(label: impl Into<String>, url: &str) -> Self {
        Self {
            label: label.into(),
            kind: ButtonKind::WebApp(url.to_string()),
        }
    }
}

fn menu_row(language: Language, key: TextKey, item: MenuItem) -> Vec<ButtonSpec> {
    vec![ButtonSpec::action(t(language, key), Action::Menu(item))]
}

/// Rows of buttons for a keyboard.
pub fn layout(keyboard: &Keyboard) -> Vec<Vec<ButtonSpec>> {
    match keyboard {
        Keyboard::LanguagePicker => vec![vec![
            ButtonSpec::action(Language::Kz.picker_label(), Action::Language(Language::Kz)),
            ButtonSpec::action(Language::Ru.picker_label(), Action::Language(Language::Ru)),
        ]],
        Keyboard::Consent(lang) => vec![vec![
            ButtonSpec::action(t(*lang, TextKey::AgreeYes), Action::Consent(true)),
            ButtonSpec::action(t(*lang, TextKey::AgreeNo), Action::Consent(false)),
        ]],
        Keyboard::GuestMenu(lang) => vec![
            menu_row(*lang, TextKey::MenuChat, MenuItem::Chat),
            menu_row(*lang, TextKey::MenuAbout, MenuItem::About),
            menu_row(*lang, TextKey::MenuJoin, MenuItem::Join),
        ],
        Keyboard::MemberMenu(lang) => vec![
            menu_row(*lang, TextKey::MenuChat, MenuItem::Chat),
            menu_row(*lang, TextKey::MenuAbout, MenuItem::About),
            menu_row(*lang, TextKey::MenuInstruction, MenuItem::Instruction),
            menu_row(*lang, TextKey::MenuProfile, MenuItem::Profile),
        ],
        Keyboard::About { language, landing_url } => {
            let topics = [
                (TextKey::AboutMissionButton, AboutTopic::Mission),
                (TextKey::AboutCreatorButton, AboutTopic::Creator),
                (TextKey::AboutPartnersButton, AboutTopic::Partners),
                (TextKey::AboutDetailsButton, AboutTopic::Details),
            ];
            let mut rows: Vec<Vec<ButtonSpec>> = topics
                .into_iter()
                .map(|(key, topic)| vec![ButtonSpec::action(t(*language, key), Action::About(topic))])
                .collect();
            if let Some(url) = landing_url {
                rows.push(vec![ButtonSpec::web_app(t(*language, TextKey::MenuLanding), url)]);
            }
            rows.push(menu_row(*language, TextKey::Back, MenuItem::BackToMain));
            rows
        }
        Keyboard::MiniApp { language, url } => {
            vec![vec![ButtonSpec::web_app(t(*language, TextKey::ProfileButton), url)]]
        }
    }
}

fn to_button(spec: ButtonSpec) -> Option<InlineKeyboardButton> {
    match spec.kind {
        ButtonKind::Callback(data) => Some(InlineKeyboardButton::callback(spec.label, data)),
        ButtonKind::WebApp(raw) => match url::Url::parse(&raw) {
            Ok(url) => Some(InlineKeyboardButton::web_app(spec.label, WebAppInfo { url })),
            Err(e) => {
                log::warn!("Skipping web app button with invalid URL {}: {}", raw, e);
                None
            }
        },
    }
}

/// Renders a keyboard as Telegram inline markup. Buttons with unusable URLs are dropped.
pub fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = layout(keyboard)
        .into_iter()
        .map(|row| row.into_iter().filter_map(to_button).collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();
    InlineKeyboardMarkup::new(rows)
}
