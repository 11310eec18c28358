//! Localized texts for the two supported languages.
//!
//! Strings live in `locales/<lang>/main.ftl` and are addressed through the closed
//! [`TextKey`] enum, so every lookup site is checked by the compiler and the whole
//! table can be validated at startup with [`validate_texts`].

use fluent_templates::{static_loader, Loader};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};
use unic_langid::LanguageIdentifier;

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "ru",
    };
}

/// Raw Fluent sources, used for the completeness check.
const LOCALE_SOURCES: &[(Language, &str)] = &[
    (Language::Ru, include_str!("../locales/ru/main.ftl")),
    (Language::Kz, include_str!("../locales/kk/main.ftl")),
];

static RU: Lazy<LanguageIdentifier> = Lazy::new(|| langid("ru"));
static KK: Lazy<LanguageIdentifier> = Lazy::new(|| langid("kk"));

fn langid(code: &str) -> LanguageIdentifier {
    code.parse().unwrap_or_default()
}

/// Supported interface languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    #[default]
    Ru,
    Kz,
}

impl Language {
    pub const DEFAULT: Language = Language::Ru;

    /// Code used in callback data and in the user store.
    pub fn code(self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::Kz => "kz",
        }
    }

    /// Parses a supported code, accepting regional variants ("ru-RU") and the ISO
    /// code "kk" for Kazakh.
    pub fn from_code(code: &str) -> Option<Language> {
        let normalized = code.trim().split(['-', '_']).next().unwrap_or_default().to_lowercase();
        match normalized.as_str() {
            "ru" => Some(Language::Ru),
            "kz" | "kk" => Some(Language::Kz),
            _ => None,
        }
    }

    /// Like [`Language::from_code`], but falls back to the default language.
    pub fn from_code_or_default(code: &str) -> Language {
        Self::from_code(code).unwrap_or(Self::DEFAULT)
    }

    /// Button label on the language picker.
    pub fn picker_label(self) -> &'static str {
        match self {
            Language::Ru => "Русский 🇷🇺",
            Language::Kz => "Қазақша 🇰🇿",
        }
    }

    fn identifier(self) -> &'static LanguageIdentifier {
        match self {
            Language::Ru => &RU,
            Language::Kz => &KK,
        }
    }
}

impl From<String> for Language {
    fn from(code: String) -> Self {
        Language::from_code_or_default(&code)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}

/// Every message the bot can send. The Fluent id is the kebab-case variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum TextKey {
    ChooseLang,
    AgreementText,
    AgreeYes,
    AgreeNo,
    AgreeAccepted,
    AgreeDeclined,
    RegistrationUnavailable,
    IntroGuest,
    IntroMember,
    About,
    Mission,
    Creator,
    Partners,
    Details,
    AboutMissionButton,
    AboutCreatorButton,
    AboutPartnersButton,
    AboutDetailsButton,
    JoinIntro,
    AskName,
    AskAge,
    AskSkill,
    InvalidAge,
    Underage,
    Registered,
    RegistrationFailed,
    ChatModeOn,
    Instruction,
    ProfileOpen,
    ProfileButton,
    ProfileUnavailable,
    MenuChat,
    MenuAbout,
    MenuJoin,
    MenuInstruction,
    MenuProfile,
    MenuLanding,
    Back,
    UseMenuButtons,
    ChatTimeout,
    ChatApiError,
    ChatFailed,
    BroadcastDenied,
    BroadcastUsage,
    BroadcastNoMembers,
    BroadcastDone,
    BroadcastOk,
    BroadcastFailed,
}

impl TextKey {
    /// Fluent message id.
    pub fn id(self) -> &'static str {
        self.into()
    }
}

/// Returns the localized string for `key`, falling back to the default language.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t(lang: Language, key: TextKey) -> String {
    let id = key.id();
    let text = LOCALES
        .lookup(lang.identifier(), id)
        .or_else(|| LOCALES.lookup(Language::DEFAULT.identifier(), id))
        .unwrap_or_else(|| id.to_string());
    text.replace("\\n", "\n")
}

/// A key missing from one language's source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingText {
    pub key: TextKey,
    pub language: Language,
}

fn defines_message(source: &str, id: &str) -> bool {
    source.lines().any(|line| {
        line.strip_prefix(id)
            .map(|rest| rest.trim_start().starts_with('='))
            .unwrap_or(false)
    })
}

/// Checks that every [`TextKey`] is defined for every [`Language`].
pub fn validate_texts() -> Result<(), Vec<MissingText>> {
    let missing: Vec<MissingText> = LOCALE_SOURCES
        .iter()
        .flat_map(|(language, source)| {
            TextKey::iter()
                .filter(|key| !defines_message(source, key.id()))
                .map(|key| MissingText {
                    key,
                    language: *language,
                })
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}

/// Number of (key, language) pairs in the table.
pub fn table_size() -> usize {
    TextKey::iter().count() * Language::iter().count()
}
