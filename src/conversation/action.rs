//! Typed callback data of inline buttons.

use std::str::FromStr;

use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::i18n::Language;

/// Main menu entries (`menu:<item>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum MenuItem {
    Chat,
    About,
    Join,
    Instruction,
    Profile,
    BackToMain,
}

/// About submenu topics (`about:<topic>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum AboutTopic {
    Mission,
    Creator,
    Partners,
    Details,
}

/// A button press the conversation understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Language(Language),
    Consent(bool),
    Menu(MenuItem),
    About(AboutTopic),
}

impl Action {
    /// Parses callback data such as `lang:kz` or `menu:back_to_main`.
    /// Anything unknown yields `None`.
    pub fn parse(data: &str) -> Option<Action> {
        let (prefix, value) = data.split_once(':')?;
        match prefix {
            "lang" => match value {
                "ru" => Some(Action::Language(Language::Ru)),
                "kz" => Some(Action::Language(Language::Kz)),
                _ => None,
            },
            "agree" => match value {
                "yes" => Some(Action::Consent(true)),
                "no" => Some(Action::Consent(false)),
                _ => None,
            },
            "menu" => MenuItem::from_str(value).ok().map(Action::Menu),
            "about" => AboutTopic::from_str(value).ok().map(Action::About),
            _ => None,
        }
    }

    /// Callback data for this action; inverse of [`Action::parse`].
    pub fn callback_data(self) -> String {
        match self {
            Action::Language(lang) => format!("lang:{}", lang.code()),
            Action::Consent(true) => "agree:yes".to_string(),
            Action::Consent(false) => "agree:no".to_string(),
            Action::Menu(item) => format!("menu:{}", <&'static str>::from(item)),
            Action::About(topic) => format!("about:{}", <&'static str>::from(topic)),
        }
    }
}
