//! Supported target languages and their built-in practice phrases

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A language the learner can practice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    Spanish,
    French,
    German,
    Japanese,
    Italian,
}

impl Language {
    /// All supported languages, in menu order
    pub const ALL: [Self; 5] = [
        Self::Spanish,
        Self::French,
        Self::German,
        Self::Japanese,
        Self::Italian,
    ];

    /// Human-readable name (e.g. "Spanish")
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Spanish => "Spanish",
            Self::French => "French",
            Self::German => "German",
            Self::Japanese => "Japanese",
            Self::Italian => "Italian",
        }
    }

    /// Target language code for the `DeepL` API (e.g. "ES")
    #[must_use]
    pub const fn deepl_code(self) -> &'static str {
        match self {
            Self::Spanish => "ES",
            Self::French => "FR",
            Self::German => "DE",
            Self::Japanese => "JA",
            Self::Italian => "IT",
        }
    }

    /// ISO 639-1 code used for speech synthesis and recognition hints
    #[must_use]
    pub const fn speech_code(self) -> &'static str {
        match self {
            Self::Spanish => "es",
            Self::French => "fr",
            Self::German => "de",
            Self::Japanese => "ja",
            Self::Italian => "it",
        }
    }

    /// Built-in practice phrases for this language
    #[must_use]
    pub const fn phrases(self) -> &'static [&'static str] {
        match self {
            Self::Spanish => &[
                "Buenos días, ¿cómo estás?",
                "Me gustaría un café, por favor",
                "¿Dónde está la estación de tren?",
                "Muchas gracias por tu ayuda",
                "¿Qué hora es?",
                "La comida está muy rica",
            ],
            Self::French => &[
                "Bonjour, comment allez-vous?",
                "Je voudrais un café, s'il vous plaît",
                "Où est la gare?",
                "Merci beaucoup pour votre aide",
                "Quelle heure est-il?",
                "La nourriture est très bonne",
            ],
            Self::German => &[
                "Guten Tag, wie geht es Ihnen?",
                "Ich hätte gerne einen Kaffee, bitte",
                "Wo ist der Bahnhof?",
                "Vielen Dank für Ihre Hilfe",
                "Wie spät ist es?",
                "Das Essen ist sehr lecker",
            ],
            Self::Japanese => &[
                "こんにちは、お元気ですか？",
                "コーヒーをください",
                "駅はどこですか？",
                "ご協力ありがとうございます",
                "今何時ですか？",
                "食べ物はとても美味しいです",
            ],
            Self::Italian => &[
                "Buongiorno, come stai?",
                "Vorrei un caffè, per favore",
                "Dov'è la stazione ferroviaria?",
                "Grazie mille per il tuo aiuto",
                "Che ora è?",
                "Il cibo è molto buono",
            ],
        }
    }

    /// Look up a language by name, falling back to Spanish
    #[must_use]
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = Error;

    /// Accepts the display name or either code, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|lang| {
                lang.name().eq_ignore_ascii_case(needle)
                    || lang.deepl_code().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| Error::UnknownLanguage(s.to_string()))
    }
}

/// A phrase in a target language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    pub text: String,
    pub language: Language,
}

impl Phrase {
    #[must_use]
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            language,
        }
    }
}

impl fmt::Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_language_has_six_phrases() {
        for lang in Language::ALL {
            assert_eq!(lang.phrases().len(), 6, "{lang}");
        }
    }

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("spanish".parse::<Language>().unwrap(), Language::Spanish);
        assert_eq!("JA".parse::<Language>().unwrap(), Language::Japanese);
        assert_eq!(" German ".parse::<Language>().unwrap(), Language::German);
        assert!("Klingon".parse::<Language>().is_err());
    }

    #[test]
    fn unknown_name_falls_back_to_spanish() {
        assert_eq!(Language::from_name_or_default("Klingon"), Language::Spanish);
    }

    #[test]
    fn codes_are_consistent() {
        for lang in Language::ALL {
            assert_eq!(lang.deepl_code().to_lowercase(), lang.speech_code());
        }
    }
}
