//! Tone and format presets applied to the assistant's responses.
//!
//! Both are closed enumerations. Resolution from the free-form strings sent
//! by clients never fails: unknown values fall back to the default variant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Persona the assistant adopts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Candid,
}

impl Tone {
    /// Resolve a client-supplied choice, defaulting to `Professional`.
    pub fn from_choice(choice: &str) -> Self {
        match choice.trim().to_lowercase().as_str() {
            "professional" => Tone::Professional,
            "friendly" => Tone::Friendly,
            "candid" | "roast" => Tone::Candid,
            _ => Tone::default(),
        }
    }

    /// Instruction sentence injected into the system prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Tone::Professional => {
                "Act as a strict, objective, and highly professional accountant. Focus strictly on numbers and facts."
            }
            Tone::Friendly => {
                "Act as a friendly, encouraging financial advisor. Use simple terms and occasionally use emojis."
            }
            Tone::Candid => {
                "Act as a brutally honest and sarcastic financial critic. Lightly mock bad spending habits, but provide accurate data."
            }
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tone::Professional => write!(f, "professional"),
            Tone::Friendly => write!(f, "friendly"),
            Tone::Candid => write!(f, "candid"),
        }
    }
}

/// Layout of the assistant's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Prose,
    Bullet,
    Tabular,
}

impl ResponseFormat {
    /// Resolve a client-supplied choice, defaulting to `Prose`.
    pub fn from_choice(choice: &str) -> Self {
        match choice.trim().to_lowercase().as_str() {
            "prose" | "text" => ResponseFormat::Prose,
            "bullet" | "bullets" => ResponseFormat::Bullet,
            "tabular" | "table" => ResponseFormat::Tabular,
            _ => ResponseFormat::default(),
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            ResponseFormat::Prose => "Answer using natural, conversational paragraphs.",
            ResponseFormat::Bullet => {
                "Always structure your answer using concise bullet points for maximum readability."
            }
            ResponseFormat::Tabular => {
                "Whenever comparing numbers, categories, or dates, format your output as a Markdown table."
            }
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFormat::Prose => write!(f, "prose"),
            ResponseFormat::Bullet => write!(f, "bullet"),
            ResponseFormat::Tabular => write!(f, "tabular"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_from_choice() {
        assert_eq!(Tone::from_choice("friendly"), Tone::Friendly);
        assert_eq!(Tone::from_choice("  Candid "), Tone::Candid);
        assert_eq!(Tone::from_choice("roast"), Tone::Candid);
        assert_eq!(Tone::from_choice("pirate"), Tone::Professional);
        assert_eq!(Tone::from_choice(""), Tone::Professional);
    }

    #[test]
    fn test_format_from_choice() {
        assert_eq!(ResponseFormat::from_choice("text"), ResponseFormat::Prose);
        assert_eq!(ResponseFormat::from_choice("bullet"), ResponseFormat::Bullet);
        assert_eq!(ResponseFormat::from_choice("table"), ResponseFormat::Tabular);
        assert_eq!(ResponseFormat::from_choice("haiku"), ResponseFormat::Prose);
    }

    #[test]
    fn test_display_roundtrips_through_from_choice() {
        for tone in [Tone::Professional, Tone::Friendly, Tone::Candid] {
            assert_eq!(Tone::from_choice(&tone.to_string()), tone);
        }
        for format in [
            ResponseFormat::Prose,
            ResponseFormat::Bullet,
            ResponseFormat::Tabular,
        ] {
            assert_eq!(ResponseFormat::from_choice(&format.to_string()), format);
        }
    }
}
