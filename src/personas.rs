//! Persona registry
//!
//! The set of personas is fixed at build time. Unknown names are never
//! rejected; they simply get the generic style.

/// Style used for any persona name not in the registry.
pub const FALLBACK_STYLE: &str = "friendly and supportive";

/// A named character with a fixed style descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub name: &'static str,
    pub style: &'static str,
}

const PERSONAS: &[Persona] = &[
    Persona {
        name: "Lucy",
        style: "gentle, sweet, comforting, soft-spoken, timid, welcoming, patient, good listener 💕",
    },
    Persona {
        name: "Suzanne",
        style: "funny, silly, playful, comforting, jovial, empathetic, lighthearted, witty 😂",
    },
    Persona {
        name: "Lexi",
        style: "wise, thoughtful, smart, decisive, self-aware, articulate, logical  🌿",
    },
    Persona {
        name: "Roxy",
        style: "bold, confident, badass, girl's girl, supportive, courageous, outgoing 🔥",
    },
];

/// Look up a configured persona by exact name.
pub fn find(name: &str) -> Option<&'static Persona> {
    PERSONAS.iter().find(|p| p.name == name)
}

/// Style descriptor for `name`, or the fallback for unknown personas.
pub fn style_for(name: &str) -> &'static str {
    find(name).map(|p| p.style).unwrap_or(FALLBACK_STYLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_persona_style() {
        assert!(style_for("Lucy").starts_with("gentle"));
        assert!(style_for("Roxy").contains("bold"));
    }

    #[test]
    fn test_unknown_persona_falls_back() {
        assert!(find("Zed").is_none());
        assert_eq!(style_for("Zed"), FALLBACK_STYLE);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert_eq!(style_for("lucy"), FALLBACK_STYLE);
    }

    #[test]
    fn test_registry_names_unique() {
        let names: std::collections::HashSet<_> = PERSONAS.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), PERSONAS.len());
    }

    #[test]
    fn test_style_text_is_verbatim() {
        // Styles are embedded in the prompt unchanged, spacing included.
        assert_eq!(
            style_for("Lexi"),
            "wise, thoughtful, smart, decisive, self-aware, articulate, logical  🌿"
        );
    }
}
