use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    SelfAwareness,
    EmotionalRegulation,
    Communication,
    Resilience,
    Motivation,
    Empathy,
    Focus,
    WorkLifeBalance,
    General,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::SelfAwareness,
        Category::EmotionalRegulation,
        Category::Communication,
        Category::Resilience,
        Category::Motivation,
        Category::Empathy,
        Category::Focus,
        Category::WorkLifeBalance,
        Category::General,
    ];

    /// Unrecognized codes fall back to `General`.
    pub fn from_code(code: &str) -> Self {
        match normalize_code(code).as_str() {
            "self_awareness" => Category::SelfAwareness,
            "emotional_regulation" => Category::EmotionalRegulation,
            "communication" => Category::Communication,
            "resilience" => Category::Resilience,
            "motivation" => Category::Motivation,
            "empathy" => Category::Empathy,
            "focus" => Category::Focus,
            "work_life_balance" => Category::WorkLifeBalance,
            "general" => Category::General,
            other => {
                tracing::debug!(code = other, "unknown category code, using general label");
                Category::General
            }
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::SelfAwareness => "self_awareness",
            Category::EmotionalRegulation => "emotional_regulation",
            Category::Communication => "communication",
            Category::Resilience => "resilience",
            Category::Motivation => "motivation",
            Category::Empathy => "empathy",
            Category::Focus => "focus",
            Category::WorkLifeBalance => "work_life_balance",
            Category::General => "general",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::SelfAwareness => "Self-awareness",
            Category::EmotionalRegulation => "Emotional regulation",
            Category::Communication => "Communication",
            Category::Resilience => "Resilience",
            Category::Motivation => "Motivation",
            Category::Empathy => "Empathy",
            Category::Focus => "Focus",
            Category::WorkLifeBalance => "Work-life balance",
            Category::General => "General wellbeing",
        }
    }
}

/// Canonical form of a stored category code, used as the grouping key.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
