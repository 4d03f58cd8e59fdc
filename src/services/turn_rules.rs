//! Turn classifier: decides from the latest utterance whether the human
//! participant holds the floor next.
//!
//! Turn-taking is encoded implicitly in the stage directions the backend
//! produces ("Defensa, tiene la palabra"), not in a machine-readable
//! signal, so the classifier is a permissive lowercase substring match
//! against a phrase table. The table is data: extend it through
//! configuration, replace this type entirely if the backend ever emits an
//! explicit end-of-turn marker.

use crate::domain::models::TurnRulesConfig;

/// Built-in fragments that hand the floor to the defense.
const DEFAULT_HANDOFF_PHRASES: &[&str] = &[
    "defensa, después será su turno",
    "defensa, proceda",
    "abogado, proceda",
    "defensa, tiene la palabra",
    "abogado de la defensa",
    "su turno, defensa",
    "defensa, puede",
    "abogado, puede",
    "defensa?",
    "abogado?",
    "defensa, adelante",
    "abogado, adelante",
];

/// The phrase table behind the turn heuristic.
#[derive(Debug, Clone)]
pub struct TurnRules {
    phrases: Vec<String>,
}

impl Default for TurnRules {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_HANDOFF_PHRASES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

impl TurnRules {
    /// Build the table from the defaults plus configured extras.
    pub fn from_config(config: &TurnRulesConfig) -> Self {
        let mut rules = Self::default();
        rules
            .phrases
            .extend(config.extra_phrases.iter().map(|p| p.to_lowercase()));
        rules
    }

    /// True if the latest utterance hands the floor to the human.
    ///
    /// Pure and case-insensitive: the same text always classifies the
    /// same way.
    pub fn classify(&self, latest_text: &str) -> bool {
        let lower = latest_text.to_lowercase();
        self.phrases.iter().any(|phrase| lower.contains(phrase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handoff_to_defense_is_human_turn() {
        let rules = TurnRules::default();
        assert!(rules.classify("Defensa, tiene la palabra para sus alegatos."));
    }

    #[test]
    fn test_prosecutor_action_is_not_human_turn() {
        let rules = TurnRules::default();
        assert!(!rules.classify("El fiscal presentará su siguiente prueba."));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let rules = TurnRules::default();
        assert!(rules.classify("DEFENSA, PROCEDA."));
        assert!(rules.classify("defensa, proceda."));
    }

    #[test]
    fn test_classify_is_deterministic() {
        let rules = TurnRules::default();
        let text = "[Juez] Abogado, puede interrogar al testigo.";
        let first = rules.classify(text);
        for _ in 0..10 {
            assert_eq!(rules.classify(text), first);
        }
    }

    #[test]
    fn test_question_to_defense_counts_as_handoff() {
        let rules = TurnRules::default();
        assert!(rules.classify("[Juez] ¿Tiene más preguntas, defensa?"));
    }

    #[test]
    fn test_extra_phrases_from_config() {
        let config = TurnRulesConfig {
            extra_phrases: vec!["Licenciado, Adelante".to_string()],
        };
        let rules = TurnRules::from_config(&config);
        assert!(rules.classify("[Juez] Licenciado, adelante con su alegato."));
    }
}
