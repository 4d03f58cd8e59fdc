//! Role-tag parser: splits one generated text blob into per-speaker turns.
//!
//! The backend marks speaker changes with a `[Label]` tag embedded in its
//! prose. A label is letters (accented Latin included), spaces, and
//! hyphens; the first `]` closes it. Text before the first tag is
//! preamble and is dropped. A tag's utterance runs to the start of the
//! next tag or the end of the blob; empty bodies are discarded. If the
//! blob carries no tag at all, the whole trimmed text becomes a single
//! untagged utterance. Malformed input never fails, it degrades.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::models::Utterance;

static ROLE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    // Matches "[Juez]", "[Juez Laboral]", "[Jorge Ramírez - Testigo]".
    Regex::new(r"\[([\p{Alphabetic}][\p{Alphabetic} \-]*)\]").expect("role tag pattern is valid")
});

/// The label of the tag the text starts with, if any.
pub fn leading_label(text: &str) -> Option<String> {
    ROLE_TAG
        .captures(text)
        .filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0))
        .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

/// Split a raw generated blob into attributed utterances.
///
/// Each retained utterance keeps its own `[label]` prefix so display and
/// re-submission to the backend stay self-describing. An all-whitespace
/// blob yields no utterances.
pub fn parse(raw: &str) -> Vec<Utterance> {
    let tags: Vec<(std::ops::Range<usize>, &str)> = ROLE_TAG
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps.get(1)?;
            Some((whole.range(), label.as_str()))
        })
        .collect();

    if tags.is_empty() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![Utterance::generated(None, trimmed)];
    }

    let mut utterances = Vec::with_capacity(tags.len());
    for (i, (span, label)) in tags.iter().enumerate() {
        let body_start = span.end;
        let body_end = tags.get(i + 1).map_or(raw.len(), |(next, _)| next.start);
        let body = raw[body_start..body_end].trim();

        if body.is_empty() {
            continue;
        }

        utterances.push(Utterance::generated(
            Some(label.to_string()),
            format!("[{label}] {body}"),
        ));
    }

    utterances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ParticipantRole;
    use proptest::prelude::*;

    #[test]
    fn test_two_tagged_speakers() {
        let parsed = parse("[Juez] Buenos días. [Fiscal] Llamo a mi testigo.");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].speaker_label.as_deref(), Some("Juez"));
        assert_eq!(parsed[0].text, "[Juez] Buenos días.");
        assert_eq!(parsed[1].speaker_label.as_deref(), Some("Fiscal"));
        assert_eq!(parsed[1].text, "[Fiscal] Llamo a mi testigo.");
    }

    #[test]
    fn test_untagged_blob_is_single_utterance() {
        let parsed = parse("Continuamos con el juicio.");
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].speaker_label.is_none());
        assert_eq!(parsed[0].text, "Continuamos con el juicio.");
    }

    #[test]
    fn test_preamble_before_first_tag_is_dropped() {
        let parsed = parse("pensando...\n[Juez] Silencio en la sala.");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "[Juez] Silencio en la sala.");
    }

    #[test]
    fn test_adjacent_tags_discard_empty_body() {
        let parsed = parse("[Juez][Fiscal] Procedo con la prueba.");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].speaker_label.as_deref(), Some("Fiscal"));
    }

    #[test]
    fn test_hyphenated_descriptor_label_is_one_label() {
        let parsed = parse("[Jorge Ramírez - Testigo] Vi al acusado entrar.");
        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed[0].speaker_label.as_deref(),
            Some("Jorge Ramírez - Testigo")
        );
        assert_eq!(parsed[0].role, ParticipantRole::Witness);
    }

    #[test]
    fn test_accented_label() {
        let parsed = parse("[Perito Médico] El informe es concluyente.");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].speaker_label.as_deref(), Some("Perito Médico"));
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        assert!(parse("   \n\t ").is_empty());
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_leading_label() {
        assert_eq!(leading_label("[Juez] Orden.").as_deref(), Some("Juez"));
        assert_eq!(leading_label("Sin etiqueta [Juez] tardía."), None);
        assert_eq!(leading_label("texto plano"), None);
    }

    #[test]
    fn test_body_whitespace_is_trimmed() {
        let parsed = parse("[Juez]   Orden en la sala.   ");
        assert_eq!(parsed[0].text, "[Juez] Orden en la sala.");
    }

    #[test]
    fn test_utterance_text_never_empty() {
        for raw in ["[Juez]", "[Juez] ", "[Juez][Fiscal][Testigo]"] {
            assert!(parse(raw).is_empty(), "raw {raw:?} should parse to nothing");
        }
    }

    fn label_strategy() -> impl Strategy<Value = String> {
        // Labels as the backend produces them: words of Latin letters
        // joined by single spaces.
        proptest::collection::vec("[A-Za-zÁÉÍÓÚÑáéíóúñ]{2,8}", 1..3)
            .prop_map(|words| words.join(" "))
    }

    fn body_strategy() -> impl Strategy<Value = String> {
        // Bodies free of brackets so the tag count is exactly the number
        // of generated segments.
        "[a-z0-9 ,\\.]{1,40}".prop_filter("non-empty after trim", |s| !s.trim().is_empty())
    }

    proptest! {
        // N well-formed tags with non-empty bodies parse to exactly N
        // utterances, in source order, labels and trimmed bodies matching.
        #[test]
        fn prop_well_formed_tags_parse_completely(
            segments in proptest::collection::vec((label_strategy(), body_strategy()), 1..6)
        ) {
            let raw: String = segments
                .iter()
                .map(|(label, body)| format!("[{label}] {body} "))
                .collect();

            let parsed = parse(&raw);
            prop_assert_eq!(parsed.len(), segments.len());
            for (utterance, (label, body)) in parsed.iter().zip(&segments) {
                prop_assert_eq!(utterance.speaker_label.as_deref(), Some(label.as_str()));
                prop_assert_eq!(&utterance.text, &format!("[{label}] {}", body.trim()));
            }
        }

        // Tag-free input yields one untagged utterance with the trimmed
        // input as its text.
        #[test]
        fn prop_untagged_input_degrades_to_single_utterance(raw in "[a-zA-Z0-9 ,\\.\\n]{1,200}") {
            prop_assume!(!raw.trim().is_empty());
            let parsed = parse(&raw);
            prop_assert_eq!(parsed.len(), 1);
            prop_assert!(parsed[0].speaker_label.is_none());
            prop_assert_eq!(&parsed[0].text, raw.trim());
        }

        // Interleaved empty-bodied tags contribute no utterances.
        #[test]
        fn prop_empty_bodies_are_discarded(
            segments in proptest::collection::vec((label_strategy(), body_strategy()), 1..4),
            empties in proptest::collection::vec(label_strategy(), 1..4)
        ) {
            let mut raw = String::new();
            for label in &empties {
                raw.push_str(&format!("[{label}]"));
            }
            for (label, body) in &segments {
                raw.push_str(&format!("[{label}] {body} "));
            }

            let parsed = parse(&raw);
            prop_assert_eq!(parsed.len(), segments.len());
        }
    }
}
