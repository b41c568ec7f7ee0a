// Tests for conversation transcript parsing and speaker attribution.

use voznota::conversation::{
    distinct_speakers, is_multi_speaker, parse, present_speaker_count, speaker_color, summarize,
    SPEAKER_PALETTE,
};

#[test]
fn plain_text_is_not_a_conversation() {
    assert!(!is_multi_speaker("Hello, how are you?"));
}

#[test]
fn labeled_lines_are_a_conversation() {
    assert!(is_multi_speaker("Ana: hola\nLuis: bien"));
}

#[test]
fn parses_labeled_and_continuation_lines() {
    let turns = parse("Ana: hola\nLuis: muy bien\n(pause)");

    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0].speaker.as_deref(), Some("Ana"));
    assert_eq!(turns[0].content, "hola");
    assert_eq!(turns[1].speaker.as_deref(), Some("Luis"));
    assert_eq!(turns[1].content, "muy bien");
    assert!(turns[2].speaker.is_none());
    assert!(turns[2].is_continuation());
    assert_eq!(turns[2].content, "(pause)");
}

#[test]
fn blank_lines_are_dropped() {
    let turns = parse("Ana: hola\n\n   \nLuis: bien");
    assert_eq!(turns.len(), 2);
}

#[test]
fn turns_with_empty_content_are_dropped() {
    // "Ana:" with nothing after the colon carries no utterance
    let turns = parse("Ana:\nLuis: bien");
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].speaker.as_deref(), Some("Luis"));
}

#[test]
fn label_is_everything_before_the_first_colon() {
    let turns = parse("Speaker 2: it was 10:30 already");
    assert_eq!(turns[0].speaker.as_deref(), Some("Speaker 2"));
    assert_eq!(turns[0].content, "it was 10:30 already");
}

#[test]
fn speaker_identity_is_case_insensitive() {
    let turns = parse("ANA: hi\nana: again");
    let speakers = distinct_speakers(&turns);

    assert_eq!(speakers.len(), 1);
    // First-seen casing is kept for display
    assert_eq!(speakers[0], "ANA");
}

#[test]
fn speakers_are_ordered_by_first_appearance() {
    let turns = parse("Luis: first\nAna: second\nLuis: third");
    assert_eq!(distinct_speakers(&turns), vec!["Luis", "Ana"]);
}

#[test]
fn summary_counts_distinct_speakers() {
    let turns = parse("Ana: hola\nLuis: bien\n(ruido)\nana: sigo");
    let summary = summarize(&turns);

    assert_eq!(summary.speaker_count, 2);
    assert_eq!(summary.speakers, vec!["Ana", "Luis"]);
}

#[test]
fn palette_cycles_past_its_length() {
    assert_eq!(speaker_color(0), SPEAKER_PALETTE[0]);
    assert_eq!(speaker_color(SPEAKER_PALETTE.len()), SPEAKER_PALETTE[0]);
    assert_eq!(speaker_color(SPEAKER_PALETTE.len() + 2), SPEAKER_PALETTE[2]);
}

#[test]
fn present_count_matches_configured_labels_case_insensitively() {
    let labels = vec![
        "Ana".to_string(),
        "Luis".to_string(),
        "Pedro".to_string(),
    ];
    let text = "ana: hola\nLUIS: que tal";

    assert_eq!(present_speaker_count(text, &labels), 2);
}

#[test]
fn present_count_is_zero_for_plain_text() {
    let labels = vec!["Speaker 1".to_string(), "Speaker 2".to_string()];
    assert_eq!(present_speaker_count("just one voice talking", &labels), 0);
}
