//! Word-boundary chunking tests.

use mesh_commander::reply::chunk_text;

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod \
tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud \
exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.";

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

#[test]
fn short_message_is_one_trimmed_chunk() {
    assert_eq!(chunk_text("  hello mesh  ", 200), vec!["hello mesh"]);
}

#[test]
fn message_exactly_at_limit_is_one_chunk() {
    let text = "a".repeat(200);
    assert_eq!(chunk_text(&text, 200), vec![text.clone()]);
}

#[test]
fn rejoining_chunks_preserves_word_sequence() {
    for size in [12, 20, 33, 64, 200] {
        let chunks = chunk_text(LOREM, size);
        assert!(chunks.iter().all(|c| c.len() <= size), "size {size}: {chunks:?}");
        assert_eq!(words(&chunks.join(" ")), words(LOREM), "size {size}");
    }
}

#[test]
fn words_are_not_broken_when_they_fit() {
    let chunks = chunk_text(LOREM, 20);
    let original: Vec<&str> = words(LOREM);
    for chunk in &chunks {
        for word in chunk.split(' ') {
            assert!(original.contains(&word), "{word:?} was split");
        }
    }
}

#[test]
fn chunks_are_greedily_filled() {
    assert_eq!(
        chunk_text("aaa bbb ccc ddd", 7),
        vec!["aaa bbb", "ccc ddd"]
    );
    assert_eq!(chunk_text("aaa bbb ccc ddd", 8), vec!["aaa bbb", "ccc ddd"]);
    assert_eq!(chunk_text("aaa bbb ccc ddd", 11), vec!["aaa bbb ccc", "ddd"]);
}

#[test]
fn newlines_and_runs_of_spaces_collapse() {
    assert_eq!(
        chunk_text("line one\nline two\n\n  line   three", 200),
        vec!["line one line two line three"]
    );
}

#[test]
fn overlong_word_is_cut_to_fit() {
    let token = "x".repeat(25);
    let chunks = chunk_text(&format!("id {token} end"), 10);
    assert!(chunks.iter().all(|c| c.len() <= 10), "{chunks:?}");
    assert_eq!(chunks.concat().replace(' ', ""), format!("id{token}end"));
}

#[test]
fn six_hundred_fifty_characters_make_four_chunks() {
    let mut parts = vec!["abcdefghi"; 64];
    parts.push("abcdefghij");
    let text = parts.join(" ");
    assert_eq!(text.len(), 650);

    let chunks = chunk_text(&text, 200);
    assert_eq!(chunks.len(), 4);
    assert!(chunks.iter().all(|c| c.len() <= 200));
    assert_eq!(chunks.join(" "), text);
}

#[test]
fn multibyte_text_respects_byte_limit() {
    let text = "héllo wörld ñandú ça va très bien merci";
    let chunks = chunk_text(text, 12);
    assert!(chunks.iter().all(|c| c.len() <= 12), "{chunks:?}");
    assert_eq!(words(&chunks.join(" ")), words(text));
}

#[test]
fn empty_input_and_zero_limit_yield_nothing() {
    assert!(chunk_text("", 200).is_empty());
    assert!(chunk_text(" \n\t ", 200).is_empty());
    assert!(chunk_text("hello", 0).is_empty());
}
