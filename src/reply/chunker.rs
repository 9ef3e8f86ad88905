//! Word-boundary chunking of outbound text.

/// Split `text` into chunks of at most `max_len` bytes.
///
/// Words are separated by single spaces inside a chunk and never split when
/// they fit in `max_len`. Runs of whitespace (including newlines) collapse to
/// one space. A word longer than `max_len` is cut at character boundaries so
/// that every chunk still respects the limit; the only exception is a single
/// character wider than `max_len`, which is emitted alone.
///
/// Returns no chunks for whitespace-only input or a zero limit.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    if max_len == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        for piece in split_long_word(word, max_len) {
            let needed = if current.is_empty() {
                piece.len()
            } else {
                current.len().saturating_add(1).saturating_add(piece.len())
            };
            if needed > max_len && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(piece);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_long_word(word: &str, max_len: usize) -> Vec<&str> {
    if word.len() <= max_len {
        return vec![word];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, ch) in word.char_indices() {
        let end = idx.saturating_add(ch.len_utf8());
        if end.saturating_sub(start) > max_len && idx > start {
            pieces.push(&word[start..idx]);
            start = idx;
        }
    }
    if start < word.len() {
        pieces.push(&word[start..]);
    }
    pieces
}
