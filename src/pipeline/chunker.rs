//! Splits outbound text into transport-sized chunks.

/// Split `text` into chunks of at most `max_len` characters without breaking
/// lines.
///
/// Greedy single-pass packer: lines accumulate into the current chunk while
/// they fit (counting the joining newline); the first line that would
/// overflow starts a new chunk. A single line longer than `max_len` is
/// emitted as its own oversized chunk. Joining the chunks with `\n`
/// reproduces the original line sequence. Empty input produces no chunks.
pub fn split_into_chunks(text: &str, max_len: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;
    let mut current_has_lines = false;

    for line in text.split('\n') {
        let line_chars = line.chars().count();

        if !current_has_lines {
            current.push_str(line);
            current_chars = line_chars;
            current_has_lines = true;
        } else if current_chars + line_chars + 1 <= max_len {
            current.push('\n');
            current.push_str(line);
            current_chars += line_chars + 1;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(line);
            current_chars = line_chars;
        }
    }

    chunks.push(current);
    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
