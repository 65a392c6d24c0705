// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text minification for markup (HTML/XHTML) and stylesheets (CSS).

use std::sync::LazyLock;

use kompakt_core::error::AssetError;
use regex::Regex;

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

/// Elements whose whitespace is significant.
static PRESERVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
    )
    .expect("preserved-block pattern is valid")
});

/// HTML whitespace only; U+00A0 and friends are content.
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\n\x0C]+").expect("whitespace pattern is valid"));

static BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"> <").expect("inter-tag pattern is valid"));

/// Strip comments, collapse whitespace runs, and drop whitespace between tags.
///
/// Content of `pre`, `textarea`, `script`, and `style` elements is copied
/// verbatim.
pub fn minify_markup(source: &[u8]) -> Result<Vec<u8>, AssetError> {
    let source = std::str::from_utf8(source)
        .map_err(|err| AssetError::Transcode(format!("markup is not UTF-8: {}", err)))?;

    let without_comments = COMMENT.replace_all(source, "");
    if without_comments.contains("<!--") {
        return Err(AssetError::Transcode("unterminated comment".into()));
    }
    if without_comments.rfind('<') > without_comments.rfind('>') {
        return Err(AssetError::Transcode("unterminated tag".into()));
    }

    let text = without_comments.as_ref();
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    for block in PRESERVED.find_iter(text) {
        output.push_str(&collapse(&text[cursor..block.start()], cursor == 0, false));
        output.push_str(block.as_str());
        cursor = block.end();
    }
    output.push_str(&collapse(&text[cursor..], cursor == 0, true));

    Ok(output.into_bytes())
}

/// Collapse one run of ordinary markup lying between preserved blocks (which
/// always start with `<` and end with `>`) or the document edges.
fn collapse(segment: &str, at_start: bool, at_end: bool) -> String {
    let collapsed = WHITESPACE.replace_all(segment, " ");
    let mut collapsed = BETWEEN_TAGS.replace_all(&collapsed, "><").into_owned();

    if at_end {
        collapsed.truncate(collapsed.trim_end().len());
    } else if collapsed.ends_with("> ") || collapsed == " " {
        collapsed.pop();
    }

    if at_start {
        collapsed = collapsed.trim_start().to_string();
    } else if collapsed.starts_with(" <") {
        collapsed.remove(0);
    }
    collapsed
}

/// Strip comments, collapse whitespace, and drop whitespace around CSS
/// punctuation. Quoted strings are copied verbatim.
pub fn minify_style(source: &[u8]) -> Result<Vec<u8>, AssetError> {
    let source = std::str::from_utf8(source)
        .map_err(|err| AssetError::Transcode(format!("stylesheet is not UTF-8: {}", err)))?;

    let mut output = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut depth: usize = 0;
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                let mut closed = false;
                for c in chars.by_ref() {
                    if previous == '*' && c == '/' {
                        closed = true;
                        break;
                    }
                    previous = c;
                }
                if !closed {
                    return Err(AssetError::Transcode("unterminated comment".into()));
                }
                pending_space = true;
            }
            c if c.is_ascii_whitespace() => pending_space = true,
            '{' | '}' | ';' | ',' | '>' => {
                pending_space = false;
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth = depth.checked_sub(1).ok_or_else(|| {
                            AssetError::Transcode("unbalanced closing brace".into())
                        })?;
                        if output.ends_with(';') {
                            output.pop();
                        }
                    }
                    _ => {}
                }
                output.push(c);
            }
            '"' | '\'' => {
                flush_space(&mut output, &mut pending_space, depth);
                output.push(c);
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    output.push(inner);
                    if inner == '\\' {
                        if let Some(escaped) = chars.next() {
                            output.push(escaped);
                        }
                    } else if inner == c {
                        closed = true;
                        break;
                    } else if inner == '\n' {
                        break;
                    }
                }
                if !closed {
                    return Err(AssetError::Transcode("unterminated string".into()));
                }
            }
            other => {
                flush_space(&mut output, &mut pending_space, depth);
                output.push(other);
            }
        }
    }

    if depth != 0 {
        return Err(AssetError::Transcode("unbalanced opening brace".into()));
    }
    Ok(output.into_bytes())
}

/// Emit a single separating space unless the previous character makes it
/// redundant.
fn flush_space(output: &mut String, pending_space: &mut bool, depth: usize) {
    if !std::mem::take(pending_space) {
        return;
    }
    match output.chars().last() {
        None | Some('{' | '}' | ';' | ',' | '>') => {}
        Some(':') if depth > 0 => {}
        Some(_) => output.push(' '),
    }
}
