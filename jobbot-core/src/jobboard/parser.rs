//! Splits raw message content into structured posts.
//!
//! A "tag line" opens a new post: either pipe-delimited (`| A | B |`) or
//! bracket-delimited (`[A][B]`, optionally with trailing text that belongs
//! to the description). Everything until the next tag line is that post's
//! description. Parsing never fails; a message with no tag line at all
//! becomes a single untagged post.

use jobbot_common::models::Post;

/// Parse raw content into one or more posts. Always returns at least one
/// post, even for empty input.
pub fn parse_posts(raw: &str) -> Vec<Post> {
    let mut posts: Vec<Post> = Vec::new();
    let mut tags: Vec<String> = Vec::new();
    let mut body: Vec<String> = Vec::new();
    let mut open = false;

    for line in raw.lines() {
        match split_tag_line(line) {
            Some((raw_tags, trailing)) => {
                // Leading free text before the first tag line stays its own
                // untagged post; an empty implicit post is dropped.
                if open || body.iter().any(|l| !l.trim().is_empty()) {
                    flush(&mut tags, &mut body, &mut posts);
                }
                open = true;
                tags = normalize_tags(&raw_tags);
                body.clear();
                if let Some(rest) = trailing {
                    body.push(rest);
                }
            }
            None => body.push(line.to_string()),
        }
    }

    if open {
        flush(&mut tags, &mut body, &mut posts);
    } else {
        // No tag line anywhere: the whole message is one untagged post.
        posts.push(Post {
            tags: Vec::new(),
            description: collapse_body(&body),
        });
    }

    posts
}

fn flush(tags: &mut Vec<String>, body: &mut Vec<String>, posts: &mut Vec<Post>) {
    posts.push(Post {
        tags: std::mem::take(tags),
        description: collapse_body(body),
    });
    body.clear();
}

/// Lowercase a tag, strip everything that is not alphanumeric, and map the
/// known synonyms onto the board's canonical vocabulary. Unrecognized tags
/// pass through in simplified form. Idempotent.
pub fn normalize_tag(raw: &str) -> String {
    let simplified: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    match simplified.as_str() {
        "forhire" => "for-hire".to_string(),
        "hiring" | "hire" => "hiring".to_string(),
        _ => simplified,
    }
}

fn normalize_tags(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in raw {
        let norm = normalize_tag(tag);
        if !norm.is_empty() && !out.contains(&norm) {
            out.push(norm);
        }
    }
    out
}

/// Try to read a line as a tag line. Returns the raw tag segments plus any
/// trailing text that followed the last closing bracket.
fn split_tag_line(line: &str) -> Option<(Vec<String>, Option<String>)> {
    let trimmed = line.trim();
    if trimmed.starts_with('[') {
        return split_bracket_tags(trimmed);
    }
    if trimmed.starts_with('|') {
        let tags: Vec<String> = trimmed
            .split('|')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !tags.is_empty() {
            return Some((tags, None));
        }
    }
    None
}

fn split_bracket_tags(trimmed: &str) -> Option<(Vec<String>, Option<String>)> {
    let mut tags = Vec::new();
    let mut rest = trimmed;
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(end) = stripped.find(']') else {
            // Unclosed bracket: not a tag group. With no groups yet the
            // whole line is plain text; otherwise it trails the last group.
            break;
        };
        tags.push(stripped[..end].to_string());
        rest = stripped[end + 1..].trim_start();
    }
    if tags.is_empty() {
        return None;
    }
    let trailing = if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    };
    Some((tags, trailing))
}

/// Collapse runs of blank lines into a single paragraph break and trim the
/// result.
fn collapse_body(lines: &[String]) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut pending_gap = false;
    for line in lines {
        let line = line.trim_end();
        if line.trim().is_empty() {
            pending_gap = !out.is_empty();
        } else {
            if pending_gap {
                out.push("");
                pending_gap = false;
            }
            out.push(line);
        }
    }
    out.join("\n").trim().to_string()
}
