//! Minimal JavaScript lexing helpers shared by the regex paths.

/// Replace comment bodies with spaces, keeping newlines and string literals.
///
/// Byte offsets and line numbers of the result match the input, so matches
/// found in the masked text can be reported against the original.
pub fn mask_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                out.push(' ');
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                    push_blank(&mut out, next);
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str("  ");
                let mut prev = '\0';
                for next in chars.by_ref() {
                    push_blank(&mut out, next);
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Keep the byte width of `c` so offsets stay aligned.
fn push_blank(out: &mut String, c: char) {
    if c == '\n' {
        out.push('\n');
    } else {
        out.extend(std::iter::repeat(' ').take(c.len_utf8()));
    }
}

/// Bracket nesting depth at the start of each line.
///
/// Brackets inside comments and string literals do not count. Regex
/// literals are not recognized.
pub fn line_depths(source: &str) -> Vec<usize> {
    let masked = mask_comments(source);
    let mut depths = vec![0];
    let mut depth: usize = 0;
    let mut quote: Option<char> = None;
    let mut chars = masked.chars();

    while let Some(c) = chars.next() {
        if c == '\n' {
            depths.push(depth);
            // Only template literals span lines.
            if quote != Some('`') {
                quote = None;
            }
            continue;
        }
        match quote {
            Some(q) => {
                if c == '\\' {
                    if let Some('\n') = chars.next() {
                        depths.push(depth);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '{' | '(' | '[' => depth += 1,
                '}' | ')' | ']' => depth = depth.saturating_sub(1),
                _ => {}
            },
        }
    }

    depths
}

/// 1-based line number of a byte offset.
pub fn line_of(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|b| *b == b'\n')
        .count()
        + 1
}
