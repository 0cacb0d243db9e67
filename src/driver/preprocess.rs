//! Thin preprocessor bridge (§4.0). Not a macro processor: strips `/* */`
//! and `//` comments (respecting string/char literals, so a `//` inside a
//! string survives) and splices `\`-continued lines, leaving the lexer a
//! flat text it can scan without ever having to look back past one token.

/// Removes comments and splices backslash-newline continuations, in that
/// order — a continuation can itself split a `//` comment's marker across
/// two physical lines, so continuations must be resolved first.
pub fn preprocess(source: &str) -> String {
    strip_comments(&splice_continuations(source))
}

fn splice_continuations(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && matches!(chars.peek(), Some('\n')) {
            chars.next();
            continue;
        }
        if c == '\\' && matches!(chars.peek(), Some('\r')) {
            chars.next();
            if matches!(chars.peek(), Some('\n')) {
                chars.next();
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                let quote = c;
                out.push(c);
                while let Some(&n) = chars.peek() {
                    out.push(n);
                    chars.next();
                    if n == '\\' {
                        if let Some(&esc) = chars.peek() {
                            out.push(esc);
                            chars.next();
                        }
                        continue;
                    }
                    if n == quote {
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some('/')) => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_comment_but_keeps_newline() {
        let out = preprocess("int x; // trailing\nint y;\n");
        assert_eq!(out, "int x; \nint y;\n");
    }

    #[test]
    fn strips_block_comment_spanning_lines() {
        let out = preprocess("int x /* a\nb */ = 1;\n");
        assert_eq!(out, "int x \n = 1;\n");
    }

    #[test]
    fn splices_backslash_continuation() {
        let out = preprocess("int x = 1 + \\\n    2;\n");
        assert_eq!(out, "int x = 1 +     2;\n");
    }

    #[test]
    fn leaves_comment_markers_inside_string_literals_alone() {
        let out = preprocess("char *s = \"http://example.com\";\n");
        assert_eq!(out, "char *s = \"http://example.com\";\n");
    }
}
