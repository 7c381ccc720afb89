//! Line lexers producing raw class candidates.

/// Options the lexers need from the resolved config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexOptions {
    pub separator: String,
    pub variant_grouping: bool,
}

impl Default for LexOptions {
    fn default() -> Self {
        Self {
            separator: ":".to_string(),
            variant_grouping: false,
        }
    }
}

/// Characters that may appear in a class name outside brackets.
fn is_class_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '/' | '.' | '!' | '@' | '*' | '%')
}

/// Characters after which a new candidate may start.
fn is_boundary(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '"' | '\'' | '`' | '<' | '>' | '=' | '{' | '}' | '(' | ')' | '[' | ']' | ',' | ';'
                | '$' | '\\'
        )
}

fn is_quote(c: char) -> bool {
    matches!(c, '"' | '\'' | '`')
}

/// The broad pass: at every boundary, lex one candidate made of variant
/// prefixes, an optional `!`, and a utility body that may contain
/// bracketed arbitrary values (quote aware) and, when grouping is on, a
/// parenthesized `(a,b)` group after a separator.
pub fn broad_pass(line: &str, options: &LexOptions) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = Vec::new();
    // Lexing resumes after a matched span, so bracketed values are not
    // rescanned from every boundary inside them.
    let mut resume = 0;

    for start in 0..chars.len() {
        if start < resume || (start > 0 && !is_boundary(chars[start - 1])) {
            continue;
        }
        if is_boundary(chars[start]) && chars[start] != '[' && chars[start] != '(' {
            continue;
        }
        if let Some(end) = lex_candidate(&chars, start, options) {
            let token: String = chars[start..end].iter().collect();
            let clipped = clip_at_balanced_parens(&token);
            // A span opening with `[` may be an array literal holding
            // candidates of its own.
            if chars[start] != '[' {
                resume = start + clipped.chars().count();
            }
            let token = trim_token(clipped);
            if !token.is_empty() {
                out.push(token.to_string());
            }
        }
    }

    out
}

fn lex_candidate(chars: &[char], start: usize, options: &LexOptions) -> Option<usize> {
    let separator: Vec<char> = options.separator.chars().collect();
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '[' => i = skip_brackets(chars, i)?,
            '(' if options.variant_grouping && i > start && chars[..i].ends_with(&separator) => {
                i = skip_group(chars, i)?;
            }
            c if is_class_char(c) => i += 1,
            _ => break,
        }
    }

    (i > start).then_some(i)
}

/// Skip a bracketed section starting at `open`, returning the index after
/// its closing `]`. Quotes suspend bracket counting. Whitespace outside
/// quotes ends the candidate unsuccessfully.
fn skip_brackets(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = open;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == '\\' {
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\\' => {
                i += 2;
                continue;
            }
            c if is_quote(c) => quote = Some(c),
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            c if c.is_whitespace() => return None,
            _ => {}
        }
        i += 1;
    }

    None
}

/// Skip a `(a,b)` variant group, returning the index after its `)`.
fn skip_group(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '[' => {
                i = skip_brackets(chars, i)?;
                continue;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            c if c.is_whitespace() || is_quote(c) => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

fn trim_token(token: &str) -> &str {
    let token = token.strip_prefix('.').unwrap_or(token);
    token.trim_end_matches(|c| matches!(c, '.' | ',' | ':' | ';' | '/'))
}

/// The permissive fallback pass: split on markup and script delimiters.
pub fn fallback_pass(line: &str) -> Vec<String> {
    line.split(|c: char| {
        c.is_whitespace()
            || matches!(
                c,
                '<' | '>' | '"' | '\'' | '`' | '(' | ')' | '{' | '}' | '[' | ']' | '#' | '='
                    | '%' | '$'
            )
    })
    .map(|part| {
        let part = part.strip_prefix('.').unwrap_or(part);
        part.trim_end_matches(|c| c == '.' || c == ':')
    })
    .filter(|part| !part.is_empty())
    .map(str::to_string)
    .collect()
}

/// Cut a candidate containing an arbitrary value at the point where its
/// brackets balance and the next character cannot continue a class name.
/// A stray closing bracket is never included.
pub fn clip_at_balanced_parens(input: &str) -> &str {
    if !input.contains("-[") {
        return input;
    }

    let mut depth: i32 = 0;
    let mut quotes: Vec<char> = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if let Some(&open) = quotes.last() {
            if c == '\\' {
                chars.next();
            } else if c == open {
                quotes.pop();
            }
            continue;
        }
        match c {
            '\\' => {
                chars.next();
            }
            c if is_quote(c) => quotes.push(c),
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return &input[..index];
                }
                if depth == 0 {
                    let next = chars.peek().map(|&(_, next)| next);
                    let continues = next.is_some_and(|n| is_class_char(n) || n == '[' || n == '(');
                    if !continues {
                        return &input[..index + 1];
                    }
                }
            }
            _ => {}
        }
    }

    input
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broad(line: &str) -> Vec<String> {
        broad_pass(line, &LexOptions::default())
    }

    #[test]
    fn test_broad_pass_html_attribute() {
        let found = broad(r#"<div class="sm:p-4 hover:bg-red-500/50 !font-bold">"#);
        for expected in ["sm:p-4", "hover:bg-red-500/50", "!font-bold"] {
            assert!(found.iter().any(|c| c == expected), "missing {expected}: {found:?}");
        }
    }

    #[test]
    fn test_broad_pass_keeps_url_arbitrary_value_whole() {
        let found = broad(r#"<div class="bg-[url(https://example.com/image.png)]"></div>"#);
        assert!(found
            .iter()
            .any(|c| c == "bg-[url(https://example.com/image.png)]"));
    }

    #[test]
    fn test_broad_pass_quoted_arbitrary_variant() {
        let found = broad(r#"<a class="[&[data-open='true']]:block">"#);
        assert!(found.iter().any(|c| c == "[&[data-open='true']]:block"), "{found:?}");
    }

    #[test]
    fn test_broad_pass_excludes_stray_brackets() {
        let found = broad("const classes = [p-[2px]]");
        assert!(found.iter().any(|c| c == "p-[2px]"), "{found:?}");
        assert!(!found.iter().any(|c| c == "p-[2px]]"));
    }

    #[test]
    fn test_broad_pass_skips_inside_matched_values() {
        assert_eq!(
            broad("grid-cols-[repeat(2,minmax(0,1fr))]"),
            vec!["grid-cols-[repeat(2,minmax(0,1fr))]"]
        );
        let line = "w-[1px]".repeat(3);
        assert_eq!(broad(&line), vec![line.clone()]);
    }

    #[test]
    fn test_broad_pass_groups() {
        let options = LexOptions {
            variant_grouping: true,
            ..LexOptions::default()
        };
        let found = broad_pass(r#"class="md:(p-4,m-2) text-sm""#, &options);
        assert!(found.iter().any(|c| c == "md:(p-4,m-2)"), "{found:?}");
    }

    #[test]
    fn test_fallback_pass() {
        let found = fallback_pass(r#"cn('p-4', {"text-lg": active}) .block"#);
        for expected in ["p-4", "text-lg", "block"] {
            assert!(found.iter().any(|c| c == expected), "missing {expected}: {found:?}");
        }
    }

    #[test]
    fn test_clip_at_balanced_parens() {
        assert_eq!(clip_at_balanced_parens("w-[10px]]"), "w-[10px]");
        assert_eq!(clip_at_balanced_parens("w-[10px]>"), "w-[10px]");
        assert_eq!(clip_at_balanced_parens("w-[10px]/50"), "w-[10px]/50");
        assert_eq!(clip_at_balanced_parens("content-['a]b']"), "content-['a]b']");
        assert_eq!(clip_at_balanced_parens("p-4"), "p-4");
    }
}
