//! Constant assignments ("bounds") from a TLC model configuration file.
//!
//! The `CONSTANT(S)` section is tokenized as a whole rather than line by
//! line: TLC accepts several assignments on one line and values (sets,
//! tuples, records) that span lines. An assignment is `Ident = value` or
//! `Ident <- value`; the value runs until the next assignment at bracket
//! depth 0 or the next section keyword.

use std::collections::BTreeMap;

/// Keywords that start a configuration section.
const SECTION_KEYWORDS: &[&str] = &[
    "CONSTANT",
    "CONSTANTS",
    "INIT",
    "NEXT",
    "SPECIFICATION",
    "INVARIANT",
    "INVARIANTS",
    "PROPERTY",
    "PROPERTIES",
    "SYMMETRY",
    "VIEW",
    "CONSTRAINT",
    "CONSTRAINTS",
    "ACTION_CONSTRAINT",
    "ACTION_CONSTRAINTS",
    "CHECK_DEADLOCK",
    "POSTCONDITION",
    "ALIAS",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Assign,
    Open,
    Close,
    Punct,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    start: usize,
    end: usize,
}

/// Collect every assignment from every `CONSTANT`/`CONSTANTS` section.
/// Values are kept as text with whitespace runs collapsed.
pub fn parse_bounds(cfg: &str) -> BTreeMap<String, String> {
    let text = strip_comments(cfg);
    let tokens = tokenize(&text);

    let mut bounds = BTreeMap::new();
    let mut in_constants = false;
    let mut depth = 0usize;
    // (name, byte offset where the value starts)
    let mut pending: Option<(&str, usize)> = None;

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Open => depth += 1,
            TokenKind::Close => depth = depth.saturating_sub(1),
            TokenKind::Word if depth == 0 && SECTION_KEYWORDS.contains(&token.text) => {
                close_value(&mut bounds, &text, pending.take(), token.start);
                in_constants = token.text == "CONSTANT" || token.text == "CONSTANTS";
            }
            TokenKind::Word
                if depth == 0
                    && in_constants
                    && is_identifier(token.text)
                    && tokens.get(i + 1).is_some_and(|t| t.kind == TokenKind::Assign) =>
            {
                close_value(&mut bounds, &text, pending.take(), token.start);
                pending = Some((token.text, tokens[i + 1].end));
            }
            _ => {}
        }
    }
    close_value(&mut bounds, &text, pending, text.len());

    bounds
}

fn close_value(
    bounds: &mut BTreeMap<String, String>,
    text: &str,
    pending: Option<(&str, usize)>,
    end: usize,
) {
    let Some((name, start)) = pending else {
        return;
    };
    let value = text[start..end].split_whitespace().collect::<Vec<_>>().join(" ");
    if !value.is_empty() {
        bounds.insert(name.to_string(), value);
    }
}

fn is_identifier(word: &str) -> bool {
    word.chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        let next = chars.peek().map(|(_, n)| *n);
        let (kind, end) = match (c, next) {
            ('<', Some('-')) | ('<', Some('<')) | ('>', Some('>')) => {
                chars.next();
                let kind = match next {
                    Some('-') => TokenKind::Assign,
                    Some('<') => TokenKind::Open,
                    _ => TokenKind::Close,
                };
                (kind, start + 2)
            }
            ('=', _) => (TokenKind::Assign, start + 1),
            ('{' | '[' | '(', _) => (TokenKind::Open, start + 1),
            ('}' | ']' | ')', _) => (TokenKind::Close, start + 1),
            _ if c.is_alphanumeric() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some(&(pos, n)) = chars.peek() {
                    if !(n.is_alphanumeric() || n == '_') {
                        break;
                    }
                    end = pos + n.len_utf8();
                    chars.next();
                }
                (TokenKind::Word, end)
            }
            _ => (TokenKind::Punct, start + c.len_utf8()),
        };
        tokens.push(Token {
            kind,
            text: &text[start..end],
            start,
            end,
        });
    }

    tokens
}

/// Remove `(* ... *)` and `\* ...` comments, keeping line structure.
fn strip_comments(text: &str) -> String {
    let mut uncommented = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("(*") {
        uncommented.push_str(&rest[..start]);
        match rest[start + 2..].find("*)") {
            Some(end) => {
                let comment = &rest[start..start + 2 + end + 2];
                uncommented.extend(comment.chars().filter(|c| *c == '\n'));
                rest = &rest[start + 2 + end + 2..];
            }
            None => rest = "",
        }
    }
    uncommented.push_str(rest);

    uncommented
        .lines()
        .map(|line| match line.find("\\*") {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_constants_block() {
        let cfg = "\
SPECIFICATION Spec
CONSTANTS
    N = 3
    Procs = {p1, p2}   \\* two processes
    Nil <- NilValue
INVARIANT TypeOK
";
        let bounds = parse_bounds(cfg);
        assert_eq!(bounds.len(), 3);
        assert_eq!(bounds["N"], "3");
        assert_eq!(bounds["Procs"], "{p1, p2}");
        assert_eq!(bounds["Nil"], "NilValue");
    }

    #[test]
    fn test_inline_constant_and_block_comment() {
        let cfg = "\
CONSTANT MaxVal = 10
(* CONSTANT Hidden = 1
   still a comment *)
INIT Init
NEXT Next
";
        let bounds = parse_bounds(cfg);
        assert_eq!(bounds.len(), 1);
        assert_eq!(bounds["MaxVal"], "10");
    }

    #[test]
    fn test_value_spanning_lines() {
        let cfg = "\
CONSTANTS
  Procs = {p1,
           p2}
  Msgs = << [type |-> \"a\"],
  [type |-> \"b\"] >>
";
        let bounds = parse_bounds(cfg);
        assert_eq!(bounds["Procs"], "{p1, p2}");
        assert_eq!(bounds["Msgs"], "<< [type |-> \"a\"], [type |-> \"b\"] >>");
    }

    #[test]
    fn test_several_assignments_on_one_line() {
        let bounds = parse_bounds("CONSTANTS N = 3 M = 4 Nil <- NilValue\nINIT Init\n");
        assert_eq!(bounds.len(), 3);
        assert_eq!(bounds["N"], "3");
        assert_eq!(bounds["M"], "4");
        assert_eq!(bounds["Nil"], "NilValue");
    }

    #[test]
    fn test_equals_inside_brackets_is_part_of_value() {
        let bounds = parse_bounds("CONSTANT S = {x \\in 1..3 : x = 2}\n");
        assert_eq!(bounds.len(), 1);
        assert_eq!(bounds["S"], "{x \\in 1..3 : x = 2}");
    }

    #[test]
    fn test_no_constants() {
        assert!(parse_bounds("SPECIFICATION Spec\nINVARIANT Inv\n").is_empty());
    }
}
