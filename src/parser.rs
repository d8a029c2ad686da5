// The command tokenizer. A raw line splits on `;` into independent chains;
// each chain is an ordered sequence of command and operator tokens. Pure
// functions, no filesystem access.

/// One token in a chain. For operator tokens `command` holds the operator
/// text itself (`|`, `>` or `>>`) and, for redirects, `args` holds the
/// target filename.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub command: String,
    pub args: Vec<String>,
    pub is_operator: bool,
}

impl Token {
    fn command(text: &str) -> Token {
        let mut parts = text.split_whitespace();
        let command = parts.next().unwrap_or_default().to_string();
        let args = parts.map(str::to_string).collect();
        Token {
            command,
            args,
            is_operator: false,
        }
    }

    fn operator(op: &str, args: Vec<String>) -> Token {
        Token {
            command: op.to_string(),
            args,
            is_operator: true,
        }
    }
}

/// Tokenize one submitted line into zero or more chains, one per `;`
/// segment. A chain containing a command whose name is empty after
/// trimming is invalid and dropped whole.
pub fn parse_line(line: &str) -> Vec<Vec<Token>> {
    line.split(';')
        .map(tokenize_segment)
        .filter(|chain| {
            chain
                .iter()
                .all(|token| token.is_operator || !token.command.is_empty())
        })
        .collect()
}

fn tokenize_segment(segment: &str) -> Vec<Token> {
    let mut chain = Vec::new();
    push_tokens(segment, &mut chain);
    chain
}

fn push_tokens(text: &str, chain: &mut Vec<Token>) {
    match find_operator(text) {
        None => chain.push(Token::command(text)),
        Some((at, op)) => {
            chain.push(Token::command(&text[..at]));
            let rest = &text[at + op.len()..];
            if op == "|" {
                chain.push(Token::operator(op, Vec::new()));
                push_tokens(rest, chain);
            } else {
                // A redirect consumes the remainder of the segment as its
                // target filename; nothing after it runs as a command.
                let args = rest.split_whitespace().map(str::to_string).collect();
                chain.push(Token::operator(op, args));
            }
        }
    }
}

// First operator wins, scanning left to right. `>` only forms `>>` when
// immediately followed by another `>`.
fn find_operator(text: &str) -> Option<(usize, &'static str)> {
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'|' => return Some((i, "|")),
            b'>' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    return Some((i, ">>"));
                }
                return Some((i, ">"));
            }
            _ => {}
        }
    }
    None
}
