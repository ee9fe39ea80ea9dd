//! Turning input lines into commands.

use std::sync::OnceLock;

use regex::Regex;

use crate::lexer;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Quit,
    Create {
        kind: Option<String>,
    },
    Show {
        kind: Option<String>,
        id: Option<String>,
    },
    Destroy {
        kind: Option<String>,
        id: Option<String>,
    },
    All {
        kind: Option<String>,
    },
    Update {
        kind: Option<String>,
        id: Option<String>,
        field: Option<String>,
        value: Option<String>,
    },
    Method {
        kind: String,
        call: MethodCall,
    },
    Unknown,
}

/// The method part of a `<Kind>.method(...)` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodCall {
    All,
    Count,
    Show {
        id: Option<String>,
    },
    Destroy {
        id: Option<String>,
    },
    Update {
        id: Option<String>,
        field: Option<String>,
        value: Option<String>,
    },
    UpdateMap {
        id: Option<String>,
        literal: String,
    },
    Unrecognized,
}

/// Parses one input line.
///
/// A missing argument comes back as `None` so the caller can report the
/// right message; a line that matches no command shape at all becomes
/// [`Command::Unknown`].
pub fn parse(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }
    let leading = trimmed.split_whitespace().next().unwrap_or_default();
    match leading {
        "quit" | "EOF" => return Command::Quit,
        "create" | "show" | "destroy" | "all" | "update" => return parse_canonical(trimmed),
        _ => {}
    }
    if trimmed.contains('.') {
        return parse_dotted(trimmed);
    }
    Command::Unknown
}

fn parse_canonical(line: &str) -> Command {
    let words = match lexer::split_words(line) {
        Ok(words) => words,
        Err(_) => return Command::Unknown,
    };
    let Some((verb, args)) = words.split_first() else {
        return Command::Unknown;
    };
    let token = |index: usize| args.get(index).map(|word| strip_quotes(word));
    match verb.as_str() {
        "create" => Command::Create { kind: token(0) },
        "show" => Command::Show {
            kind: token(0),
            id: token(1),
        },
        "destroy" => Command::Destroy {
            kind: token(0),
            id: token(1),
        },
        "all" => Command::All { kind: token(0) },
        "update" => Command::Update {
            kind: token(0),
            id: token(1),
            field: token(2),
            value: token(3),
        },
        _ => Command::Unknown,
    }
}

fn parse_dotted(line: &str) -> Command {
    let Some((kind, method)) = line.split_once('.') else {
        return Command::Unknown;
    };
    let kind = kind.to_string();
    let method = method.trim();
    let Some(captures) = method_shape().captures(method) else {
        return Command::Method {
            kind,
            call: MethodCall::Unrecognized,
        };
    };
    let args = &captures[2];
    let call = match (&captures[1], args) {
        ("all", "") => MethodCall::All,
        ("count", "") => MethodCall::Count,
        ("show", _) => MethodCall::Show {
            id: non_empty(strip_quotes(args)),
        },
        ("destroy", _) => MethodCall::Destroy {
            id: non_empty(strip_quotes(args)),
        },
        ("update", _) => parse_method_update(args),
        _ => MethodCall::Unrecognized,
    };
    Command::Method { kind, call }
}

/// Splits the argument text of an `update(...)` call.
///
/// Arguments are separated by a literal `", "`. When braces appear, the
/// text is split only once so a mapping literal stays in one piece; the
/// piece after the first separator is the mapping when it carries a brace.
fn parse_method_update(args: &str) -> MethodCall {
    if args.contains('{') || args.contains('}') {
        return match args.split_once(", ") {
            Some((head, tail)) if tail.contains('{') || tail.contains('}') => {
                MethodCall::UpdateMap {
                    id: non_empty(strip_quotes(head)),
                    literal: tail.trim().to_string(),
                }
            }
            Some((head, tail)) => MethodCall::Update {
                id: non_empty(strip_quotes(head)),
                field: non_empty(strip_quotes(tail)),
                value: None,
            },
            None => MethodCall::Update {
                id: non_empty(strip_quotes(args)),
                field: None,
                value: None,
            },
        };
    }
    let params: Vec<&str> = args.split(", ").collect();
    MethodCall::Update {
        id: params.first().map(|param| strip_quotes(param)).and_then(non_empty),
        field: params.get(1).map(|param| strip_quotes(param)).and_then(non_empty),
        value: params.get(2).map(|param| strip_quotes(param)),
    }
}

fn method_shape() -> &'static Regex {
    static METHOD_SHAPE: OnceLock<Regex> = OnceLock::new();
    METHOD_SHAPE.get_or_init(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\((.*)\)$").unwrap())
}

/// Removes surrounding quote and space characters, like Python's
/// `str.strip('\'" ')`.
fn strip_quotes(word: &str) -> String {
    word.trim_matches(|c: char| c == '\'' || c == '"' || c == ' ')
        .to_string()
}

fn non_empty(word: String) -> Option<String> {
    if word.is_empty() { None } else { Some(word) }
}
