//! Operator command line parsing.
//!
//! Shared by the TUI command prompt and the headless stdin reader.

use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Command list shown by `help`.
pub const HELP_TEXT: &str = "\
builders                    list message builders
fields <Builder>            show a builder's fields and defaults
preview <Builder> [K=V...]  show the payload a send would produce
send <Builder> [K=V...]     build from defaults plus overrides and send
json <raw JSON>             send a raw JSON payload
format <raw JSON>           pretty-print raw JSON
filter [tag...]             show only these tags (no tags shows all)
toggle <tag>                add or remove a tag from the filter
clear                       clear all messages
restart                     restart the connection
help                        show this list
quit                        exit";

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Builders,
    Fields(String),
    Preview {
        builder: String,
        overrides: IndexMap<String, String>,
    },
    Send {
        builder: String,
        overrides: IndexMap<String, String>,
    },
    /// Raw JSON text, taken verbatim from the rest of the line.
    Json(String),
    Format(String),
    Filter(Vec<String>),
    Toggle(String),
    Clear,
    Restart,
    Help,
    Quit,
}

/// Parses one command line.
///
/// Words are split on whitespace. Double quotes group words and `\"` is a
/// literal quote. `json` and `format` take the rest of the line unparsed.
pub fn parse_command(line: &str) -> Result<ConsoleCommand> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "" => Err(Error::InvalidCommand("empty command".to_string())),
        "json" => Ok(ConsoleCommand::Json(rest.to_string())),
        "format" => Ok(ConsoleCommand::Format(rest.to_string())),
        _ => {
            let args = tokenize(rest)?;
            parse_words(word, args)
        }
    }
}

fn parse_words(word: &str, args: Vec<String>) -> Result<ConsoleCommand> {
    let mut args = args.into_iter();
    let command = match word {
        "builders" => ConsoleCommand::Builders,
        "fields" => ConsoleCommand::Fields(required(args.next(), "fields <Builder>")?),
        "preview" | "send" => {
            let builder = required(args.next(), &format!("{word} <Builder> [K=V...]"))?;
            let overrides = parse_assignments(&mut args)?;
            if word == "send" {
                ConsoleCommand::Send { builder, overrides }
            } else {
                ConsoleCommand::Preview { builder, overrides }
            }
        }
        "filter" => return Ok(ConsoleCommand::Filter(args.collect())),
        "toggle" => ConsoleCommand::Toggle(required(args.next(), "toggle <tag>")?),
        "clear" => ConsoleCommand::Clear,
        "restart" => ConsoleCommand::Restart,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => {
            return Err(Error::InvalidCommand(format!(
                "unknown command: {other} (try help)"
            )));
        }
    };

    if let Some(extra) = args.next() {
        return Err(Error::InvalidCommand(format!("unexpected argument: {extra}")));
    }
    Ok(command)
}

fn required(arg: Option<String>, usage: &str) -> Result<String> {
    arg.ok_or_else(|| Error::InvalidCommand(format!("usage: {usage}")))
}

fn parse_assignments(args: impl Iterator<Item = String>) -> Result<IndexMap<String, String>> {
    let mut overrides = IndexMap::new();
    for arg in args {
        let Some((field, value)) = arg.split_once('=') else {
            return Err(Error::InvalidCommand(format!("expected FIELD=VALUE, got {arg}")));
        };
        if field.is_empty() {
            return Err(Error::InvalidCommand(format!("missing field name in {arg}")));
        }
        overrides.insert(field.to_string(), value.to_string());
    }
    Ok(overrides)
}

fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
                in_token = true;
            }
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err(Error::InvalidCommand("unterminated quote".to_string()));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command("builders").unwrap(), ConsoleCommand::Builders);
        assert_eq!(parse_command("  clear ").unwrap(), ConsoleCommand::Clear);
        assert_eq!(parse_command("restart").unwrap(), ConsoleCommand::Restart);
        assert_eq!(parse_command("help").unwrap(), ConsoleCommand::Help);
        assert_eq!(parse_command("quit").unwrap(), ConsoleCommand::Quit);
    }

    #[test]
    fn test_send_with_quoted_override() {
        let command = parse_command(r#"send ChatRoomChat Content="hello there" Type=Emote"#).unwrap();
        assert_eq!(
            command,
            ConsoleCommand::Send {
                builder: "ChatRoomChat".to_string(),
                overrides: overrides(&[("Content", "hello there"), ("Type", "Emote")]),
            }
        );
    }

    #[test]
    fn test_escaped_quote_and_empty_value() {
        let command = parse_command(r#"preview ChatRoomChat Content="say \"hi\"" Type="#).unwrap();
        assert_eq!(
            command,
            ConsoleCommand::Preview {
                builder: "ChatRoomChat".to_string(),
                overrides: overrides(&[("Content", r#"say "hi""#), ("Type", "")]),
            }
        );
    }

    #[test]
    fn test_value_may_contain_equals() {
        let command = parse_command("send AccountLogin Password=a=b").unwrap();
        let ConsoleCommand::Send { overrides, .. } = command else {
            panic!("expected send");
        };
        assert_eq!(overrides["Password"], "a=b");
    }

    #[test]
    fn test_json_keeps_raw_text() {
        assert_eq!(
            parse_command(r#"json {"event": "A",  "data": {}}"#).unwrap(),
            ConsoleCommand::Json(r#"{"event": "A",  "data": {}}"#.to_string())
        );
        assert_eq!(parse_command("json").unwrap(), ConsoleCommand::Json(String::new()));
    }

    #[test]
    fn test_filter_with_and_without_tags() {
        assert_eq!(parse_command("filter").unwrap(), ConsoleCommand::Filter(vec![]));
        assert_eq!(
            parse_command("filter a \"b c\"").unwrap(),
            ConsoleCommand::Filter(vec!["a".to_string(), "b c".to_string()])
        );
    }

    #[test]
    fn test_errors() {
        for line in ["", "bogus", "fields", "send", "send A novalue", "send A =x", "toggle", "clear now", "send A K=\"open"] {
            assert!(
                matches!(parse_command(line), Err(Error::InvalidCommand(_))),
                "line {line:?}"
            );
        }
    }
}
