//! Line commands understood by the terminal editor.

use scribe_core::Format;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Type text at the caret (`\n` escapes become line breaks).
    Type(String),
    Caret(usize),
    Select(usize, usize),
    Backspace,
    Toggle(Format),
    Checkbox,
    Show,
    Save,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  type <text>        insert text at the caret (\\n for a line break)
  caret <n>          move the caret
  select <a> <b>     select characters a..b
  backspace          delete backward
  <format>           toggle: bold italic underline strike highlight
                     h1 h2 h3 bullet numbered todo left center right quote
  checkbox           insert a checkbox marker
  show               print the note and its format state
  save               save now
  quit               save and exit";

fn format_named(name: &str) -> Option<Format> {
    Some(match name {
        "bold" => Format::Bold,
        "italic" => Format::Italic,
        "underline" => Format::Underline,
        "strike" => Format::Strikethrough,
        "highlight" => Format::Highlight,
        "h1" => Format::Heading1,
        "h2" => Format::Heading2,
        "h3" => Format::Heading3,
        "bullet" => Format::BulletList,
        "numbered" => Format::NumberedList,
        "todo" => Format::Checkbox,
        "left" => Format::AlignLeft,
        "center" => Format::AlignCenter,
        "right" => Format::AlignRight,
        "quote" => Format::Quote,
        _ => return None,
    })
}

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let number = |s: &str| s.trim().parse::<usize>().map_err(|e| format!("bad offset {s:?}: {e}"));

    match word {
        "type" => Ok(Command::Type(rest.replace("\\n", "\n"))),
        "caret" => Ok(Command::Caret(number(rest)?)),
        "select" => {
            let (a, b) = rest
                .trim()
                .split_once(' ')
                .ok_or_else(|| "usage: select <a> <b>".to_string())?;
            Ok(Command::Select(number(a)?, number(b)?))
        }
        "backspace" => Ok(Command::Backspace),
        "checkbox" => Ok(Command::Checkbox),
        "show" => Ok(Command::Show),
        "save" => Ok(Command::Save),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => format_named(other)
            .map(Command::Toggle)
            .ok_or_else(|| format!("unknown command {other:?} (try `help`)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("type hi there"), Ok(Command::Type("hi there".into())));
        assert_eq!(parse("type a\\nb\n"), Ok(Command::Type("a\nb".into())));
        assert_eq!(parse("caret 4"), Ok(Command::Caret(4)));
        assert_eq!(parse("select 1 3"), Ok(Command::Select(1, 3)));
        assert_eq!(parse("h2"), Ok(Command::Toggle(Format::Heading2)));
        assert_eq!(parse("todo"), Ok(Command::Toggle(Format::Checkbox)));
        assert_eq!(parse("quit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("caret x").is_err());
        assert!(parse("select 1").is_err());
        assert!(parse("frobnicate").is_err());
    }
}
