use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use course_core::model::{Answer, PageId, TopicId};

/// One line typed at the player prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Next,
    Back,
    Goto { topic: TopicId, page: PageId },
    Submit(Answer),
    Retry,
    Done,
    Media,
    Audio(bool),
    Lang(String),
    Menu,
    Transcript,
    Status,
    Resume,
    Restart,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    InvalidAnswer(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::Unknown(cmd) => write!(f, "unknown command: {cmd} (try `help`)"),
            CommandError::MissingArgument { command, expected } => {
                write!(f, "{command} expects {expected}")
            }
            CommandError::InvalidAnswer(raw) => write!(
                f,
                "invalid answer {raw:?}; use one:<id>, many:<id,id>, match:<l=r,l=r>, slider:<n> or order:<id,id>"
            ),
        }
    }
}

impl std::error::Error for CommandError {}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };
    let command = match head {
        "next" | "n" => Command::Next,
        "back" | "b" => Command::Back,
        "goto" => {
            let missing = CommandError::MissingArgument {
                command: "goto",
                expected: "<topic> <page>",
            };
            let topic = words.next().ok_or_else(|| missing.clone())?;
            let page = words.next().ok_or(missing)?;
            Command::Goto {
                topic: TopicId::new(topic),
                page: PageId::new(page),
            }
        }
        "submit" => {
            let raw = words.next().ok_or(CommandError::MissingArgument {
                command: "submit",
                expected: "an answer",
            })?;
            Command::Submit(parse_answer(raw)?)
        }
        "retry" => Command::Retry,
        "done" => Command::Done,
        "media" => Command::Media,
        "audio" => match words.next() {
            Some("on") => Command::Audio(true),
            Some("off") => Command::Audio(false),
            _ => {
                return Err(CommandError::MissingArgument {
                    command: "audio",
                    expected: "on or off",
                });
            }
        },
        "lang" => {
            let code = words.next().ok_or(CommandError::MissingArgument {
                command: "lang",
                expected: "a language code",
            })?;
            Command::Lang(code.to_owned())
        }
        "menu" => Command::Menu,
        "transcript" => Command::Transcript,
        "status" => Command::Status,
        "resume" => Command::Resume,
        "restart" => Command::Restart,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_owned())),
    };
    Ok(command)
}

/// Parses `kind:value` answer syntax.
pub fn parse_answer(raw: &str) -> Result<Answer, CommandError> {
    let invalid = || CommandError::InvalidAnswer(raw.to_owned());
    let (kind, value) = raw.split_once(':').ok_or_else(invalid)?;
    let list = |value: &str| -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    };

    match kind {
        "one" => Ok(Answer::Single(value.trim().to_owned())),
        "many" => Ok(Answer::Multiple(list(value).into_iter().collect::<BTreeSet<_>>())),
        "match" => {
            let mut pairs = BTreeMap::new();
            for pair in list(value) {
                let (left, right) = pair.split_once('=').ok_or_else(invalid)?;
                pairs.insert(left.trim().to_owned(), right.trim().to_owned());
            }
            Ok(Answer::Matching(pairs))
        }
        "slider" => value
            .trim()
            .parse::<f64>()
            .map(Answer::Slider)
            .map_err(|_| invalid()),
        "order" => Ok(Answer::Ordering(list(value))),
        _ => Err(invalid()),
    }
}

pub const HELP: &str = "\
commands:
  next | back                 move through the course
  goto <topic> <page>         jump to a page
  submit <answer>             answer the current question
      one:<id>  many:<id,id>  match:<l=r,l=r>  slider:<n>  order:<id,id,...>
  retry                       clear feedback and try again
  done                        mark the current page complete
  media                       audio or video on this page finished
  audio on|off                toggle narration
  lang <code>                 switch language
  menu | transcript           toggle overlays
  status                      show progress and stars
  resume | restart            answer the resume prompt
  quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_commands() {
        assert_eq!(parse_command("  next "), Ok(Command::Next));
        assert_eq!(
            parse_command("goto t_basics p_f_1"),
            Ok(Command::Goto {
                topic: TopicId::new("t_basics"),
                page: PageId::new("p_f_1"),
            })
        );
        assert!(matches!(
            parse_command("goto t_basics"),
            Err(CommandError::MissingArgument { command: "goto", .. })
        ));
        assert_eq!(parse_command(""), Err(CommandError::Empty));
        assert_eq!(
            parse_command("dance"),
            Err(CommandError::Unknown("dance".into()))
        );
    }

    #[test]
    fn parses_every_answer_shape() {
        assert_eq!(parse_answer("one:b"), Ok(Answer::Single("b".into())));
        assert_eq!(
            parse_answer("many:c, a"),
            Ok(Answer::Multiple(BTreeSet::from(["a".into(), "c".into()])))
        );
        assert_eq!(
            parse_answer("match:m1=m2,m2=m1"),
            Ok(Answer::Matching(BTreeMap::from([
                ("m1".into(), "m2".into()),
                ("m2".into(), "m1".into()),
            ])))
        );
        assert_eq!(parse_answer("slider:0.9"), Ok(Answer::Slider(0.9)));
        assert_eq!(
            parse_answer("order:s2,s1"),
            Ok(Answer::Ordering(vec!["s2".into(), "s1".into()]))
        );
    }

    #[test]
    fn rejects_malformed_answers() {
        assert!(parse_answer("b").is_err());
        assert!(parse_answer("slider:lots").is_err());
        assert!(parse_answer("match:m1").is_err());
        assert!(parse_answer("guess:a").is_err());
        assert_eq!(
            parse_command("audio loud"),
            Err(CommandError::MissingArgument {
                command: "audio",
                expected: "on or off",
            })
        );
    }
}
