//! 斜杠命令解析
//!
//! `/name arg1 "arg with spaces" 3` → 名称 + 参数列表。参数逐个做类型推断（整数 → 浮点 → 字符串），
//! 引号内的内容原样保留为字符串。解析后再映射到强类型的 [`Command`]。

use std::fmt;

use crate::core::AgentError;

/// 推断类型后的参数
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Arg {
    /// 整数与浮点都可作为数值参数
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Arg::Int(n) => Some(*n as f64),
            Arg::Float(f) => Some(*f),
            Arg::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Int(n) => write!(f, "{n}"),
            Arg::Float(x) => write!(f, "{x}"),
            Arg::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// 未映射前的命令
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<Arg>,
}

/// 整数 → 浮点 → 字符串
pub fn coerce_arg(token: &str) -> Arg {
    if let Ok(n) = token.parse::<i64>() {
        return Arg::Int(n);
    }
    if let Ok(x) = token.parse::<f64>() {
        return Arg::Float(x);
    }
    Arg::Str(token.to_string())
}

/// 单遍扫描参数串；引号内字符原样保留，闭合引号时输出不做类型推断的字符串
pub fn parse_args(tail: &str) -> Vec<Arg> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in tail.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            if !in_quotes {
                tokens.push(Arg::Str(std::mem::take(&mut current)));
            }
        } else if in_quotes {
            current.push(ch);
        } else if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(coerce_arg(&std::mem::take(&mut current)));
            }
        } else {
            current.push(ch);
        }
    }
    // 未闭合的引号：剩余内容按普通 token 处理
    if !current.is_empty() {
        tokens.push(coerce_arg(&current));
    }
    tokens
}

/// 解析一行命令（不含前导 `/`）；名称与参数以第一段空白分隔
pub fn parse_command(line: &str) -> ParsedCommand {
    let line = line.trim_start();
    let (name, tail) = match line.split_once(char::is_whitespace) {
        Some((name, tail)) => (name, tail.trim_start()),
        None => (line, ""),
    };
    ParsedCommand {
        name: name.to_string(),
        args: parse_args(tail),
    }
}

/// 交互循环支持的命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetPleasure(f64),
    SetArousal(f64),
    SetDominance(f64),
    SetRelationFriendliness(f64),
    SetRelationDominance(f64),
    AddEmotion { label: String, intensity: f64 },
    ShowThoughts,
    HideThoughts,
    ResetMood,
    ConsolidateMemories,
    AttachImage(String),
    DetachImage,
    Memories,
    Beliefs,
    Suggest,
    /// `/wipe` 与 `/reset`
    Wipe,
    ConfigUpdate,
}

fn expect_arity(cmd: &ParsedCommand, n: usize) -> Result<(), AgentError> {
    if cmd.args.len() == n {
        Ok(())
    } else {
        Err(AgentError::MalformedCommand(format!(
            "/{} expects {} argument(s), got {}",
            cmd.name,
            n,
            cmd.args.len()
        )))
    }
}

/// 数值参数必须是有限值；NaN / inf 无法写入 JSON 存档
fn number_at(cmd: &ParsedCommand, idx: usize) -> Result<f64, AgentError> {
    cmd.args[idx]
        .as_number()
        .filter(|n| n.is_finite())
        .ok_or_else(|| {
            AgentError::MalformedCommand(format!(
                "/{}: argument {} must be a finite number, got {}",
                cmd.name,
                idx + 1,
                cmd.args[idx]
            ))
        })
}

fn string_at(cmd: &ParsedCommand, idx: usize) -> Result<String, AgentError> {
    cmd.args[idx].as_str().map(str::to_string).ok_or_else(|| {
        AgentError::MalformedCommand(format!(
            "/{}: argument {} must be text, got {}",
            cmd.name,
            idx + 1,
            cmd.args[idx]
        ))
    })
}

fn single_number(cmd: &ParsedCommand) -> Result<f64, AgentError> {
    expect_arity(cmd, 1)?;
    number_at(cmd, 0)
}

fn no_args(cmd: &ParsedCommand, command: Command) -> Result<Command, AgentError> {
    expect_arity(cmd, 0)?;
    Ok(command)
}

impl TryFrom<ParsedCommand> for Command {
    type Error = AgentError;

    fn try_from(cmd: ParsedCommand) -> Result<Self, Self::Error> {
        match cmd.name.as_str() {
            "set_pleasure" => Ok(Command::SetPleasure(single_number(&cmd)?)),
            "set_arousal" => Ok(Command::SetArousal(single_number(&cmd)?)),
            "set_dominance" => Ok(Command::SetDominance(single_number(&cmd)?)),
            "set_relation_friendliness" => {
                Ok(Command::SetRelationFriendliness(single_number(&cmd)?))
            }
            "set_relation_dominance" => Ok(Command::SetRelationDominance(single_number(&cmd)?)),
            "add_emotion" => {
                expect_arity(&cmd, 2)?;
                Ok(Command::AddEmotion {
                    label: string_at(&cmd, 0)?,
                    intensity: number_at(&cmd, 1)?,
                })
            }
            "attach_image" => {
                expect_arity(&cmd, 1)?;
                Ok(Command::AttachImage(string_at(&cmd, 0)?))
            }
            "show_thoughts" => no_args(&cmd, Command::ShowThoughts),
            "hide_thoughts" => no_args(&cmd, Command::HideThoughts),
            "reset_mood" => no_args(&cmd, Command::ResetMood),
            "consolidate_memories" => no_args(&cmd, Command::ConsolidateMemories),
            "detach_image" => no_args(&cmd, Command::DetachImage),
            "memories" => no_args(&cmd, Command::Memories),
            "beliefs" => no_args(&cmd, Command::Beliefs),
            "suggest" => no_args(&cmd, Command::Suggest),
            "wipe" | "reset" => no_args(&cmd, Command::Wipe),
            "configupdate" => no_args(&cmd, Command::ConfigUpdate),
            other => Err(AgentError::MalformedCommand(format!(
                "Invalid command '/{other}'"
            ))),
        }
    }
}

impl std::str::FromStr for Command {
    type Err = AgentError;

    /// 接受带或不带前导 `/` 的命令行
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        Command::try_from(parse_command(line.strip_prefix('/').unwrap_or(line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_emotion() {
        let cmd = parse_command("add_emotion joy 0.5");
        assert_eq!(cmd.name, "add_emotion");
        assert_eq!(cmd.args, vec![Arg::Str("joy".into()), Arg::Float(0.5)]);
    }

    #[test]
    fn test_quoted_argument_keeps_spaces() {
        let cmd = parse_command("attach_image \"http://x/y z.png\"");
        assert_eq!(cmd.name, "attach_image");
        assert_eq!(cmd.args, vec![Arg::Str("http://x/y z.png".into())]);
    }

    #[test]
    fn test_quoted_number_stays_string() {
        assert_eq!(parse_args("\"42\" 42"), vec![Arg::Str("42".into()), Arg::Int(42)]);
    }

    #[test]
    fn test_whitespace_runs_and_no_args() {
        let cmd = parse_command("set_pleasure    -1   ");
        assert_eq!(cmd.args, vec![Arg::Int(-1)]);
        let cmd = parse_command("memories");
        assert_eq!(cmd.name, "memories");
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn test_unterminated_quote_is_flushed() {
        assert_eq!(parse_args("\"a b"), vec![Arg::Str("a b".into())]);
    }

    #[test]
    fn test_command_mapping() {
        assert_eq!(
            "/add_emotion joy 0.5".parse::<Command>().unwrap(),
            Command::AddEmotion {
                label: "joy".into(),
                intensity: 0.5
            }
        );
        // 整数也是合法数值
        assert_eq!(
            "/set_pleasure 1".parse::<Command>().unwrap(),
            Command::SetPleasure(1.0)
        );
        assert_eq!("/reset".parse::<Command>().unwrap(), Command::Wipe);
        assert_eq!(
            "/attach_image \"https://a.b/c d.jpg\"".parse::<Command>().unwrap(),
            Command::AttachImage("https://a.b/c d.jpg".into())
        );
    }

    #[test]
    fn test_malformed_commands_rejected() {
        for line in [
            "/set_pleasure high",
            "/set_pleasure",
            "/add_emotion 0.5 joy",
            "/set_pleasure nan",
            "/set_relation_friendliness inf",
            "/add_emotion joy NaN",
            "/attach_image 12",
            "/memories now",
            "/fly",
        ] {
            assert!(
                matches!(line.parse::<Command>(), Err(AgentError::MalformedCommand(_))),
                "{line} should be rejected"
            );
        }
    }
}
