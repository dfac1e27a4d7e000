use thiserror::Error;

/// A chat command with validated arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { name: String },
    Delete { name: String },
    Select { name: String },
    Interval { seconds: u64 },
    Keywords { keywords: String },
    Location { postal_code: String, country: String },
    Price { min: u64, max: u64 },
    Radius { km: u32 },
    Show,
    Selected,
    Help,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Message is not a command")]
    NotACommand,
    #[error("Unknown command: /{0}")]
    Unknown(String),
    #[error("Invalid arguments for /{command}: {reason}")]
    InvalidArguments { command: String, reason: String },
}

fn invalid(command: &str, reason: impl Into<String>) -> ParseError {
    ParseError::InvalidArguments {
        command: command.to_string(),
        reason: reason.into(),
    }
}

fn exact_args<'a, const N: usize>(command: &str, args: &[&'a str]) -> Result<[&'a str; N], ParseError> {
    <[&str; N]>::try_from(args)
        .map_err(|_| invalid(command, format!("expected {N} argument(s), got {}", args.len())))
}

fn number<T: std::str::FromStr>(command: &str, raw: &str) -> Result<T, ParseError> {
    raw.parse()
        .map_err(|_| invalid(command, format!("'{raw}' is not a valid number")))
}

fn free_text(command: &str, args: &[&str]) -> Result<String, ParseError> {
    if args.is_empty() {
        return Err(invalid(command, "missing text"));
    }
    Ok(args.join(" "))
}

impl Command {
    /// Parses `/name args...`. A `@botname` suffix on the command is ignored.
    ///
    /// `/add`, `/delete` and `/keywords` take the remaining words as free text
    /// and reject an empty one: a target cannot be named "" and blank keywords
    /// would never make a target pollable, so both are treated as malformed
    /// rather than confirmed.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut tokens = text.split_whitespace();
        let head = tokens
            .next()
            .and_then(|t| t.strip_prefix('/'))
            .ok_or(ParseError::NotACommand)?;
        let name = head.split('@').next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = tokens.collect();
        let cmd = name.as_str();

        let command = match cmd {
            "add" => Command::Add {
                name: free_text(cmd, &args)?,
            },
            "delete" => Command::Delete {
                name: free_text(cmd, &args)?,
            },
            "select" => {
                let [name] = exact_args::<1>(cmd, &args)?;
                Command::Select {
                    name: name.to_string(),
                }
            }
            "interval" => {
                let [raw] = exact_args::<1>(cmd, &args)?;
                let seconds: u64 = number(cmd, raw)?;
                if seconds == 0 {
                    return Err(invalid(cmd, "interval must be positive"));
                }
                Command::Interval { seconds }
            }
            "keywords" => Command::Keywords {
                keywords: free_text(cmd, &args)?,
            },
            "location" => {
                let [postal_code, country] = exact_args::<2>(cmd, &args)?;
                Command::Location {
                    postal_code: postal_code.to_string(),
                    country: country.to_string(),
                }
            }
            "price" => {
                let [min, max] = exact_args::<2>(cmd, &args)?;
                let (min, max): (u64, u64) = (number(cmd, min)?, number(cmd, max)?);
                if min > max {
                    return Err(invalid(cmd, "minimum price is above maximum"));
                }
                Command::Price { min, max }
            }
            "radius" => {
                let [raw] = exact_args::<1>(cmd, &args)?;
                Command::Radius {
                    km: number(cmd, raw)?,
                }
            }
            "show" => Command::Show,
            "selected" => Command::Selected,
            "help" | "start" => Command::Help,
            _ => return Err(ParseError::Unknown(name)),
        };
        Ok(command)
    }
}
