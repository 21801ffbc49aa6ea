//! Line commands typed at the directory prompt.

use anyhow::{anyhow, bail, Context, Result};
use shared::domain::{BloodGroup, DonorId};

pub const HELP: &str = "\
commands:
  group <A+|A-|B+|B-|AB+|AB-|O+|O-|any>   filter by blood group
  text <name or location>                 filter by free text
  clear-text                              drop the free-text filter
  clear                                   drop all filters
  voice <transcript>                      pick a blood group from speech
  retry                                   re-run the current search
  show                                    print the current results
  contact <donor id>                      call and WhatsApp links
  avail <donor id> <on|off>               mark a donor (un)available
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Group(Option<BloodGroup>),
    Text(String),
    ClearText,
    Clear,
    Voice(String),
    Retry,
    Show,
    Contact(DonorId),
    Availability { donor_id: DonorId, available: bool },
    Help,
    Quit,
}

/// `Ok(None)` for blank lines.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "group" | "g" => match rest.to_ascii_lowercase().as_str() {
            "" => bail!("usage: group <blood group|any>"),
            "any" | "all" => Command::Group(None),
            _ => Command::Group(Some(rest.parse()?)),
        },
        "text" | "t" => Command::Text(rest.to_string()),
        "clear-text" => Command::ClearText,
        "clear" => Command::Clear,
        "voice" | "v" => Command::Voice(rest.to_string()),
        "retry" => Command::Retry,
        "show" | "ls" => Command::Show,
        "contact" => Command::Contact(donor_id(rest)?),
        "avail" => {
            let mut args = rest.split_whitespace();
            let donor_id = donor_id(args.next().unwrap_or_default())?;
            let available = match args.next().map(str::to_ascii_lowercase).as_deref() {
                Some("on" | "yes" | "true") => true,
                Some("off" | "no" | "false") => false,
                _ => bail!("usage: avail <donor id> <on|off>"),
            };
            Command::Availability {
                donor_id,
                available,
            }
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(anyhow!("unknown command '{other}'; type 'help'")),
    };
    Ok(Some(command))
}

fn donor_id(raw: &str) -> Result<DonorId> {
    let id = raw
        .trim_start_matches('#')
        .parse::<i64>()
        .with_context(|| format!("'{raw}' is not a donor id"))?;
    Ok(DonorId(id))
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
