/*!
 # Line protocol

 Commands are single lines of the form `command:arg,arg,...` and are
 answered with `OK <payload>` or `ERR <message>`. Integers may be decimal
 or `0x`-prefixed hex.

 | Command          | Argument          | Response payload        |
 |------------------|-------------------|-------------------------|
 | `decode_daily`   | 12 packed bytes   | 48 slots                |
 | `encode_daily`   | 48 slots          | 12 packed bytes         |
 | `decode_weekly`  | packed integer    | 7 slots (bits 14+ ignored) |
 | `encode_weekly`  | 7 slots           | packed integer (hex)    |
*/

use tracing::{debug, instrument, warn};

use crate::{daily, weekly, Error, Result};

/// A parsed protocol request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    DecodeDaily(Vec<u8>),
    EncodeDaily(Vec<i64>),
    DecodeWeekly(u16),
    EncodeWeekly(Vec<i64>),
}

fn parse_int(s: &str) -> Result<i64> {
    let s = s.trim();
    let (digits, negative) = match s.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (s, false),
    };
    let invalid = || Error::General(format!("Invalid integer: {s:?}"));

    // `parse` and `from_str_radix` accept their own sign, so only digits may follow
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) if hex.starts_with(|c: char| c.is_ascii_hexdigit()) => {
            i64::from_str_radix(hex, 16).map_err(|_| invalid())?
        }
        None if digits.starts_with(|c: char| c.is_ascii_digit()) => {
            digits.parse().map_err(|_| invalid())?
        }
        _ => return Err(invalid()),
    };
    Ok(if negative { -value } else { value })
}

fn parse_list(args: &str) -> Result<Vec<i64>> {
    if args.trim().is_empty() {
        return Ok(Vec::new());
    }
    args.split(',').map(parse_int).collect()
}

fn join<T: std::fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl Command {
    /// Parses one request line
    #[instrument]
    pub fn parse(line: &str) -> Result<Command> {
        let mut parts = line.trim().splitn(2, ':');
        let name = parts.next().unwrap_or_default();
        let args = parts.next().unwrap_or_default();

        let command = match name {
            "decode_daily" => Command::DecodeDaily(
                parse_list(args)?
                    .into_iter()
                    .map(|b| {
                        u8::try_from(b).map_err(|_| Error::General(format!("Invalid byte: {b}")))
                    })
                    .collect::<Result<_>>()?,
            ),
            "encode_daily" => Command::EncodeDaily(parse_list(args)?),
            "decode_weekly" => {
                let value = parse_int(args)?;
                if value < 0 {
                    return Err(Error::General(format!("Invalid weekly schedule: {value}")));
                }
                // Only the low 14 bits carry days; anything above is ignored
                Command::DecodeWeekly((value & i64::from(u16::MAX)) as u16)
            }
            "encode_weekly" => Command::EncodeWeekly(parse_list(args)?),
            "" => return Err(Error::General("No command given".to_string())),
            other => return Err(Error::General(format!("Unknown command: {other}"))),
        };

        debug!("Parsed command: {:?}", command);
        Ok(command)
    }

    /// Runs the command, returning the response payload
    pub fn execute(&self) -> Result<String> {
        match self {
            Command::DecodeDaily(packed) => Ok(join(&daily::decode_bytes(packed)?)),
            Command::EncodeDaily(slots) => Ok(join(&daily::encode_bytes(slots)?)),
            Command::DecodeWeekly(packed) => Ok(join(&weekly::decode(*packed))),
            Command::EncodeWeekly(slots) => Ok(format!("{:#06x}", weekly::encode(slots)?)),
        }
    }
}

/// Handles one request line and formats the response line
pub fn respond(line: &str) -> String {
    match Command::parse(line).and_then(|cmd| cmd.execute()) {
        Ok(payload) => format!("OK {payload}"),
        Err(e) => {
            warn!("Request {:?} failed: {}", line.trim(), e);
            format!("ERR {e}")
        }
    }
}
