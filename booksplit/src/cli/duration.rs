use std::fmt;
use std::time::Duration;

/// Parse a timeout such as `90`, `90s`, `10m`, `1h30m` or `1.5h`.
///
/// # Grammar
///
/// ```text
/// timeout   = component { separators component } [ separators number ] | number ;
/// component = number separators? unit ;
/// number    = digits [ "." digits ] ;
/// unit      = "ms" | "s" | "m" | "h" ;
/// separators = { whitespace | "_" } ;
/// ```
///
/// A trailing number without a unit counts as seconds, so a plain `600` is
/// ten minutes. Units may not repeat and the total must be positive.
pub fn parse_duration(value: &str) -> Result<Duration, DurationParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::Empty);
    }

    if let Some((index, found)) = trimmed.char_indices().find(|(_, c)| !c.is_ascii()) {
        return Err(DurationParseError::UnexpectedChar { index, found });
    }

    let bytes = trimmed.as_bytes();
    let mut index = 0usize;
    let mut seen_units = [false; Unit::COUNT];
    let mut total_millis: u128 = 0;

    while index < bytes.len() {
        let (mantissa, scale, number_len) = parse_number(bytes, index)?;
        index += number_len;
        skip_separators(bytes, &mut index);

        let unit = if index >= bytes.len() {
            Unit::Second
        } else {
            let (unit, unit_len) = parse_unit(trimmed, index)?;
            index += unit_len;
            unit
        };

        if std::mem::replace(&mut seen_units[unit.index()], true) {
            return Err(DurationParseError::DuplicateUnit { unit });
        }

        let scaled = mantissa
            .checked_mul(unit.millis())
            .ok_or(DurationParseError::Overflow)?;
        let divisor = 10u128.pow(scale);
        if scaled % divisor != 0 {
            return Err(DurationParseError::FractionalTooPrecise { unit });
        }

        total_millis = total_millis
            .checked_add(scaled / divisor)
            .ok_or(DurationParseError::Overflow)?;
        skip_separators(bytes, &mut index);
    }

    if total_millis == 0 {
        return Err(DurationParseError::Zero);
    }

    u64::try_from(total_millis)
        .map(Duration::from_millis)
        .map_err(|_| DurationParseError::Overflow)
}

fn parse_number(bytes: &[u8], start: usize) -> Result<(u128, u32, usize), DurationParseError> {
    let mut index = start;
    let mut mantissa: u128 = 0;
    let mut scale: u32 = 0;
    let mut decimal_point = None;

    while let Some(&byte) = bytes.get(index) {
        match byte {
            b'0'..=b'9' => {
                mantissa = mantissa
                    .checked_mul(10)
                    .and_then(|m| m.checked_add(u128::from(byte - b'0')))
                    .ok_or(DurationParseError::Overflow)?;
                if decimal_point.is_some() {
                    scale += 1;
                    if scale > MAX_FRACTION_DIGITS {
                        return Err(DurationParseError::Overflow);
                    }
                }
            }
            b'.' if decimal_point.is_none() => decimal_point = Some(index),
            _ => break,
        }
        index += 1;
    }

    if index == start || (decimal_point == Some(start) && index == start + 1) {
        return Err(DurationParseError::ExpectedNumber {
            index: start,
            found: bytes.get(start).map(|&b| b as char),
        });
    }

    if let Some(point) = decimal_point {
        if scale == 0 {
            return Err(DurationParseError::MissingFractionDigits { index: point });
        }
    }

    Ok((mantissa, scale, index - start))
}

const MAX_FRACTION_DIGITS: u32 = 12;

fn parse_unit(original: &str, index: usize) -> Result<(Unit, usize), DurationParseError> {
    let remaining = &original[index..];
    let word_len = remaining
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .count();

    let unit = match &remaining[..word_len] {
        "ms" => Unit::Millisecond,
        "s" => Unit::Second,
        "m" => Unit::Minute,
        "h" => Unit::Hour,
        "" => {
            return Err(DurationParseError::UnexpectedChar {
                index,
                found: remaining.chars().next().unwrap_or(' '),
            })
        }
        other => {
            return Err(DurationParseError::UnknownUnit {
                index,
                found: other.to_owned(),
            })
        }
    };

    Ok((unit, word_len))
}

fn skip_separators(bytes: &[u8], index: &mut usize) {
    while let Some(&byte) = bytes.get(*index) {
        if byte == b'_' || byte.is_ascii_whitespace() {
            *index += 1;
        } else {
            break;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationParseError {
    Empty,
    ExpectedNumber { index: usize, found: Option<char> },
    UnknownUnit { index: usize, found: String },
    DuplicateUnit { unit: Unit },
    MissingFractionDigits { index: usize },
    FractionalTooPrecise { unit: Unit },
    UnexpectedChar { index: usize, found: char },
    Zero,
    Overflow,
}

impl std::error::Error for DurationParseError {}

impl fmt::Display for DurationParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationParseError::Empty => write!(f, "duration cannot be empty"),
            DurationParseError::ExpectedNumber { index, found } => match found {
                Some(ch) => write!(
                    f,
                    "expected a number at position {} but found '{}'",
                    index + 1,
                    ch
                ),
                None => write!(f, "expected a number at position {}", index + 1),
            },
            DurationParseError::UnknownUnit { index, found } => {
                write!(f, "unknown unit '{}' at position {}", found, index + 1)
            }
            DurationParseError::DuplicateUnit { unit } => {
                write!(f, "unit '{}' appears more than once", unit.symbol())
            }
            DurationParseError::MissingFractionDigits { index } => write!(
                f,
                "expected digits after decimal point at position {}",
                index + 1
            ),
            DurationParseError::FractionalTooPrecise { unit } => write!(
                f,
                "fraction of '{}' is finer than a millisecond",
                unit.symbol()
            ),
            DurationParseError::UnexpectedChar { index, found } => write!(
                f,
                "unexpected character '{}' at position {}",
                found,
                index + 1
            ),
            DurationParseError::Zero => write!(f, "duration must be greater than zero"),
            DurationParseError::Overflow => write!(f, "duration is too large"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Unit {
    Millisecond,
    Second,
    Minute,
    Hour,
}

impl Unit {
    const COUNT: usize = 4;

    fn index(self) -> usize {
        self as usize
    }

    fn millis(self) -> u128 {
        match self {
            Unit::Millisecond => 1,
            Unit::Second => 1_000,
            Unit::Minute => 60_000,
            Unit::Hour => 3_600_000,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Unit::Millisecond => "ms",
            Unit::Second => "s",
            Unit::Minute => "m",
            Unit::Hour => "h",
        }
    }
}
