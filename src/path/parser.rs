//! nom grammar for dependency path strings.
//!
//! ```text
//! path     := segment ( "." segment )?
//! segment  := [A-Za-z_] [A-Za-z0-9_]*
//! ```
//!
//! One segment is a self-reference, two segments are `Entity.Property`.
//! Anything else (extra dots, empty segments, stray characters) is a
//! `PathError::Malformed` carrying a reason the builder UI can show inline.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char},
    combinator::{all_consuming, map, opt, recognize},
    multi::many0,
    sequence::{pair, preceded},
    IResult,
};

use super::DependencyPath;
use crate::error::PathError;

/// Parse a raw dependency path string
pub fn parse_path(raw: &str) -> Result<DependencyPath, PathError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        return Err(malformed(raw, "path is empty"));
    }

    // Structural checks first so the reason names the actual problem
    // instead of a generic parse failure.
    let dot_count = trimmed.matches('.').count();
    if dot_count > 1 {
        return Err(malformed(
            raw,
            "expected at most one '.' separating entity and property",
        ));
    }
    if trimmed.starts_with('.') || trimmed.ends_with('.') {
        return Err(malformed(raw, "empty path segment"));
    }

    match all_consuming(path::<nom::error::Error<&str>>)(trimmed) {
        Ok((_, parsed)) => Ok(parsed),
        Err(_) => Err(malformed(
            raw,
            "segments must be identifiers ([A-Za-z_][A-Za-z0-9_]*)",
        )),
    }
}

fn malformed(raw: &str, reason: &str) -> PathError {
    PathError::Malformed {
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}

fn path<'a, E: nom::error::ParseError<&'a str>>(
    input: &'a str,
) -> IResult<&'a str, DependencyPath, E> {
    map(
        pair(segment, opt(preceded(char('.'), segment))),
        |(first, second)| match second {
            Some(property) => DependencyPath::CrossEntity {
                entity: first.to_string(),
                property: property.to_string(),
            },
            None => DependencyPath::SelfReference {
                property: first.to_string(),
            },
        },
    )(input)
}

fn segment<'a, E: nom::error::ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, &'a str, E> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}
