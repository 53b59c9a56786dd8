//! Nom-based raw line splitter.
//!
//! Splits one IRC line into its raw segments without interpreting them.
//! Unlike a strict protocol parser this never fails: a segment that does
//! not match is simply recorded as absent.

use nom::{
    bytes::complete::{take_till1, take_until, take_while1},
    character::complete::char,
    error::{context, VerboseError},
    sequence::preceded,
    IResult,
};

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

/// Middle parameters allowed before the rest of the line becomes trailing.
pub const MAX_MIDDLE_PARAMS: usize = 14;

/// Parse IRCv3 message tags (the part after `@` and before the first space).
fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing IRCv3 message tags",
        preceded(char('@'), take_until(" ")),
    )(input)
}

/// Parse message prefix (the part after `:` and before the first space).
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    context(
        "parsing message prefix",
        preceded(char(':'), take_till1(|c| c == ' ')),
    )(input)
}

/// Parse the command name (alphanumeric characters).
fn parse_command(input: &str) -> ParseResult<&str, &str> {
    context("parsing IRC command", take_while1(|c: char| c.is_alphanumeric()))(input)
}

/// Parse a bare token (used for a colon-less prefix after tags).
fn parse_token(input: &str) -> ParseResult<&str, &str> {
    take_till1(|c| c == ' ')(input)
}

fn component<'a, F>(mut parser: F, input: &'a str) -> (&'a str, Option<&'a str>)
where
    F: FnMut(&'a str) -> ParseResult<&'a str, &'a str>,
{
    match parser(input) {
        Ok((rest, value)) => (rest, Some(value)),
        Err(_) => (input, None),
    }
}

/// Split a raw IRC line into its components.
///
/// IRC message format:
/// ```text
/// [@tags] [:prefix] <command> [params...] [:trailing]
/// ```
///
/// Directly after a tag segment the prefix colon may be missing. The first
/// token is then taken as the prefix when it cannot be a command
/// (`nick!user@host`), or when it is a bare word followed by a verb-shaped
/// token (`viewer PRIVMSG ...`).
pub fn split_line(input: &str) -> RawLine<'_> {
    let line = input.trim_end_matches(['\r', '\n']);

    let (rest, tags) = component(parse_tags, line);
    let rest = rest.trim_start_matches(' ');

    let (rest, prefix) = component(parse_prefix, rest);
    if prefix.is_none() && tags.is_some() {
        if let (after, Some(token)) = component(parse_token, rest) {
            if is_bare_prefix(token, after.trim_start_matches(' ')) {
                return finish(tags, Some(token), after);
            }
        }
    }

    finish(tags, prefix, rest)
}

/// Whether `token`, followed by `after`, is a prefix that lost its colon.
fn is_bare_prefix(token: &str, after: &str) -> bool {
    if after.is_empty() {
        return false;
    }
    if !token.chars().all(|c| c.is_alphanumeric()) {
        return true;
    }
    let next = after.split(' ').next().unwrap_or_default();
    is_verb(next) && !is_verb(token)
}

/// An uppercase command word or a three-digit numeric.
fn is_verb(token: &str) -> bool {
    let numeric = token.len() == 3 && token.bytes().all(|b| b.is_ascii_digit());
    let word = !token.is_empty() && token.bytes().all(|b| b.is_ascii_uppercase());
    numeric || word
}

fn finish<'a>(tags: Option<&'a str>, prefix: Option<&'a str>, rest: &'a str) -> RawLine<'a> {
    let rest = rest.trim_start_matches(' ');
    let (rest, command) = component(parse_command, rest);

    // A command glued to non-space junk ("PRIVMSG\x01") is not a command.
    let command = match rest.chars().next() {
        None | Some(' ') => command,
        Some(_) => None,
    };

    let params = if command.is_some() {
        split_params(rest)
    } else {
        Vec::new()
    };

    RawLine {
        tags,
        prefix,
        command,
        params,
    }
}

/// Split the parameter section of a line.
///
/// Tokens are space-delimited; a token starting with `:`, or the token
/// after [`MAX_MIDDLE_PARAMS`] middle parameters, takes the rest of the
/// line verbatim.
fn split_params(input: &str) -> Vec<&str> {
    let mut params: Vec<&str> = Vec::new();
    let mut rest = input;

    while rest.starts_with(' ') {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            break;
        }

        if params.len() == MAX_MIDDLE_PARAMS {
            params.push(rest);
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    params
}

/// A raw IRC line split into borrowed segments.
///
/// This is the intermediate representation consumed by
/// [`ParsedMessage`](crate::message::ParsedMessage).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// Raw tags string (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Raw prefix string (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    /// The command name, if one could be found.
    pub command: Option<&'a str>,
    /// Command parameters, including trailing.
    pub params: Vec<&'a str>,
}
