//! Helper methods and trait implementations for IRC response codes.

use super::Response;
use std::str::FromStr;

/// Whether a numeric code is an error reply (400-599).
#[inline]
pub fn is_error_code(code: u16) -> bool {
    (400..600).contains(&code)
}

impl Response {
    /// Returns the numeric code as u16
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Creates a Response from a numeric code
    pub fn from_code(code: u16) -> Option<Response> {
        let resp = match code {
            1 => Response::RPL_WELCOME,
            2 => Response::RPL_YOURHOST,
            3 => Response::RPL_CREATED,
            4 => Response::RPL_MYINFO,
            5 => Response::RPL_ISUPPORT,
            324 => Response::RPL_CHANNELMODEIS,
            332 => Response::RPL_TOPIC,
            353 => Response::RPL_NAMREPLY,
            366 => Response::RPL_ENDOFNAMES,
            367 => Response::RPL_BANLIST,
            376 => Response::RPL_ENDOFMOTD,
            403 => Response::ERR_NOSUCHCHANNEL,
            422 => Response::ERR_NOMOTD,
            432 => Response::ERR_ERRONEUSNICKNAME,
            433 => Response::ERR_NICKNAMEINUSE,
            451 => Response::ERR_NOTREGISTERED,
            464 => Response::ERR_PASSWDMISMATCH,
            471 => Response::ERR_CHANNELISFULL,
            473 => Response::ERR_INVITEONLYCHAN,
            474 => Response::ERR_BANNEDFROMCHAN,
            475 => Response::ERR_BADCHANNELKEY,
            _ => return None,
        };
        Some(resp)
    }

    /// Check if this is an error response (4xx or 5xx)
    #[inline]
    pub fn is_error(&self) -> bool {
        is_error_code(self.code())
    }
}

impl FromStr for Response {
    type Err = ParseResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 3 {
            return Err(ParseResponseError::InvalidFormat);
        }
        let code: u16 = s.parse().map_err(|_| ParseResponseError::InvalidFormat)?;
        Response::from_code(code).ok_or(ParseResponseError::UnknownCode(code))
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

/// Error when parsing a response code
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseResponseError {
    /// The string was not a three-digit number
    InvalidFormat,
    /// The numeric code is not a known response
    UnknownCode(u16),
}

impl std::fmt::Display for ParseResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat => write!(f, "invalid response code format"),
            Self::UnknownCode(code) => write!(f, "unknown response code: {}", code),
        }
    }
}

impl std::error::Error for ParseResponseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        assert_eq!(Response::RPL_NAMREPLY.code(), 353);
        assert_eq!(Response::from_code(366), Some(Response::RPL_ENDOFNAMES));
        assert_eq!(Response::from_code(999), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("001".parse::<Response>(), Ok(Response::RPL_WELCOME));
        assert_eq!("353".parse::<Response>(), Ok(Response::RPL_NAMREPLY));
        assert_eq!(
            "1".parse::<Response>(),
            Err(ParseResponseError::InvalidFormat)
        );
        assert_eq!(
            "PRIVMSG".parse::<Response>(),
            Err(ParseResponseError::InvalidFormat)
        );
        assert_eq!(
            "999".parse::<Response>(),
            Err(ParseResponseError::UnknownCode(999))
        );
    }

    #[test]
    fn test_display_pads() {
        assert_eq!(Response::RPL_ISUPPORT.to_string(), "005");
    }

    #[test]
    fn test_is_error() {
        assert!(Response::ERR_NICKNAMEINUSE.is_error());
        assert!(!Response::RPL_ENDOFNAMES.is_error());
        assert!(is_error_code(599));
        assert!(!is_error_code(600));
    }
}
