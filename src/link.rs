//! Message link parsing
//!
//! Two link shapes are understood:
//! - `https://t.me/<username>/<message_id>` for public channels and groups
//! - `https://t.me/c/<internal_id>/<message_id>` for private ones, whose
//!   container becomes the numeric chat id `-100<internal_id>`
//!
//! A trailing thread segment (`/c/<internal>/<thread>/<message>`) and query
//! strings such as `?single` are tolerated.

use url::Url;

use crate::error::{Error, Result};
use crate::types::SourceRef;

const LINK_HOSTS: [&str; 3] = ["t.me", "telegram.me", "telegram.dog"];

/// Turn a message link into a source reference
///
/// # Examples
///
/// ```
/// use tgmedia_dl::link::parse_message_link;
///
/// let public = parse_message_link("https://t.me/somechannel/42").unwrap();
/// assert_eq!(public.container, "somechannel");
/// assert_eq!(public.object_id, 42);
///
/// let private = parse_message_link("t.me/c/1234567/9").unwrap();
/// assert_eq!(private.container, "-1001234567");
/// ```
pub fn parse_message_link(link: &str) -> Result<SourceRef> {
    let trimmed = link.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| Error::InvalidLink(format!("{}: {}", trimmed, e)))?;

    let host = url
        .host_str()
        .map(|host| host.trim_start_matches("www."))
        .unwrap_or_default();
    if !LINK_HOSTS.contains(&host) {
        return Err(Error::InvalidLink(format!(
            "{}: unsupported host '{}'",
            trimmed, host
        )));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        ["c", internal, .., message] if segments.len() <= 4 => {
            let internal: i64 = internal.parse().map_err(|_| {
                Error::InvalidLink(format!("{}: private chat id must be numeric", trimmed))
            })?;
            Ok(SourceRef::new(
                format!("-100{}", internal),
                parse_message_id(trimmed, message)?,
            ))
        }
        [username, message] | [username, _, message] if *username != "c" => {
            if !is_valid_username(username) {
                return Err(Error::InvalidLink(format!(
                    "{}: '{}' is not a valid username",
                    trimmed, username
                )));
            }
            Ok(SourceRef::new(
                username.to_string(),
                parse_message_id(trimmed, message)?,
            ))
        }
        _ => Err(Error::InvalidLink(format!(
            "{}: expected /<username>/<message_id> or /c/<chat_id>/<message_id>",
            trimmed
        ))),
    }
}

fn parse_message_id(link: &str, segment: &str) -> Result<i64> {
    match segment.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::InvalidLink(format!(
            "{}: '{}' is not a message id",
            link, segment
        ))),
    }
}

fn is_valid_username(name: &str) -> bool {
    name.len() >= 4
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}
