//! The resources returned by the [`data`](crate::data) requests.

use serde::{Deserialize, Serialize};
use std::{fmt, num::ParseIntError, str::FromStr};

/// A unique identifier of any resource.
///
/// The service sends identifiers as strings, to keep them intact in JSON parsers that only have
/// double-precision numbers. Both strings and plain integers are accepted when decoding, and
/// identifiers are always encoded as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "SnowflakeRepr", into = "String")]
pub struct Snowflake(pub u64);

#[derive(Deserialize)]
#[serde(untagged)]
enum SnowflakeRepr {
    Text(String),
    Number(u64),
}

impl TryFrom<SnowflakeRepr> for Snowflake {
    type Error = ParseIntError;

    fn try_from(repr: SnowflakeRepr) -> Result<Self, Self::Error> {
        match repr {
            SnowflakeRepr::Text(text) => text.parse(),
            SnowflakeRepr::Number(n) => Ok(Snowflake(n)),
        }
    }
}

impl From<Snowflake> for String {
    fn from(id: Snowflake) -> Self {
        id.to_string()
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Snowflake(id)
    }
}

impl FromStr for Snowflake {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Snowflake)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The user's identifier.
    pub id: Snowflake,
    /// The user's name, not unique across the service.
    pub username: String,
    /// A four-digit tag distinguishing users with the same name.
    pub discriminator: String,
    /// The hash of the user's avatar, if they have set one.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether the account belongs to an application.
    #[serde(default)]
    pub bot: bool,
}

impl User {
    /// The discriminator as a number, if it is one.
    pub fn discriminator_number(&self) -> Option<u16> {
        self.discriminator.parse().ok()
    }
}

/// A text, voice, or direct-message channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// The channel's identifier.
    pub id: Snowflake,
    /// The numeric kind of channel.
    #[serde(rename = "type")]
    pub kind: u8,
    /// The guild the channel belongs to, unless it is a direct-message channel.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// The channel's name, unless it is a direct-message channel.
    #[serde(default)]
    pub name: Option<String>,
    /// The channel's topic, if it has one.
    #[serde(default)]
    pub topic: Option<String>,
}

/// A server: a collection of users and channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    /// The guild's identifier.
    pub id: Snowflake,
    /// The guild's name.
    pub name: String,
    /// The hash of the guild's icon, if it has one.
    #[serde(default)]
    pub icon: Option<String>,
    /// The hash of the guild's invite splash image, if it has one.
    #[serde(default)]
    pub splash: Option<String>,
    /// The user who owns the guild.
    pub owner_id: Snowflake,
}

/// A message sent in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The message's identifier.
    pub id: Snowflake,
    /// The channel the message was sent in.
    pub channel_id: Snowflake,
    /// The user who sent the message.
    pub author: User,
    /// The text of the message.
    pub content: String,
    /// When the message was sent, as an ISO 8601 timestamp.
    pub timestamp: String,
}
