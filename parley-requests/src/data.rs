//! Requests for the service's resources, decoding into the types in [`model`](crate::model).
//!
//! All of these are sent with the executor's own credentials.

use parley::{decode_json, Body, DecodeError, RawResponse, Request, Route};
use serde::Serialize;

use crate::{
    model::{Channel, Guild, Message, User},
    MessageError, Snowflake, API_BASE,
};

/// `GET /channels/{channel.id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GetChannel {
    /// The channel to look up.
    pub channel_id: Snowflake,
}

impl GetChannel {
    /// Look up a channel.
    pub fn new(channel_id: Snowflake) -> Self {
        GetChannel { channel_id }
    }
}

impl Request for GetChannel {
    type Response = Channel;

    fn route(&self) -> Route {
        Route::get(format!("{}/channels/{}", API_BASE, self.channel_id))
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<Channel>, DecodeError> {
        decode_json(response).map(Some)
    }
}

/// `GET /guilds/{guild.id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GetGuild {
    /// The guild to look up.
    pub guild_id: Snowflake,
}

impl GetGuild {
    /// Look up a guild.
    pub fn new(guild_id: Snowflake) -> Self {
        GetGuild { guild_id }
    }
}

impl Request for GetGuild {
    type Response = Guild;

    fn route(&self) -> Route {
        Route::get(format!("{}/guilds/{}", API_BASE, self.guild_id))
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<Guild>, DecodeError> {
        decode_json(response).map(Some)
    }
}

/// `GET /users/{user.id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GetUser {
    /// The user to look up.
    pub user_id: Snowflake,
}

impl GetUser {
    /// Look up a user.
    pub fn new(user_id: Snowflake) -> Self {
        GetUser { user_id }
    }
}

impl Request for GetUser {
    type Response = User;

    fn route(&self) -> Route {
        Route::get(format!("{}/users/{}", API_BASE, self.user_id))
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<User>, DecodeError> {
        decode_json(response).map(Some)
    }
}

/// `GET /users/@me`: the user whose credentials the executor holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GetCurrentUser;

impl Request for GetCurrentUser {
    type Response = User;

    fn route(&self) -> Route {
        Route::get(format!("{}/users/@me", API_BASE))
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<User>, DecodeError> {
        decode_json(response).map(Some)
    }
}

/// `GET /channels/{channel.id}/messages/{message.id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GetChannelMessage {
    /// The channel the message was sent in.
    pub channel_id: Snowflake,
    /// The message to look up.
    pub message_id: Snowflake,
}

impl GetChannelMessage {
    /// Look up one message in a channel.
    pub fn new(channel_id: Snowflake, message_id: Snowflake) -> Self {
        GetChannelMessage {
            channel_id,
            message_id,
        }
    }
}

impl Request for GetChannelMessage {
    type Response = Message;

    fn route(&self) -> Route {
        Route::get(format!(
            "{}/channels/{}/messages/{}",
            API_BASE, self.channel_id, self.message_id
        ))
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<Message>, DecodeError> {
        decode_json(response).map(Some)
    }
}

/// `POST /channels/{channel.id}/messages`, responding with the message that was created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CreateMessage {
    channel_id: Snowflake,
    content: String,
}

#[derive(Serialize)]
struct CreateMessageBody<'a> {
    content: &'a str,
}

impl CreateMessage {
    /// The most characters a message may contain.
    pub const MAX_LENGTH: usize = 2000;

    /// Send a text message to a channel.
    ///
    /// # Errors
    ///
    /// If `content` is empty, or longer than [`MAX_LENGTH`](CreateMessage::MAX_LENGTH)
    /// characters.
    pub fn new(channel_id: Snowflake, content: impl Into<String>) -> Result<Self, MessageError> {
        let content = content.into();
        match content.chars().count() {
            0 => Err(MessageError::Empty),
            length if length > Self::MAX_LENGTH => Err(MessageError::TooLong { length }),
            _ => Ok(CreateMessage {
                channel_id,
                content,
            }),
        }
    }

    /// The channel the message will be sent to.
    pub fn channel_id(&self) -> Snowflake {
        self.channel_id
    }

    /// The text of the message.
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl Request for CreateMessage {
    type Response = Message;

    fn route(&self) -> Route {
        Route::post(format!("{}/channels/{}/messages", API_BASE, self.channel_id))
    }

    fn body(&self) -> Body {
        // A struct of one string field always serializes.
        Body::json(&CreateMessageBody {
            content: &self.content,
        })
        .unwrap_or_default()
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<Message>, DecodeError> {
        decode_json(response).map(Some)
    }
}

/// `DELETE /channels/{channel.id}/messages/{message.id}`
///
/// The service answers with `204 No Content`, so a successful deletion yields `()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeleteMessage {
    /// The channel the message was sent in.
    pub channel_id: Snowflake,
    /// The message to delete.
    pub message_id: Snowflake,
}

impl DeleteMessage {
    /// Delete one message from a channel.
    pub fn new(channel_id: Snowflake, message_id: Snowflake) -> Self {
        DeleteMessage {
            channel_id,
            message_id,
        }
    }
}

impl Request for DeleteMessage {
    type Response = ();

    fn route(&self) -> Route {
        Route::delete(format!(
            "{}/channels/{}/messages/{}",
            API_BASE, self.channel_id, self.message_id
        ))
    }

    fn decode(&self, _response: &RawResponse) -> Result<Option<()>, DecodeError> {
        Ok(Some(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_content_is_checked_in_characters() {
        assert_eq!(CreateMessage::new(Snowflake(1), ""), Err(MessageError::Empty));
        assert!(CreateMessage::new(Snowflake(1), "é".repeat(2000)).is_ok());
        assert_eq!(
            CreateMessage::new(Snowflake(1), "x".repeat(2001)),
            Err(MessageError::TooLong { length: 2001 })
        );
    }

    #[test]
    fn message_body_is_json() {
        let request = CreateMessage::new(Snowflake(7), "say \"hi\"").unwrap();
        assert_eq!(
            request.body(),
            Body::Json(r#"{"content":"say \"hi\""}"#.to_string())
        );
        assert_eq!(
            request.route(),
            Route::post("https://discord.com/api/v10/channels/7/messages")
        );
    }

    #[test]
    fn deletion_ignores_the_empty_body() {
        let request = DeleteMessage::new(Snowflake(1), Snowflake(2));
        assert_eq!(request.decode(&RawResponse::new(204, "")), Ok(Some(())));
        assert_eq!(
            request.route(),
            Route::delete("https://discord.com/api/v10/channels/1/messages/2")
        );
    }
}
