//! The OAuth2 authorization code and client credentials flows.
//!
//! An application first sends the user to an [`AuthorizationUrl`]. The user is redirected back
//! with a code, which [`ExchangeCode`] trades for an [`AccessToken`]. When that expires,
//! [`RefreshToken`] obtains a new one. Applications acting on their own behalf can skip all of
//! this with a [`ClientCredentialsGrant`].
//!
//! The token requests authenticate with the application's [`ClientCredentials`] instead of the
//! executor's, so none of them [require auth](parley::Request::requires_auth).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use parley::{decode_json, Body, DecodeError, Header, RawResponse, Request, Route};
use serde::{Deserialize, Deserializer};
use std::{fmt, str::FromStr, time::Duration};
use url::{form_urlencoded, Url};

use crate::{Snowflake, UnknownScope};

/// Where users are sent to authorize an application.
pub const AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";

/// Where codes and refresh tokens are exchanged for access tokens.
pub const TOKEN_URL: &str = "https://discord.com/api/v10/oauth2/token";

/// A permission an application may ask a user for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum Scope {
    /// `identify`: read the user's account, without their email.
    Identify,
    /// `email`: read the user's email address.
    Email,
    /// `connections`: read the user's linked third-party accounts.
    Connections,
    /// `guilds`: list the guilds the user is in.
    Guilds,
    /// `guilds.join`: add the user to a guild.
    GuildsJoin,
    /// `guilds.members.read`: read the user's membership in their guilds.
    GuildsMembersRead,
    /// `bot`: add the application's bot to a guild.
    Bot,
    /// `applications.commands`: register commands in a guild.
    ApplicationsCommands,
    /// `messages.read`: read messages from the user's local client.
    MessagesRead,
    /// `webhook.incoming`: create a webhook in a channel the user picks.
    WebhookIncoming,
}

impl Scope {
    /// Every scope.
    pub const ALL: &'static [Scope] = &[
        Scope::Identify,
        Scope::Email,
        Scope::Connections,
        Scope::Guilds,
        Scope::GuildsJoin,
        Scope::GuildsMembersRead,
        Scope::Bot,
        Scope::ApplicationsCommands,
        Scope::MessagesRead,
        Scope::WebhookIncoming,
    ];

    /// The token naming this scope on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Identify => "identify",
            Scope::Email => "email",
            Scope::Connections => "connections",
            Scope::Guilds => "guilds",
            Scope::GuildsJoin => "guilds.join",
            Scope::GuildsMembersRead => "guilds.members.read",
            Scope::Bot => "bot",
            Scope::ApplicationsCommands => "applications.commands",
            Scope::MessagesRead => "messages.read",
            Scope::WebhookIncoming => "webhook.incoming",
        }
    }

    /// Parse a space-delimited list of scopes, skipping any token which is not a known scope.
    pub fn parse_list(text: &str) -> Vec<Scope> {
        text.split_whitespace()
            .filter_map(|token| token.parse().ok())
            .collect()
    }

    /// Render scopes as the space-delimited list the service expects.
    pub fn join(scopes: &[Scope]) -> String {
        scopes
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .iter()
            .copied()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| UnknownScope(s.to_string()))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the user is asked to approve an application they have already authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prompt {
    /// Always ask.
    Consent,
    /// Skip the question if the application is already authorized.
    None,
}

impl Prompt {
    fn as_str(&self) -> &'static str {
        match self {
            Prompt::Consent => "consent",
            Prompt::None => "none",
        }
    }
}

/// A builder for the URL users visit to authorize an application.
///
/// ```
/// use parley_requests::{oauth::{AuthorizationUrl, Prompt, Scope}, Snowflake};
/// use url::Url;
///
/// let url = AuthorizationUrl::new(Snowflake(157730590492196864))
///     .scope(Scope::Identify)
///     .scope(Scope::Guilds)
///     .state("15773059ghq9183habn")
///     .redirect_uri(Url::parse("https://nicememe.website").unwrap())
///     .prompt(Prompt::Consent)
///     .build();
///
/// assert_eq!(
///     url.as_str(),
///     "https://discord.com/oauth2/authorize?response_type=code&client_id=157730590492196864\
///      &scope=identify+guilds&state=15773059ghq9183habn\
///      &redirect_uri=https%3A%2F%2Fnicememe.website%2F&prompt=consent",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationUrl {
    client_id: Snowflake,
    scopes: Vec<Scope>,
    state: Option<String>,
    redirect_uri: Option<Url>,
    prompt: Option<Prompt>,
}

impl AuthorizationUrl {
    /// Start building an authorization URL for the application with the given client id.
    pub fn new(client_id: Snowflake) -> Self {
        AuthorizationUrl {
            client_id,
            scopes: Vec::new(),
            state: None,
            redirect_uri: None,
            prompt: None,
        }
    }

    /// Ask for one more scope. Asking twice for the same scope has no further effect.
    pub fn scope(mut self, scope: Scope) -> Self {
        if !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
        self
    }

    /// Ask for each of several scopes.
    pub fn scopes(self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        scopes.into_iter().fold(self, AuthorizationUrl::scope)
    }

    /// An opaque value the service hands back unchanged with the code, to tie the redirect to
    /// the session that started it.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Where the user is redirected after authorizing. It must be registered with the
    /// application.
    pub fn redirect_uri(mut self, redirect_uri: Url) -> Self {
        self.redirect_uri = Some(redirect_uri);
        self
    }

    /// Whether to ask users who have already authorized the application.
    pub fn prompt(mut self, prompt: Prompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Build the URL.
    pub fn build(&self) -> Url {
        let mut url = Url::parse(AUTHORIZE_URL).expect("authorization endpoint is a valid URL");
        {
            let mut query = url.query_pairs_mut();
            let _ = query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id.to_string());
            if !self.scopes.is_empty() {
                let _ = query.append_pair("scope", &Scope::join(&self.scopes));
            }
            if let Some(state) = &self.state {
                let _ = query.append_pair("state", state);
            }
            if let Some(redirect_uri) = &self.redirect_uri {
                let _ = query.append_pair("redirect_uri", redirect_uri.as_str());
            }
            if let Some(prompt) = self.prompt {
                let _ = query.append_pair("prompt", prompt.as_str());
            }
        }
        url
    }
}

/// An application's client id and secret, used to authenticate token requests.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    client_id: Snowflake,
    client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl ClientCredentials {
    /// Construct client credentials.
    pub fn new(client_id: Snowflake, client_secret: impl Into<String>) -> Self {
        ClientCredentials {
            client_id,
            client_secret: client_secret.into(),
        }
    }

    /// The application's client id.
    pub fn client_id(&self) -> Snowflake {
        self.client_id
    }

    /// The HTTP basic `Authorization` header carrying these credentials.
    pub fn header(&self) -> Header {
        let pair = format!("{}:{}", self.client_id, self.client_secret);
        Header::new("Authorization", format!("Basic {}", STANDARD.encode(pair)))
    }
}

/// The token issued by a successful token request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    /// The token itself.
    pub access_token: String,
    /// How the token is presented, usually `Bearer`.
    pub token_type: String,
    /// How many seconds the token is valid for.
    pub expires_in: u64,
    /// A token which can be used to obtain a new access token, if one was issued.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// The scopes the token grants. Scopes this crate does not know about are left out.
    #[serde(rename = "scope", default, deserialize_with = "scopes_from_text")]
    pub scopes: Vec<Scope>,
}

impl AccessToken {
    /// How long the token is valid for.
    pub fn expires_in(&self) -> Duration {
        Duration::from_secs(self.expires_in)
    }

    /// The value of the `Authorization` header which presents this token.
    pub fn header(&self) -> Header {
        Header::new(
            "Authorization",
            format!("{} {}", self.token_type, self.access_token),
        )
    }
}

fn scopes_from_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Scope>, D::Error> {
    let text = String::deserialize(deserializer)?;
    Ok(Scope::parse_list(&text))
}

fn form(pairs: &[(&str, &str)]) -> Body {
    Body::Form(
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish(),
    )
}

/// Trade the code a user was redirected back with for an [`AccessToken`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeCode {
    credentials: ClientCredentials,
    code: String,
    redirect_uri: Url,
}

impl ExchangeCode {
    /// Exchange `code`. The `redirect_uri` must be the one the code was issued to.
    pub fn new(credentials: ClientCredentials, code: impl Into<String>, redirect_uri: Url) -> Self {
        ExchangeCode {
            credentials,
            code: code.into(),
            redirect_uri,
        }
    }
}

impl Request for ExchangeCode {
    type Response = AccessToken;

    fn route(&self) -> Route {
        Route::post(TOKEN_URL)
    }

    fn body(&self) -> Body {
        form(&[
            ("grant_type", "authorization_code"),
            ("code", self.code.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
    }

    fn headers(&self) -> Vec<Header> {
        vec![self.credentials.header()]
    }

    fn requires_auth(&self) -> bool {
        false
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<AccessToken>, DecodeError> {
        decode_json(response).map(Some)
    }
}

/// Obtain a new [`AccessToken`] with the refresh token issued alongside an old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    credentials: ClientCredentials,
    refresh_token: String,
}

impl RefreshToken {
    /// Refresh with `refresh_token`.
    pub fn new(credentials: ClientCredentials, refresh_token: impl Into<String>) -> Self {
        RefreshToken {
            credentials,
            refresh_token: refresh_token.into(),
        }
    }
}

impl Request for RefreshToken {
    type Response = AccessToken;

    fn route(&self) -> Route {
        Route::post(TOKEN_URL)
    }

    fn body(&self) -> Body {
        form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", self.refresh_token.as_str()),
        ])
    }

    fn headers(&self) -> Vec<Header> {
        vec![self.credentials.header()]
    }

    fn requires_auth(&self) -> bool {
        false
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<AccessToken>, DecodeError> {
        decode_json(response).map(Some)
    }
}

/// Obtain an [`AccessToken`] for the application itself, with no user involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentialsGrant {
    credentials: ClientCredentials,
    scopes: Vec<Scope>,
}

impl ClientCredentialsGrant {
    /// Ask for a token granting `scopes`.
    pub fn new(credentials: ClientCredentials, scopes: impl IntoIterator<Item = Scope>) -> Self {
        ClientCredentialsGrant {
            credentials,
            scopes: scopes.into_iter().collect(),
        }
    }
}

impl Request for ClientCredentialsGrant {
    type Response = AccessToken;

    fn route(&self) -> Route {
        Route::post(TOKEN_URL)
    }

    fn body(&self) -> Body {
        form(&[
            ("grant_type", "client_credentials"),
            ("scope", Scope::join(&self.scopes).as_str()),
        ])
    }

    fn headers(&self) -> Vec<Header> {
        vec![self.credentials.header()]
    }

    fn requires_auth(&self) -> bool {
        false
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<AccessToken>, DecodeError> {
        decode_json(response).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> ClientCredentials {
        ClientCredentials::new(Snowflake(1234), "s3cr3t")
    }

    #[test]
    fn scopes_round_trip_through_their_tokens() {
        for scope in Scope::ALL {
            assert_eq!(scope.as_str().parse::<Scope>(), Ok(*scope));
        }
        assert_eq!(
            "guilds.write".parse::<Scope>(),
            Err(UnknownScope("guilds.write".to_string()))
        );
    }

    #[test]
    fn unknown_scopes_are_dropped_from_lists() {
        assert_eq!(
            Scope::parse_list("identify  rpc.voice.write guilds.join\temail"),
            vec![Scope::Identify, Scope::GuildsJoin, Scope::Email]
        );
        assert!(Scope::parse_list("").is_empty());
    }

    #[test]
    fn authorization_url_without_options() {
        let url = AuthorizationUrl::new(Snowflake(42))
            .scopes([Scope::Bot, Scope::Bot])
            .build();
        assert_eq!(
            url.as_str(),
            "https://discord.com/oauth2/authorize?response_type=code&client_id=42&scope=bot"
        );
    }

    #[test]
    fn client_credentials_use_basic_auth() {
        let header = credentials().header();
        assert_eq!(header.name, "Authorization");
        // base64("1234:s3cr3t")
        assert_eq!(header.value, "Basic MTIzNDpzM2NyM3Q=");
        assert!(!format!("{:?}", credentials()).contains("s3cr3t"));
    }

    #[test]
    fn token_requests_are_form_encoded() {
        let redirect = Url::parse("https://app.test/callback?from=login").unwrap();
        let exchange = ExchangeCode::new(credentials(), "abc&def", redirect);
        assert_eq!(
            exchange.body(),
            Body::Form(
                "grant_type=authorization_code&code=abc%26def\
                 &redirect_uri=https%3A%2F%2Fapp.test%2Fcallback%3Ffrom%3Dlogin"
                    .to_string()
            )
        );
        assert_eq!(exchange.route(), Route::post(TOKEN_URL));
        assert!(!exchange.requires_auth());
        assert_eq!(exchange.headers(), vec![credentials().header()]);

        let grant = ClientCredentialsGrant::new(credentials(), [Scope::Identify, Scope::Connections]);
        assert_eq!(
            grant.body(),
            Body::Form("grant_type=client_credentials&scope=identify+connections".to_string())
        );

        let refresh = RefreshToken::new(credentials(), "r-1");
        assert_eq!(
            refresh.body(),
            Body::Form("grant_type=refresh_token&refresh_token=r-1".to_string())
        );
    }

    #[test]
    fn access_tokens_decode_their_scope_list() {
        let response = RawResponse::ok(
            r#"{
                "access_token": "6qrZcUqja7812RVdnEKjpzOL4CvHBFG",
                "token_type": "Bearer",
                "expires_in": 604800,
                "refresh_token": "D43f5y0ahjqew82jZ4NViEr2YafMKhue",
                "scope": "identify guilds.members.read activities.read"
            }"#,
        );
        let token = RefreshToken::new(credentials(), "D43f5y0ahjqew82jZ4NViEr2YafMKhue")
            .decode(&response)
            .unwrap()
            .unwrap();
        assert_eq!(token.scopes, vec![Scope::Identify, Scope::GuildsMembersRead]);
        assert_eq!(token.expires_in(), Duration::from_secs(604800));
        assert_eq!(
            token.header().value,
            "Bearer 6qrZcUqja7812RVdnEKjpzOL4CvHBFG"
        );
    }
}
