//! Ready-made [`Request`](parley::Request) descriptors for a chat-service REST API.
//!
//! Every descriptor validates its inputs when it is constructed, so a descriptor that exists can
//! always be submitted. The descriptors fall into three groups:
//!
//! - [`data`]: looking up and manipulating channels, guilds, users, and messages, which decode
//!   JSON into the types in [`model`].
//! - [`image`]: fetching images from the content delivery network, with sizes and formats checked
//!   against what each kind of image supports.
//! - [`oauth`]: building authorization URLs and exchanging codes and refresh tokens for access
//!   tokens.
//!
//! ```
//! use futures::{executor::block_on, StreamExt};
//! use parley::{RawResponse, RequestExt};
//! use parley_loopback::Loopback;
//! use parley_requests::{data::GetCurrentUser, Snowflake};
//!
//! let executor = Loopback::new(|_| {
//!     Ok(RawResponse::ok(
//!         r#"{"id":"80351110224678912","username":"nelly","discriminator":"1337","avatar":null}"#,
//!     ))
//! });
//!
//! let program = GetCurrentUser.wrap().map(|user| user.id);
//! let ids: Vec<Snowflake> = block_on(program.run(&executor).collect());
//! assert_eq!(ids, vec![Snowflake(80351110224678912)]);
//! ```

#![allow(clippy::type_complexity)]
#![warn(missing_docs)]
#![warn(missing_copy_implementations, missing_debug_implementations)]
#![warn(unused_qualifications, unused_results)]
#![warn(future_incompatible)]
#![warn(unused)]
#![forbid(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod data;
pub mod image;
pub mod model;
pub mod oauth;

mod error;

pub use error::{ImageError, MessageError, UnknownScope};
pub use image::{ImageFormat, ImageSize};
pub use model::Snowflake;

/// The base URI of the versioned REST API.
pub const API_BASE: &str = "https://discord.com/api/v10";

/// The base URI of the content delivery network serving images.
pub const CDN_BASE: &str = "https://cdn.discordapp.com";
