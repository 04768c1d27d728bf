//! Requests for images served by the content delivery network.
//!
//! Each kind of image is served in a fixed set of formats, and every image can be requested at any
//! power-of-two size from 16 to 2048 pixels. Both are checked when the descriptor is constructed:
//!
//! ```
//! use parley_requests::{image::CdnImage, ImageError, ImageFormat, Snowflake};
//!
//! let icon = CdnImage::guild_icon(Snowflake(1), "a1b2", ImageFormat::WebP, 128).unwrap();
//! assert_eq!(icon.url(), "https://cdn.discordapp.com/icons/1/a1b2.webp?size=128");
//!
//! assert!(matches!(
//!     CdnImage::guild_icon(Snowflake(1), "a1b2", ImageFormat::Gif, 128),
//!     Err(ImageError::UnsupportedFormat { .. })
//! ));
//! assert!(matches!(
//!     CdnImage::guild_icon(Snowflake(1), "a1b2", ImageFormat::Png, 100),
//!     Err(ImageError::InvalidSize { size: 100 })
//! ));
//! ```
//!
//! Images are public, so these requests do not ask the executor to attach credentials, and they
//! decode to the raw bytes of the image.

use bytes::Bytes;
use parley::{DecodeError, RawResponse, Request, Route};
use std::fmt;

use crate::{ImageError, Snowflake, CDN_BASE};

/// An image encoding served by the content delivery network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Portable Network Graphics
    Png,
    /// JPEG
    Jpeg,
    /// WebP
    WebP,
    /// Graphics Interchange Format, only for animated images.
    Gif,
}

impl ImageFormat {
    /// The file extension the content delivery network uses for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::WebP => "webp",
            ImageFormat::Gif => "gif",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// The formats guild icons, guild splashes, and application icons are served in.
pub const STATIC_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

/// The formats user avatars are served in.
pub const AVATAR_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Gif,
];

/// The edge length of a requested image, in pixels: a power of two from 16 to 2048.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageSize(u32);

impl ImageSize {
    /// The smallest size served.
    pub const MIN: ImageSize = ImageSize(16);
    /// The largest size served.
    pub const MAX: ImageSize = ImageSize(2048);

    /// Check that `size` is a size the content delivery network serves.
    pub fn new(size: u32) -> Result<Self, ImageError> {
        if size.is_power_of_two() && (Self::MIN.0..=Self::MAX.0).contains(&size) {
            Ok(ImageSize(size))
        } else {
            Err(ImageError::InvalidSize { size })
        }
    }

    /// The size in pixels.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for ImageSize {
    type Error = ImageError;

    fn try_from(size: u32) -> Result<Self, Self::Error> {
        ImageSize::new(size)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// `GET` an image from the content delivery network.
///
/// Construct one with the function for the kind of image wanted; each checks the format and size
/// it is given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CdnImage {
    path: String,
    format: ImageFormat,
    size: ImageSize,
}

fn check_format(format: ImageFormat, allowed: &'static [ImageFormat]) -> Result<(), ImageError> {
    if allowed.contains(&format) {
        Ok(())
    } else {
        Err(ImageError::UnsupportedFormat { format, allowed })
    }
}

impl CdnImage {
    fn new(
        path: String,
        format: ImageFormat,
        allowed: &'static [ImageFormat],
        size: u32,
    ) -> Result<Self, ImageError> {
        check_format(format, allowed)?;
        Ok(CdnImage {
            path,
            format,
            size: ImageSize::new(size)?,
        })
    }

    /// A custom emoji. Its format is fixed: GIF if the emoji is animated, PNG otherwise.
    pub fn emoji(emoji_id: Snowflake, animated: bool, size: u32) -> Result<Self, ImageError> {
        let format = if animated {
            ImageFormat::Gif
        } else {
            ImageFormat::Png
        };
        Ok(CdnImage {
            path: format!("emojis/{}", emoji_id),
            format,
            size: ImageSize::new(size)?,
        })
    }

    /// A guild's icon, identified by its hash.
    pub fn guild_icon(
        guild_id: Snowflake,
        hash: &str,
        format: ImageFormat,
        size: u32,
    ) -> Result<Self, ImageError> {
        CdnImage::new(
            format!("icons/{}/{}", guild_id, hash),
            format,
            STATIC_FORMATS,
            size,
        )
    }

    /// A guild's invite splash image, identified by its hash.
    pub fn guild_splash(
        guild_id: Snowflake,
        hash: &str,
        format: ImageFormat,
        size: u32,
    ) -> Result<Self, ImageError> {
        CdnImage::new(
            format!("splashes/{}/{}", guild_id, hash),
            format,
            STATIC_FORMATS,
            size,
        )
    }

    /// A user's avatar, identified by its hash. Avatars may also be requested as GIFs.
    pub fn user_avatar(
        user_id: Snowflake,
        hash: &str,
        format: ImageFormat,
        size: u32,
    ) -> Result<Self, ImageError> {
        CdnImage::new(
            format!("avatars/{}/{}", user_id, hash),
            format,
            AVATAR_FORMATS,
            size,
        )
    }

    /// An application's icon, identified by its hash.
    pub fn application_icon(
        application_id: Snowflake,
        hash: &str,
        format: ImageFormat,
        size: u32,
    ) -> Result<Self, ImageError> {
        CdnImage::new(
            format!("app-icons/{}/{}", application_id, hash),
            format,
            STATIC_FORMATS,
            size,
        )
    }

    /// The avatar shown for users who have not set one. There are five, chosen by the user's
    /// discriminator, and they are only served as PNG.
    pub fn default_avatar(discriminator: u16, size: u32) -> Result<Self, ImageError> {
        Ok(CdnImage {
            path: format!("embed/avatars/{}", discriminator % 5),
            format: ImageFormat::Png,
            size: ImageSize::new(size)?,
        })
    }

    /// The format of the image.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// The size of the image.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// The absolute URL of the image.
    pub fn url(&self) -> String {
        format!(
            "{}/{}.{}?size={}",
            CDN_BASE,
            self.path,
            self.format.extension(),
            self.size
        )
    }
}

impl Request for CdnImage {
    type Response = Bytes;

    fn route(&self) -> Route {
        Route::get(self.url())
    }

    fn requires_auth(&self) -> bool {
        false
    }

    fn decode(&self, response: &RawResponse) -> Result<Option<Bytes>, DecodeError> {
        if response.body().is_empty() {
            Err(DecodeError::new("image response had no body"))
        } else {
            Ok(Some(response.body().clone()))
        }
    }
}
