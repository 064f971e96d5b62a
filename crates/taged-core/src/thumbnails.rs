//! Thumbnail naming convention
//!
//! Images get `_thumb_large` and `_thumb_small` siblings next to the original,
//! e.g. `photo.png` -> `photo_thumb_small.png`.

use once_cell::sync::Lazy;
use regex::Regex;

const LARGE_SUFFIX: &str = "_thumb_large";
const SMALL_SUFFIX: &str = "_thumb_small";

static LARGE_THUMB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_thumb_large\.[a-z]+$").expect("valid thumbnail regex"));
static SMALL_THUMB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_thumb_small\.[a-z]+$").expect("valid thumbnail regex"));

/// Map a thumbnail URL back to the original image URL.
///
/// Only a suffix directly before a lowercase extension counts; anything else
/// is returned unchanged.
pub fn origin_image_url(thumb: &str) -> String {
    if LARGE_THUMB.is_match(thumb) {
        return thumb.replacen(LARGE_SUFFIX, "", 1);
    }
    if SMALL_THUMB.is_match(thumb) {
        return thumb.replacen(SMALL_SUFFIX, "", 1);
    }
    thumb.to_string()
}

/// Small thumbnail URL for an image; names without an extension are unchanged
pub fn small_thumbnail(image: &str) -> String {
    match image.rsplit_once('.') {
        Some((stem, extension)) => format!("{}{}.{}", stem, SMALL_SUFFIX, extension),
        None => image.to_string(),
    }
}
