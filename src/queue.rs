use base64::{engine::general_purpose::STANDARD, Engine};
use std::io::Cursor;

/// One captured screenshot awaiting the combined solve request. Immutable
/// once created.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotItem {
    /// PNG data URL.
    pub image: String,
    /// Target language selected at capture time.
    pub language: String,
}

/// Ordered, content-deduplicated queue of captured screenshots.
#[derive(Debug, Default)]
pub struct ScreenshotQueue {
    items: Vec<ScreenshotItem>,
}

impl ScreenshotQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: an image identical to one already queued is dropped
    /// silently and `false` is returned.
    pub fn enqueue(&mut self, image: String, language: String) -> bool {
        if self.items.iter().any(|item| item.image == image) {
            return false;
        }
        self.items.push(ScreenshotItem { image, language });
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Everything currently queued, in capture order. Does not clear: the
    /// solve flow clears explicitly once its dispatch has returned.
    pub fn snapshot(&self) -> Vec<ScreenshotItem> {
        self.items.clone()
    }

    /// The combined request carries one target language: the first item's.
    pub fn first_language(&self) -> Option<&str> {
        self.items.first().map(|item| item.language.as_str())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

const MAX_CAPTURE_WIDTH: u32 = 1280;

/// Encode a raw RGBA frame from the host shell into the queue's PNG data-URL
/// form, downscaling wide captures first.
pub fn encode_capture(rgba: &[u8], width: u32, height: u32) -> Result<String, String> {
    let image = image::RgbaImage::from_raw(width, height, rgba.to_vec())
        .ok_or_else(|| "frame size does not match its dimensions".to_string())?;

    let image = if width > MAX_CAPTURE_WIDTH {
        let scale = MAX_CAPTURE_WIDTH as f64 / width as f64;
        let new_height = (height as f64 * scale) as u32;
        image::imageops::resize(
            &image,
            MAX_CAPTURE_WIDTH,
            new_height,
            image::imageops::FilterType::Triangle,
        )
    } else {
        image
    };

    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| format!("Failed to encode image: {}", e))?;

    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(buffer.into_inner())
    ))
}
