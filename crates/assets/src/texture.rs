use parkscape_common::Rgba;
use parkscape_kernel::SpriteData;
use serde::{Deserialize, Serialize};

/// An RGBA image decoded from a palette-indexed sprite. Rows run top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Rgba>,
}

impl Texture {
    /// The empty texture returned for sprites that have no pixels.
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Decode a sprite through a palette. Index 0 is transparent.
    ///
    /// Pixels missing from a short buffer are left transparent.
    pub fn from_sprite(sprite: &SpriteData, palette: impl Fn(u8) -> Rgba) -> Self {
        let (width, height) = (sprite.width as u32, sprite.height as u32);
        let area = sprite.area();
        if area == 0 || sprite.pixels.is_empty() {
            return Self::placeholder();
        }

        let mut pixels = vec![Rgba::TRANSPARENT; area];
        for (slot, &index) in pixels.iter_mut().zip(&sprite.pixels) {
            if index != 0 {
                *slot = palette(index);
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}
