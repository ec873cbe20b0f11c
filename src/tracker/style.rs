use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::tracker::TrackerError;

const FILL_ALPHA: f32 = 0.4;
const STALE_FILL_ALPHA: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: f32,
}

impl Rgba {
    pub const GRAY: Rgba = Rgba::opaque(0x80, 0x80, 0x80);
    pub const GREEN: Rgba = Rgba::opaque(0x00, 0x80, 0x00);

    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha: 1.0,
        }
    }

    /// Accepts `RRGGBB` or `RGB`, with or without a leading `#`.
    pub fn from_hex(value: &str) -> Result<Self, TrackerError> {
        let invalid = || TrackerError::InvalidColor(value.to_string());
        let digits = value.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

        match digits.len() {
            6 => Ok(Self::opaque(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                let short = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
                Ok(Self::opaque(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(invalid()),
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    pub fn to_css_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Directional marker, used while the latest sample carries a heading.
    Pointer,
    /// Flat disc.
    Flat,
}

impl MaterialKind {
    pub fn for_heading(has_heading: bool) -> Self {
        if has_heading {
            MaterialKind::Pointer
        } else {
            MaterialKind::Flat
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Pointer { image: String, color: Rgba },
    Flat { color: Rgba },
}

impl Material {
    pub fn kind(&self) -> MaterialKind {
        match self {
            Material::Pointer { .. } => MaterialKind::Pointer,
            Material::Flat { .. } => MaterialKind::Flat,
        }
    }

    pub fn color(&self) -> Rgba {
        match self {
            Material::Pointer { color, .. } | Material::Flat { color } => *color,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ChannelColors {
    fill: Rgba,
    label: Rgba,
}

/// Per-channel colors and materials.
///
/// Materials are built once per (channel, kind) and shared until the
/// channel's colors change or it enters or leaves the stale set, at which
/// point [`StyleBook::invalidate`] drops them.
#[derive(Debug)]
pub struct StyleBook {
    pointer_url: String,
    colors: HashMap<String, ChannelColors>,
    materials: HashMap<(String, MaterialKind), Arc<Material>>,
}

impl StyleBook {
    pub fn new(pointer_url: impl Into<String>) -> Self {
        Self {
            pointer_url: pointer_url.into(),
            colors: HashMap::new(),
            materials: HashMap::new(),
        }
    }

    pub fn has_color(&self, channel: &str) -> bool {
        self.colors.contains_key(channel)
    }

    /// Assigns a channel color and returns the translucent fill variant.
    pub fn add_color(&mut self, channel: &str, hex: &str) -> Result<Rgba, TrackerError> {
        let label = Rgba::from_hex(hex)?;
        let fill = label.with_alpha(FILL_ALPHA);
        self.colors
            .insert(channel.to_string(), ChannelColors { fill, label });
        self.invalidate(channel);
        Ok(fill)
    }

    pub fn resolve_color(&self, channel: &str, for_label: bool, stale: bool) -> Rgba {
        if stale {
            return if for_label {
                Rgba::GRAY
            } else {
                Rgba::GRAY.with_alpha(STALE_FILL_ALPHA)
            };
        }
        match self.colors.get(channel) {
            Some(colors) if for_label => colors.label,
            Some(colors) => colors.fill,
            None => Rgba::GREEN,
        }
    }

    pub fn resolve_material(
        &mut self,
        channel: &str,
        has_heading: bool,
        stale: bool,
    ) -> Arc<Material> {
        let kind = MaterialKind::for_heading(has_heading);
        if let Some(material) = self.materials.get(&(channel.to_string(), kind)) {
            return material.clone();
        }

        let color = self.resolve_color(channel, false, stale);
        let material = Arc::new(match kind {
            MaterialKind::Pointer => Material::Pointer {
                image: self.pointer_url.clone(),
                color,
            },
            MaterialKind::Flat => Material::Flat { color },
        });
        self.materials
            .insert((channel.to_string(), kind), material.clone());
        material
    }

    pub fn invalidate(&mut self, channel: &str) {
        self.materials.retain(|(owner, _), _| owner != channel);
    }
}
