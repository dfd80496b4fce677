use std::borrow::Cow;
use std::path::Path;

use crate::types::error::{BoothError, BoothResult};

/// RGBA8 brush color carried through Parley text layouts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Family used when no handwriting font could be loaded.
const FALLBACK_FAMILY: &str = "cursive";

/// Stateful helper for shaping the caption. Holds the Parley contexts plus
/// the registered handwriting font, if any.
pub struct CaptionLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    custom_family: Option<String>,
}

impl Default for CaptionLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionLayoutEngine {
    /// Construct a new engine with fresh Parley contexts and no custom font.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            custom_family: None,
        }
    }

    /// Best-effort load of the handwriting font. This is a capability check:
    /// any failure leaves the engine on the generic cursive fallback and
    /// returns `false`.
    pub fn load_font_file(&mut self, path: &Path) -> bool {
        match std::fs::read(path) {
            Ok(bytes) => self.register_font_bytes(bytes),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "caption font unavailable, using fallback");
                false
            }
        }
    }

    /// Register raw font bytes and remember the first family they provide.
    pub fn register_font_bytes(&mut self, bytes: Vec<u8>) -> bool {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes), None);
        let family = families
            .first()
            .and_then(|(id, _)| self.font_ctx.collection.family_name(*id))
            .map(str::to_string);
        match family {
            Some(name) => {
                tracing::info!(family = %name, "caption font loaded");
                self.custom_family = Some(name);
                true
            }
            None => {
                tracing::warn!("font bytes registered no families, using fallback");
                false
            }
        }
    }

    /// The family the caption will be shaped with.
    pub fn family(&self) -> &str {
        self.custom_family.as_deref().unwrap_or(FALLBACK_FAMILY)
    }

    /// Shape the caption into a centered layout no wider than
    /// `max_width_px`.
    pub fn layout_caption(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
        max_width_px: f32,
    ) -> BoothResult<parley::Layout<TextBrushRgba8>> {
        if text.is_empty() {
            return Err(BoothError::compose("caption text must be non-empty"));
        }
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(BoothError::compose("caption size must be finite and > 0"));
        }

        let family = self.family().to_string();
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(family)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::BOLD,
        ));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(Some(max_width_px));
        layout.align(
            Some(max_width_px),
            parley::Alignment::Middle,
            parley::AlignmentOptions::default(),
        );
        Ok(layout)
    }
}
