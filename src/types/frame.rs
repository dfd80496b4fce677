use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// One still capture from the camera, already cropped to the visible
/// preview region and JPEG-encoded. Immutable once taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(jpeg: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            jpeg,
            width,
            height,
        }
    }
}

/// The finished composite: three photo bands plus an optional caption band,
/// PNG-encoded. Replaced wholesale when a caption is saved, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Strip {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Strip {
    pub fn new(png: Vec<u8>, width: u32, height: u32) -> Self {
        Self { png, width, height }
    }

    /// The strip as a `data:` URI, for surfaces that take inline images.
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_has_png_prefix_and_base64_payload() {
        let strip = Strip::new(vec![0x89, 0x50, 0x4E, 0x47], 800, 2540);
        let uri = strip.data_uri();
        assert!(uri.starts_with("data:image/png;base64,"));
        let payload = uri.trim_start_matches("data:image/png;base64,");
        let decoded = STANDARD.decode(payload).unwrap();
        assert_eq!(decoded, strip.png);
    }
}
