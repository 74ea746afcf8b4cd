//! Messages exchanged with the page overlay script, as JSON

use crate::error::*;
use crate::selection::PaletteState;
use serde::{Deserialize, Serialize};

/// Value of [`OverlayRequest::action`]
pub const PREPARE_OVERLAY_ACTION: &str = "prepareForOverlayPlacement";

/// Everything the page needs to draw the guide over the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRequest {
    /// Always [`PREPARE_OVERLAY_ACTION`]
    pub action: String,
    /// Quantized grid upscaled back to the original size
    pub pixel_art_data_url: String,
    /// Quantized grid, one pixel per block
    pub scaled_image_data_url: String,
    /// The grid before palette matching, so the page can rematch it
    pub unscaled_image_data_url: String,
    /// The scale percentage the grid was made with
    pub pixel_scale: f64,
    /// Selected colors, `[[r, g, b], …]`
    pub palette: Vec<[u8; 3]>,
    pub original_image_width: usize,
    pub original_image_height: usize,
}

impl OverlayRequest {
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|_| EncodeFailed)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|_| DecodeFailed)
    }
}

/// The page's reply listing unlocked colors as `rgb(R, G, B)` strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableColorsResponse {
    #[serde(default)]
    pub available_colors: Vec<String>,
}

impl AvailableColorsResponse {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|_| DecodeFailed)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|_| EncodeFailed)
    }

    /// See [`PaletteState::apply_available`]. An empty list falls back to free colors.
    pub fn apply_to(&self, state: &mut PaletteState) {
        state.apply_available(self.available_colors.as_slice());
    }
}

#[test]
fn request_json_shape() {
    let req = OverlayRequest {
        action: PREPARE_OVERLAY_ACTION.into(),
        pixel_art_data_url: "data:image/png;base64,Ag==".into(),
        scaled_image_data_url: "data:image/png;base64,AA==".into(),
        unscaled_image_data_url: "data:image/png;base64,AQ==".into(),
        pixel_scale: 8.,
        palette: vec![[0, 0, 0], [255, 255, 255]],
        original_image_width: 20,
        original_image_height: 10,
    };
    let json = req.to_json().unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!("prepareForOverlayPlacement", v["action"]);
    assert_eq!("data:image/png;base64,Ag==", v["pixelArtDataUrl"]);
    assert_eq!("data:image/png;base64,AA==", v["scaledImageDataUrl"]);
    assert_eq!("data:image/png;base64,AQ==", v["unscaledImageDataUrl"]);
    assert_eq!(serde_json::json!([[0, 0, 0], [255, 255, 255]]), v["palette"]);
    assert_eq!(Some(20), v["originalImageWidth"].as_u64());
    assert_eq!(Some(10), v["originalImageHeight"].as_u64());
    assert_eq!(Some(8.), v["pixelScale"].as_f64());
    let mut keys: Vec<_> = v.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(vec!["action", "originalImageHeight", "originalImageWidth", "palette", "pixelArtDataUrl", "pixelScale", "scaledImageDataUrl", "unscaledImageDataUrl"], keys);
    assert_eq!(req, OverlayRequest::from_json(&json).unwrap());
}

#[test]
fn available_colors() {
    let resp = AvailableColorsResponse::from_json(r#"{"availableColors":["rgb(0, 0, 0)","rgb(16, 174, 166)"]}"#).unwrap();
    let mut state = PaletteState::new();
    resp.apply_to(&mut state);
    assert!(state.get("Teal").unwrap().is_selected());
    assert!(!state.get("White").unwrap().is_available());

    let missing = AvailableColorsResponse::from_json("{}").unwrap();
    missing.apply_to(&mut state);
    assert_eq!(PaletteState::new(), state);

    assert_eq!(Err(DecodeFailed), AvailableColorsResponse::from_json("[").map(|_| ()));
}
