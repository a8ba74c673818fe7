//! WASM bindings for click-captcha solving.
//!
//! Model inference stays on the native side; the browser gets instruction
//! parsing, click matching over regions it labeled itself, and data-URI
//! decoding.

use js_sys::Array;
use wasm_bindgen::prelude::*;

use clickcap_core::models::{BoundingBox, Region, SolveResult};
use clickcap_core::{match_targets, parse_instruction as parse_targets};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Parse an instruction into its ordered target characters.
#[wasm_bindgen]
pub fn parse_instruction(instruction: &str) -> Array {
    parse_targets(instruction)
        .into_iter()
        .map(|c| JsValue::from_str(&c.to_string()))
        .collect()
}

/// Decode the bytes of a `data:image/...;base64,` URI.
#[wasm_bindgen]
pub fn decode_data_uri(src: &str) -> Result<Vec<u8>, JsValue> {
    clickcap_core::decode_data_uri(src).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Recognized regions collected in the browser, matched against an instruction.
#[wasm_bindgen]
pub struct RegionSet {
    regions: Vec<Region>,
}

#[wasm_bindgen]
impl RegionSet {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
        }
    }

    /// Add a recognized region.
    #[wasm_bindgen]
    pub fn add_region(&mut self, text: &str, x1: u32, y1: u32, x2: u32, y2: u32, confidence: f32) {
        self.regions.push(Region::new(
            BoundingBox::new(x1, y1, x2, y2),
            text.trim(),
            confidence,
        ));
    }

    /// Number of regions added so far.
    #[wasm_bindgen(getter)]
    pub fn length(&self) -> usize {
        self.regions.len()
    }

    /// Remove all regions.
    #[wasm_bindgen]
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Match the regions against an instruction; returns the solve result object.
    #[wasm_bindgen]
    pub fn match_instruction(&self, instruction: &str) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.solve(instruction))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl RegionSet {
    fn solve(&self, instruction: &str) -> SolveResult {
        match_targets(&parse_targets(instruction), &self.regions)
    }
}

impl Default for RegionSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clickcap_core::models::FailureReason;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn sample() -> RegionSet {
        let mut set = RegionSet::new();
        set.add_region("圈", 10, 10, 30, 30, 1.0);
        set.add_region(" 谁 ", 40, 10, 60, 30, 1.0);
        set.add_region("船", 70, 10, 90, 30, 1.0);
        set
    }

    #[wasm_bindgen_test]
    fn test_match_instruction() {
        let result = sample().solve("请依次点击【圈,谁,船】");
        let clicks: Vec<(u32, u32)> = result.click_points().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(clicks, vec![(20, 20), (50, 20), (80, 20)]);
    }

    #[wasm_bindgen_test]
    fn test_partial_match() {
        assert_eq!(sample().solve("请依次点击【圈,谁,加】").status(), "partial");
    }

    #[wasm_bindgen_test]
    fn test_empty_set() {
        let mut set = sample();
        set.clear();
        assert_eq!(set.length(), 0);
        assert_eq!(
            set.solve("点击 圈"),
            SolveResult::failure(FailureReason::NoRegionsDetected)
        );
    }

    #[wasm_bindgen_test]
    fn test_parse_instruction_array() {
        let targets = parse_instruction("请点击 天 地");
        assert_eq!(targets.length(), 2);
        assert_eq!(targets.get(0).as_string().as_deref(), Some("天"));
    }

    #[wasm_bindgen_test]
    fn test_decode_data_uri() {
        assert_eq!(decode_data_uri("data:image/png;base64,aGVsbG8=").unwrap(), b"hello");
        assert!(decode_data_uri("https://example.com/a.png").is_err());
    }
}
