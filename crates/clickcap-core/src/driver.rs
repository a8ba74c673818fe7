//! Helpers for the browser driver that feeds the solver.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ClickcapError, Result};
use crate::models::{ClickPoint, RetryPolicy};

/// One click in page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedClick {
    pub x: f64,
    pub y: f64,
    pub character: char,
    /// Wait before this click; zero for the first one.
    pub pause_ms: u64,
}

/// Decode the image bytes of a `data:image/...;base64,` URI.
pub fn decode_data_uri(src: &str) -> Result<Vec<u8>> {
    let src = src.trim();
    let Some(rest) = src.strip_prefix("data:image/") else {
        return Err(ClickcapError::DataUri("not a data:image/ URI".to_string()));
    };

    let Some((header, payload)) = rest.split_once(',') else {
        return Err(ClickcapError::DataUri("missing ',' separator".to_string()));
    };
    if !header.ends_with(";base64") {
        return Err(ClickcapError::DataUri(format!(
            "unsupported encoding in 'data:image/{}'",
            header
        )));
    }

    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(payload)
        .map_err(|e| ClickcapError::DataUri(e.to_string()))
}

/// Page clicks in order, each preceded by the policy's randomized pause.
pub fn click_plan<R: Rng>(
    click_points: &[ClickPoint],
    origin: (f64, f64),
    policy: &RetryPolicy,
    rng: &mut R,
) -> Vec<PlannedClick> {
    click_points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let (x, y) = p.to_page(origin.0, origin.1);
            let pause_ms = if i == 0 {
                0
            } else {
                policy.click_pause(rng).as_millis() as u64
            };
            PlannedClick {
                x,
                y,
                character: p.character,
                pause_ms,
            }
        })
        .collect()
}
