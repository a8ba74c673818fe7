//! End-to-end click-captcha solving.

#[cfg(feature = "native")]
use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info, warn};

use crate::models::{BoundingBox, ClickPoint, FailureReason, Region, SolveResult};
use crate::ocr::{CharRecognizer, ImagePreprocessor, RegionDetector};

use super::angle::recognize_with_rotation;
use super::instruction::parse_instruction;
use super::matcher::match_targets;

/// Receives the intermediate state of every solve that reached matching.
pub trait SolveObserver: Send + Sync {
    /// Called with the decoded image, every labeled or unlabeled region and
    /// the click points the matcher produced.
    fn on_solved(&self, image: &DynamicImage, regions: &[Region], click_points: &[ClickPoint]);
}

/// Click-captcha solver combining a region detector and a glyph recognizer.
///
/// A solver holds only its models; every call to [`CaptchaSolver::solve`] is
/// independent and the same solver can be shared between threads.
pub struct CaptchaSolver<D: RegionDetector, R: CharRecognizer> {
    detector: D,
    recognizer: R,
    preprocessor: ImagePreprocessor,
    observer: Option<Box<dyn SolveObserver>>,
}

impl<D: RegionDetector, R: CharRecognizer> CaptchaSolver<D, R> {
    /// Create a solver from its two models.
    pub fn new(detector: D, recognizer: R) -> Self {
        Self {
            detector,
            recognizer,
            preprocessor: ImagePreprocessor::new(),
            observer: None,
        }
    }

    /// Attach an observer, e.g. a debug renderer.
    pub fn with_observer(mut self, observer: impl SolveObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Solve a captcha from encoded image bytes and its instruction text.
    ///
    /// Never fails: every problem is reported as a classified
    /// [`SolveResult::Failure`].
    pub fn solve(&self, image_bytes: &[u8], instruction: &str) -> SolveResult {
        let targets = parse_instruction(instruction);
        if targets.is_empty() {
            info!("Cannot parse instruction: {:?}", instruction);
            return SolveResult::failure(FailureReason::InstructionParse);
        }

        let image = match image::load_from_memory(image_bytes) {
            Ok(image) => image,
            Err(e) => {
                warn!("Failed to decode captcha image: {}", e);
                return SolveResult::failure(FailureReason::InvalidImage(e.to_string()));
            }
        };

        self.solve_targets(&image, &targets)
    }

    /// Solve an already decoded captcha image.
    pub fn solve_image(&self, image: &DynamicImage, instruction: &str) -> SolveResult {
        let targets = parse_instruction(instruction);
        self.solve_targets(image, &targets)
    }

    /// Solve for an already parsed target sequence.
    pub fn solve_targets(&self, image: &DynamicImage, targets: &[char]) -> SolveResult {
        let start = Instant::now();

        if targets.is_empty() {
            return SolveResult::failure(FailureReason::InstructionParse);
        }

        let (width, height) = image.dimensions();
        info!("Solving {}x{} captcha for {:?}", width, height, targets);

        let boxes = match self.detector.detect(image) {
            Ok(boxes) => boxes,
            Err(e) => {
                warn!("Region detection failed: {}", e);
                return SolveResult::failure(FailureReason::DetectionFailed(e.to_string()));
            }
        };

        debug!("Detected {} regions", boxes.len());
        if boxes.is_empty() {
            return SolveResult::failure(FailureReason::NoRegionsDetected);
        }

        let regions = self.label_regions(image, &boxes);
        let result = match_targets(targets, &regions);

        if let Some(ref observer) = self.observer {
            observer.on_solved(image, &regions, result.click_points());
        }

        info!(
            "Solve finished: {} with {} clicks in {}ms",
            result.status(),
            result.click_points().len(),
            start.elapsed().as_millis()
        );

        result
    }

    /// Recognize the text of every detected box.
    ///
    /// Regions that cannot be read are kept unlabeled so the matcher and the
    /// observer see every detection.
    pub fn label_regions(&self, image: &DynamicImage, boxes: &[BoundingBox]) -> Vec<Region> {
        boxes
            .iter()
            .enumerate()
            .map(|(i, bbox)| {
                let crop = self.preprocessor.crop_region(image, bbox);
                let recognition = recognize_with_rotation(&self.recognizer, &crop);

                if recognition.is_empty() {
                    debug!("Region {}: nothing recognized", i + 1);
                    Region::unlabeled(*bbox)
                } else {
                    debug!(
                        "Region {}: '{}' (confidence {:.2})",
                        i + 1,
                        recognition.text,
                        recognition.confidence
                    );
                    Region::new(*bbox, recognition.text, recognition.confidence)
                }
            })
            .collect()
    }
}

/// Create a solver with ONNX models from a directory.
///
/// File names, thread count and detector thresholds come from `config`.
#[cfg(feature = "native")]
pub fn create_solver_from_dir(
    model_dir: &Path,
    config: &crate::models::ClickcapConfig,
) -> Result<
    CaptchaSolver<crate::ocr::TextDetector<crate::OrtBackend>, crate::ocr::TextRecognizer<crate::OrtBackend>>,
    crate::error::OcrError,
> {
    use crate::OrtBackend;
    use crate::error::OcrError;
    use crate::ocr::{TextDetector, TextRecognizer};

    let models = &config.models;
    let det_path = model_dir.join(&models.detection_model);
    let rec_path = model_dir.join(&models.recognition_model);
    let charset_path = model_dir.join(&models.charset);

    let backend = OrtBackend::from_file(&det_path, models.num_threads)
        .map_err(|e| OcrError::ModelLoad(format!("Failed to load detector: {}", e)))?;
    let detector = TextDetector::with_config(backend, &config.detection);
    debug!("Loaded detector from {}", det_path.display());

    let backend = OrtBackend::from_file(&rec_path, models.num_threads)
        .map_err(|e| OcrError::ModelLoad(format!("Failed to load recognizer: {}", e)))?;
    let charset = TextRecognizer::<OrtBackend>::load_charset(&charset_path)?;
    let recognizer = TextRecognizer::new(backend, charset);
    debug!("Loaded recognizer from {}", rec_path.display());

    info!("Created captcha solver from {}", model_dir.display());
    Ok(CaptchaSolver::new(detector, recognizer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use image::{ImageFormat, Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    struct FixedBoxes(Vec<BoundingBox>);

    impl RegionDetector for FixedBoxes {
        fn detect(&self, _image: &DynamicImage) -> Result<Vec<BoundingBox>, OcrError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenDetector;

    impl RegionDetector for BrokenDetector {
        fn detect(&self, _image: &DynamicImage) -> Result<Vec<BoundingBox>, OcrError> {
            Err(OcrError::Detection("session lost".to_string()))
        }
    }

    /// Reads a glyph from the gray level at the center of the crop.
    struct ShadeReader;

    impl CharRecognizer for ShadeReader {
        fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
            let (w, h) = image.dimensions();
            let shade = image.to_luma8().get_pixel(w / 2, h / 2)[0];
            Ok(match shade {
                10 => "圈",
                20 => "谁",
                30 => "船",
                _ => "",
            }
            .to_string())
        }
    }

    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<(usize, usize)>>>);

    impl SolveObserver for Recorder {
        fn on_solved(&self, _image: &DynamicImage, regions: &[Region], click_points: &[ClickPoint]) {
            self.0.lock().unwrap().push((regions.len(), click_points.len()));
        }
    }

    fn boxes() -> Vec<BoundingBox> {
        vec![
            BoundingBox::new(10, 10, 30, 30),
            BoundingBox::new(40, 10, 60, 30),
            BoundingBox::new(70, 10, 90, 30),
        ]
    }

    /// White captcha with the three glyph boxes filled with distinct shades.
    fn captcha() -> DynamicImage {
        let mut image = RgbImage::from_pixel(100, 40, Rgb([255, 255, 255]));
        for (bbox, shade) in boxes().iter().zip([10u8, 20, 30]) {
            for y in bbox.y1..bbox.y2 {
                for x in bbox.x1..bbox.x2 {
                    image.put_pixel(x, y, Rgb([shade, shade, shade]));
                }
            }
        }
        DynamicImage::ImageRgb8(image)
    }

    fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_solve_from_bytes() {
        let solver = CaptchaSolver::new(FixedBoxes(boxes()), ShadeReader);
        let result = solver.solve(&png_bytes(&captcha()), "请依次点击【圈,谁,船】");

        assert!(result.is_success());
        let clicks: Vec<(u32, u32, char)> = result
            .click_points()
            .iter()
            .map(|p| (p.x, p.y, p.character))
            .collect();
        assert_eq!(clicks, vec![(20, 20, '圈'), (50, 20, '谁'), (80, 20, '船')]);
    }

    #[test]
    fn test_partial_when_target_absent() {
        let solver = CaptchaSolver::new(FixedBoxes(boxes()), ShadeReader);
        let result = solver.solve_image(&captcha(), "请依次点击【圈,谁,加】");

        match result {
            SolveResult::PartialSuccess { found, missing, .. } => {
                assert_eq!(found, vec!['圈', '谁']);
                assert_eq!(missing, vec!['加']);
            }
            other => panic!("expected partial success, got {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_instruction_skips_decoding() {
        let solver = CaptchaSolver::new(FixedBoxes(boxes()), ShadeReader);
        let result = solver.solve(b"not an image", "click the boats");

        assert_eq!(result, SolveResult::failure(FailureReason::InstructionParse));
    }

    #[test]
    fn test_invalid_image_is_failure() {
        let solver = CaptchaSolver::new(FixedBoxes(boxes()), ShadeReader);
        let result = solver.solve(b"not an image", "请点击圈");

        assert!(matches!(
            result,
            SolveResult::Failure {
                reason: FailureReason::InvalidImage(_)
            }
        ));
    }

    #[test]
    fn test_no_regions() {
        let solver = CaptchaSolver::new(FixedBoxes(Vec::new()), ShadeReader);
        let result = solver.solve_image(&captcha(), "请点击圈");

        assert_eq!(result, SolveResult::failure(FailureReason::NoRegionsDetected));
    }

    #[test]
    fn test_detector_error_is_failure() {
        let solver = CaptchaSolver::new(BrokenDetector, ShadeReader);
        let result = solver.solve_image(&captcha(), "请点击圈");

        assert_eq!(
            result,
            SolveResult::failure(FailureReason::DetectionFailed(
                "glyph detection failed: session lost".to_string()
            ))
        );
    }

    #[test]
    fn test_unreadable_regions_stay_unlabeled() {
        let mut all = boxes();
        all.push(BoundingBox::new(92, 0, 100, 8));
        let solver = CaptchaSolver::new(FixedBoxes(all.clone()), ShadeReader);

        let regions = solver.label_regions(&captcha(), &all);
        let texts: Vec<&str> = regions.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["圈", "谁", "船", ""]);
        assert_eq!(regions[0].confidence, 1.0);
        assert_eq!(regions[3].confidence, 0.0);
    }

    #[test]
    fn test_observer_sees_every_region() {
        let recorder = Recorder::default();
        let mut all = boxes();
        all.push(BoundingBox::new(92, 0, 100, 8));
        let solver = CaptchaSolver::new(FixedBoxes(all), ShadeReader).with_observer(recorder.clone());

        solver.solve_image(&captcha(), "请依次点击【船,圈】");
        solver.solve_image(&captcha(), "");

        assert_eq!(*recorder.0.lock().unwrap(), vec![(4, 2)]);
    }

    #[test]
    fn test_boxed_models() {
        let detector: Box<dyn RegionDetector> = Box::new(FixedBoxes(boxes()));
        let recognizer: Box<dyn CharRecognizer> = Box::new(ShadeReader);
        let solver = CaptchaSolver::new(detector, recognizer);

        assert!(solver.solve_image(&captcha(), "点击 谁").is_success());
    }
}
