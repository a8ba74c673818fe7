//! Greedy pairing of target characters with recognized regions.

use tracing::debug;

use crate::models::{ClickPoint, FailureReason, Region, SolveResult};

/// Resolve each target, in order, to a click on an unused matching region.
///
/// For every target the unconsumed region whose text equals that character
/// and whose confidence is highest is chosen (the earliest one on ties) and
/// consumed, so repeated targets need distinct regions. There is no
/// backtracking: an early pick is never revisited to rescue a later target.
pub fn match_targets(targets: &[char], regions: &[Region]) -> SolveResult {
    if targets.is_empty() {
        return SolveResult::failure(FailureReason::InstructionParse);
    }
    if regions.is_empty() {
        return SolveResult::failure(FailureReason::NoRegionsDetected);
    }

    let mut consumed = vec![false; regions.len()];
    let mut click_points = Vec::with_capacity(targets.len());
    let mut found = Vec::new();
    let mut missing = Vec::new();

    for &target in targets {
        match best_unconsumed(target, regions, &consumed) {
            Some(index) => {
                consumed[index] = true;
                let region = &regions[index];
                let (x, y) = region.center();
                debug!("'{}' -> region {} at ({}, {})", target, index, x, y);

                click_points.push(ClickPoint {
                    x,
                    y,
                    character: target,
                    confidence: region.confidence,
                });
                found.push(target);
            }
            None => {
                debug!("'{}' has no unused matching region", target);
                missing.push(target);
            }
        }
    }

    if missing.is_empty() {
        SolveResult::Success { click_points }
    } else if found.is_empty() {
        SolveResult::failure(FailureReason::NoMatch)
    } else {
        SolveResult::PartialSuccess {
            found,
            missing,
            click_points,
        }
    }
}

fn best_unconsumed(target: char, regions: &[Region], consumed: &[bool]) -> Option<usize> {
    let mut best: Option<usize> = None;

    for (index, region) in regions.iter().enumerate() {
        if consumed[index] || !text_is(&region.text, target) {
            continue;
        }
        match best {
            Some(current) if regions[current].confidence >= region.confidence => {}
            _ => best = Some(index),
        }
    }

    best
}

/// Whether `text` is exactly the single character `target`.
fn text_is(text: &str, target: char) -> bool {
    let mut chars = text.chars();
    chars.next() == Some(target) && chars.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn region(text: &str, x1: u32, y1: u32, x2: u32, y2: u32, confidence: f32) -> Region {
        Region::new(BoundingBox::new(x1, y1, x2, y2), text, confidence)
    }

    fn sample_regions() -> Vec<Region> {
        vec![
            region("圈", 10, 10, 30, 30, 1.0),
            region("谁", 40, 10, 60, 30, 1.0),
            region("船", 70, 10, 90, 30, 1.0),
        ]
    }

    fn coords(result: &SolveResult) -> Vec<(u32, u32)> {
        result.click_points().iter().map(|p| (p.x, p.y)).collect()
    }

    #[test]
    fn test_full_match_in_target_order() {
        let result = match_targets(&['圈', '谁', '船'], &sample_regions());

        assert!(result.is_success());
        assert_eq!(coords(&result), vec![(20, 20), (50, 20), (80, 20)]);
    }

    #[test]
    fn test_order_follows_targets_not_regions() {
        let result = match_targets(&['船', '圈'], &sample_regions());

        assert!(result.is_success());
        assert_eq!(coords(&result), vec![(80, 20), (20, 20)]);
        let chars: Vec<char> = result.click_points().iter().map(|p| p.character).collect();
        assert_eq!(chars, vec!['船', '圈']);
    }

    #[test]
    fn test_one_missing_is_partial() {
        let result = match_targets(&['圈', '谁', '加'], &sample_regions());

        assert_eq!(
            result,
            SolveResult::PartialSuccess {
                found: vec!['圈', '谁'],
                missing: vec!['加'],
                click_points: vec![
                    ClickPoint { x: 20, y: 20, character: '圈', confidence: 1.0 },
                    ClickPoint { x: 50, y: 20, character: '谁', confidence: 1.0 },
                ],
            }
        );
    }

    #[test]
    fn test_no_regions() {
        assert_eq!(
            match_targets(&['圈'], &[]),
            SolveResult::failure(FailureReason::NoRegionsDetected)
        );
    }

    #[test]
    fn test_empty_targets_take_precedence() {
        assert_eq!(
            match_targets(&[], &[]),
            SolveResult::failure(FailureReason::InstructionParse)
        );
    }

    #[test]
    fn test_nothing_matches() {
        assert_eq!(
            match_targets(&['天', '地'], &sample_regions()),
            SolveResult::failure(FailureReason::NoMatch)
        );
    }

    #[test]
    fn test_highest_confidence_wins() {
        let regions = vec![
            region("船", 0, 0, 10, 10, 0.8),
            region("船", 20, 0, 30, 10, 1.0),
        ];
        let result = match_targets(&['船'], &regions);
        assert_eq!(coords(&result), vec![(25, 5)]);
    }

    #[test]
    fn test_tie_keeps_first_region() {
        let regions = vec![
            region("船", 0, 0, 10, 10, 0.8),
            region("船", 20, 0, 30, 10, 0.8),
        ];
        let result = match_targets(&['船'], &regions);
        assert_eq!(coords(&result), vec![(5, 5)]);
    }

    #[test]
    fn test_repeated_target_uses_distinct_regions() {
        let regions = vec![
            region("船", 0, 0, 10, 10, 0.8),
            region("船", 20, 0, 30, 10, 1.0),
            region("圈", 40, 0, 50, 10, 1.0),
        ];
        let result = match_targets(&['船', '圈', '船'], &regions);
        assert_eq!(coords(&result), vec![(25, 5), (45, 5), (5, 5)]);
    }

    #[test]
    fn test_repeated_target_with_single_region_is_partial() {
        let result = match_targets(&['船', '船'], &sample_regions());

        match result {
            SolveResult::PartialSuccess { found, missing, click_points } => {
                assert_eq!(found, vec!['船']);
                assert_eq!(missing, vec!['船']);
                assert_eq!(click_points.len(), 1);
            }
            other => panic!("expected partial success, got {:?}", other),
        }
    }

    #[test]
    fn test_no_region_clicked_twice() {
        let regions = vec![
            region("天", 0, 0, 10, 10, 1.0),
            region("天", 20, 0, 30, 10, 0.8),
            region("地", 40, 0, 50, 10, 1.0),
            region("天", 60, 0, 70, 10, 0.8),
        ];
        let result = match_targets(&['天', '天', '地', '天', '天'], &regions);

        let sites: HashSet<(u32, u32)> = coords(&result).into_iter().collect();
        assert_eq!(sites.len(), result.click_points().len());
        assert_eq!(result.click_points().len(), 4);
    }

    #[test]
    fn test_unlabeled_and_multi_char_regions_never_match() {
        let regions = vec![
            Region::unlabeled(BoundingBox::new(0, 0, 10, 10)),
            region("圈谁", 20, 0, 30, 10, 1.0),
        ];
        assert_eq!(
            match_targets(&['圈'], &regions),
            SolveResult::failure(FailureReason::NoMatch)
        );
    }
}
