//! Target extraction from the captcha instruction text.

use tracing::debug;

/// Imperative lead-ins, tried in order. Longer phrases come first so that
/// "请依次点击" wins over the bare "点击" it contains.
pub const LEAD_IN_PHRASES: [&str; 5] = ["请依次点击", "请点击", "点击", "选择", "找出"];

/// Whether `c` belongs to the CJK Unified Ideographs block.
pub fn is_target_char(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Extract the ordered target characters from an instruction.
///
/// The text after the first occurrence of a lead-in phrase is scanned for
/// ideographs; punctuation, digits and Latin text are ignored. The first
/// phrase yielding at least one character wins. Without any usable phrase
/// every ideograph in the instruction is taken. An empty result means the
/// instruction could not be parsed.
pub fn parse_instruction(instruction: &str) -> Vec<char> {
    for phrase in LEAD_IN_PHRASES {
        let Some(start) = instruction.find(phrase) else {
            continue;
        };

        let targets = collect_targets(&instruction[start + phrase.len()..]);
        if !targets.is_empty() {
            debug!("Lead-in '{}' -> {:?}", phrase, targets);
            return targets;
        }
    }

    let targets = collect_targets(instruction);
    debug!("No lead-in matched, fallback -> {:?}", targets);
    targets
}

fn collect_targets(text: &str) -> Vec<char> {
    text.chars().filter(|&c| is_target_char(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bracketed_sequence() {
        assert_eq!(parse_instruction("请依次点击【圈,谁,船】"), vec!['圈', '谁', '船']);
    }

    #[test]
    fn test_each_lead_in() {
        assert_eq!(parse_instruction("请点击 加 油"), vec!['加', '油']);
        assert_eq!(parse_instruction("点击：天、地"), vec!['天', '地']);
        assert_eq!(parse_instruction("选择 “山水”"), vec!['山', '水']);
        assert_eq!(parse_instruction("找出下列字"), vec!['下', '列', '字']);
    }

    #[test]
    fn test_ignores_latin_digits_and_punctuation() {
        assert_eq!(
            parse_instruction("请依次点击: 1.圈 2.谁 (abc) 3.船!"),
            vec!['圈', '谁', '船']
        );
    }

    #[test]
    fn test_keeps_repeats_in_order() {
        assert_eq!(parse_instruction("请依次点击【船,圈,船】"), vec!['船', '圈', '船']);
    }

    #[test]
    fn test_text_before_lead_in_is_skipped() {
        assert_eq!(parse_instruction("验证：请依次点击【日,月】"), vec!['日', '月']);
    }

    #[test]
    fn test_empty_lead_in_falls_through() {
        // "点击" ends the text, so "选择" is tried next.
        assert_eq!(parse_instruction("选择 风 后点击"), vec!['风', '后', '点', '击']);
    }

    #[test]
    fn test_fallback_without_lead_in() {
        assert_eq!(parse_instruction("按顺序: 雨 雪"), vec!['按', '顺', '序', '雨', '雪']);
    }

    #[test]
    fn test_no_targets() {
        assert!(parse_instruction("").is_empty());
        assert!(parse_instruction("click 1, 2, 3").is_empty());
    }

    #[test]
    fn test_lead_in_without_targets_uses_fallback() {
        assert_eq!(parse_instruction("请依次点击【】"), vec!['请', '依', '次', '点', '击']);
    }

    #[test]
    fn test_target_char_range() {
        assert!(is_target_char('一'));
        assert!(is_target_char('\u{9FFF}'));
        assert!(!is_target_char('【'));
        assert!(!is_target_char('A'));
        assert!(!is_target_char('ー'));
    }
}
