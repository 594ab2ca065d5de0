//! String conversions: case, character width and kana.
//!
//! Flags combine with OR semantics and are applied in a fixed order:
//! case first, then width, then kana. `Uppercase` together with
//! `Lowercase` means proper case.

use unicode_normalization::UnicodeNormalization;

use super::locale::{to_lower, to_proper, to_upper, SourceLocale};
use crate::config::KANA_FALLBACK_LOCALE;
use crate::error::ConversionError;
use crate::types::StrConv;

/// Offset between ASCII printable characters and their full-width forms.
const WIDE_OFFSET: u32 = 0xFEE0;

/// Check a flag set and resolve the locale the conversion runs under.
///
/// Kana conversions without a source locale run under the Japanese
/// fallback locale.
///
/// # Errors
/// - `Unavailable` for Chinese script conversions
/// - `Conflict` for Wide with Narrow, or Katakana with Hiragana
/// - `UnsupportedLocale` for kana outside Japanese, or width outside
///   Japanese, Korean and Chinese
pub fn validate(
    flags: &[StrConv],
    locale: Option<&SourceLocale>,
) -> Result<Option<SourceLocale>, ConversionError> {
    let has = |flag: StrConv| flags.contains(&flag);

    for flag in [StrConv::SimplifiedChinese, StrConv::TraditionalChinese] {
        if has(flag) {
            return Err(ConversionError::Unavailable(flag.as_str()));
        }
    }
    if has(StrConv::Wide) && has(StrConv::Narrow) {
        return Err(ConversionError::Conflict("Wide", "Narrow"));
    }
    if has(StrConv::Katakana) && has(StrConv::Hiragana) {
        return Err(ConversionError::Conflict("Katakana", "Hiragana"));
    }

    let kana = [StrConv::Katakana, StrConv::Hiragana]
        .into_iter()
        .find(|flag| has(*flag));
    let effective = match (locale, kana) {
        (Some(locale), _) => Some(locale.clone()),
        (None, Some(_)) => SourceLocale::parse(KANA_FALLBACK_LOCALE).ok(),
        (None, None) => None,
    };

    if let (Some(flag), Some(locale)) = (kana, effective.as_ref()) {
        if !locale.is_japanese() {
            return Err(ConversionError::UnsupportedLocale {
                conversion: flag.as_str(),
                locale: locale.tag().to_string(),
            });
        }
    }
    for flag in [StrConv::Wide, StrConv::Narrow] {
        if let (true, Some(locale)) = (has(flag), effective.as_ref()) {
            if !locale.is_east_asian() {
                return Err(ConversionError::UnsupportedLocale {
                    conversion: flag.as_str(),
                    locale: locale.tag().to_string(),
                });
            }
        }
    }

    Ok(effective)
}

/// Apply a set of string conversions to a text.
///
/// # Errors
/// Same conditions as [`validate`].
///
/// # Examples
/// ```
/// use markup_cleanup::rules::strconv::convert;
/// use markup_cleanup::types::StrConv;
///
/// assert_eq!(convert("abc 1", &[StrConv::Wide], None).unwrap(), "ａｂｃ\u{3000}１");
/// assert_eq!(convert("ひらがな", &[StrConv::Katakana], None).unwrap(), "ヒラガナ");
/// ```
pub fn convert(
    text: &str,
    flags: &[StrConv],
    locale: Option<&SourceLocale>,
) -> Result<String, ConversionError> {
    let effective = validate(flags, locale)?;
    let locale = effective.as_ref();
    let has = |flag: StrConv| flags.contains(&flag);

    let mut out = match (has(StrConv::Uppercase), has(StrConv::Lowercase)) {
        (true, true) => to_proper(text, locale),
        _ if has(StrConv::ProperCase) => to_proper(text, locale),
        (true, false) => to_upper(text, locale),
        (false, true) => to_lower(text, locale),
        (false, false) => text.to_string(),
    };

    if has(StrConv::Wide) {
        out = to_wide(&out);
    } else if has(StrConv::Narrow) {
        out = to_narrow(&out);
    }

    if has(StrConv::Katakana) {
        out = out.chars().map(hiragana_to_katakana).collect();
    } else if has(StrConv::Hiragana) {
        out = out.chars().map(katakana_to_hiragana).collect();
    }

    Ok(out)
}

fn is_half_width_katakana(c: char) -> bool {
    ('\u{FF61}'..='\u{FF9F}').contains(&c)
}

/// Narrow to wide: ASCII printables, space and half-width katakana.
fn to_wide(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 3);
    let mut kana_run = String::new();

    for c in text.chars() {
        if is_half_width_katakana(c) {
            kana_run.push(c);
            continue;
        }
        if !kana_run.is_empty() {
            // NFKC maps half-width kana to full width and composes voicing marks.
            out.extend(kana_run.nfkc());
            kana_run.clear();
        }
        match c {
            ' ' => out.push('\u{3000}'),
            '\u{21}'..='\u{7E}' => out.push(shift(c, WIDE_OFFSET, true)),
            _ => out.push(c),
        }
    }
    out.extend(kana_run.nfkc());
    out
}

/// Wide to narrow: full-width ASCII forms and ideographic space.
fn to_narrow(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => shift(c, WIDE_OFFSET, false),
            _ => c,
        })
        .collect()
}

fn hiragana_to_katakana(c: char) -> char {
    match c {
        '\u{3041}'..='\u{3096}' | '\u{309D}'..='\u{309E}' => shift(c, 0x60, true),
        _ => c,
    }
}

fn katakana_to_hiragana(c: char) -> char {
    match c {
        '\u{30A1}'..='\u{30F6}' | '\u{30FD}'..='\u{30FE}' => shift(c, 0x60, false),
        _ => c,
    }
}

fn shift(c: char, offset: u32, up: bool) -> char {
    let code = if up {
        u32::from(c) + offset
    } else {
        u32::from(c) - offset
    };
    char::from_u32(code).unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locale(tag: &str) -> SourceLocale {
        SourceLocale::parse(tag).unwrap()
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(convert("abc", &[StrConv::Uppercase], None).unwrap(), "ABC");
        assert_eq!(convert("ABC", &[StrConv::Lowercase], None).unwrap(), "abc");
        assert_eq!(
            convert("hello world", &[StrConv::ProperCase], None).unwrap(),
            "Hello World"
        );
        assert_eq!(
            convert("hELLO wORLD", &[StrConv::Uppercase, StrConv::Lowercase], None).unwrap(),
            "Hello World"
        );
    }

    #[test]
    fn test_case_uses_locale() {
        let tr = locale("tr");
        assert_eq!(
            convert("iki", &[StrConv::Uppercase], Some(&tr)).unwrap(),
            "İKİ"
        );
    }

    #[test]
    fn test_wide_and_narrow() {
        let ja = locale("ja-JP");
        assert_eq!(
            convert("A1 !", &[StrConv::Wide], Some(&ja)).unwrap(),
            "Ａ１\u{3000}！"
        );
        assert_eq!(
            convert("Ａ１\u{3000}！", &[StrConv::Narrow], Some(&ja)).unwrap(),
            "A1 !"
        );
    }

    #[test]
    fn test_wide_half_width_katakana() {
        assert_eq!(convert("ｶﾞｷﾞ", &[StrConv::Wide], None).unwrap(), "ガギ");
        assert_eq!(convert("ｱa", &[StrConv::Wide], None).unwrap(), "アａ");
    }

    #[test]
    fn test_kana() {
        assert_eq!(
            convert("ひらがな", &[StrConv::Katakana], None).unwrap(),
            "ヒラガナ"
        );
        assert_eq!(
            convert("カタカナー", &[StrConv::Hiragana], None).unwrap(),
            "かたかなー"
        );
    }

    #[test]
    fn test_conflicts() {
        assert_eq!(
            convert("x", &[StrConv::Wide, StrConv::Narrow], None),
            Err(ConversionError::Conflict("Wide", "Narrow"))
        );
        assert_eq!(
            convert("x", &[StrConv::Katakana, StrConv::Hiragana], None),
            Err(ConversionError::Conflict("Katakana", "Hiragana"))
        );
    }

    #[test]
    fn test_locale_restrictions() {
        let de = locale("de-DE");
        assert!(matches!(
            convert("x", &[StrConv::Katakana], Some(&de)),
            Err(ConversionError::UnsupportedLocale { conversion: "Katakana", .. })
        ));
        assert!(matches!(
            convert("x", &[StrConv::Wide], Some(&de)),
            Err(ConversionError::UnsupportedLocale { conversion: "Wide", .. })
        ));
        assert!(convert("x", &[StrConv::Wide], Some(&locale("ko"))).is_ok());
        assert!(convert("x", &[StrConv::Hiragana], Some(&locale("zh"))).is_err());
    }

    #[test]
    fn test_chinese_unavailable() {
        assert_eq!(
            convert("x", &[StrConv::SimplifiedChinese], None),
            Err(ConversionError::Unavailable("SimplifiedChinese"))
        );
    }

    #[test]
    fn test_kana_fallback_locale() {
        let effective = validate(&[StrConv::Katakana], None).unwrap();
        assert_eq!(effective.unwrap().tag(), KANA_FALLBACK_LOCALE);
        assert!(validate(&[StrConv::Uppercase], None).unwrap().is_none());
    }
}
