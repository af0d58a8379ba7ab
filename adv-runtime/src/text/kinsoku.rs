//! # Kinsoku 模块
//!
//! 日文排版的禁则字符表与竖排字形替换。
//!
//! - 行首禁则（gyoto）：不能出现在行首的字符，如句读点、闭括号、小假名、长音
//! - 行尾禁则（gyomatsu）：不能出现在行尾的字符，如开括号

/// 行首禁则字符
pub fn is_gyoto(c: char) -> bool {
    matches!(
        c,
        ' ' | ',' | '.' | '!' | '?' | ':' | ';' | ')' | ']' | '}' | '/'
            | '？' | '、' | '︑' | '，' | '︐' | '。' | '︒'
            | '〕' | '〉' | '》' | '」' | '』' | '】' | '〙' | '〗' | '︘' | '〟'
            | '’' | '”' | '｠' | '»' | '）' | '］' | '｝'
            | '﹂' | '﹄' | '︶' | '︸' | '︼' | '﹈' | '︺' | '﹀' | '︾'
            | 'ゝ' | 'ゞ' | '‐' | '–' | 'ー' | '丨' | '︙' | '︰'
            | 'ァ' | 'ィ' | 'ゥ' | 'ェ' | 'ォ' | 'ッ' | 'ャ' | 'ュ' | 'ョ' | 'ヮ' | 'ヵ' | 'ヶ'
            | 'ぁ' | 'ぃ' | 'ぅ' | 'ぇ' | 'ぉ' | 'っ' | 'ゃ' | 'ゅ' | 'ょ' | 'ゎ' | 'ゕ' | 'ゖ'
            | 'ㇰ' | 'ㇱ' | 'ㇲ' | 'ㇳ' | 'ㇴ' | 'ㇵ' | 'ㇶ' | 'ㇷ' | 'ㇸ' | 'ㇹ' | 'ㇺ' | 'ㇻ'
            | 'ㇼ' | 'ㇽ' | 'ㇾ' | 'ㇿ' | '゚'
            | '々' | '〻' | '゠' | '〜' | '～' | '‼' | '⁇' | '⁈' | '⁉' | '・'
    )
}

/// 行尾禁则字符
pub fn is_gyomatsu(c: char) -> bool {
    matches!(
        c,
        '(' | '[' | '{'
            | '（' | '︵' | '｛' | '︷' | '「' | '﹁' | '『' | '﹃' | '【' | '︻'
            | '［' | '﹇' | '〔' | '︹' | '〘' | '〖' | '《' | '︽'
            | '\u{3008}' | '\u{2329}' | '｟' | '«' | '〝' | '‘' | '“'
            | '︿' | '︗'
    )
}

/// 竖排时替换为纵向字形
pub fn to_tategaki(c: char) -> char {
    match c {
        '、' => '︑',
        '，' => '︐',
        '。' => '︒',
        '（' => '︵',
        '）' => '︶',
        '｛' => '︷',
        '｝' => '︸',
        '「' => '﹁',
        '」' => '﹂',
        '『' => '﹃',
        '』' => '﹄',
        '【' => '︻',
        '】' => '︼',
        '［' => '﹇',
        '］' => '﹈',
        '〔' => '︹',
        '〕' => '︺',
        '…' => '︙',
        '‥' => '︰',
        'ー' | '─' => '丨',
        '\u{3008}' | '\u{2329}' => '︿',
        '\u{3009}' | '\u{232A}' => '﹀',
        '《' => '︽',
        '》' => '︾',
        '〖' => '︗',
        '〗' => '︘',
        _ => c,
    }
}

/// 竖排标点（前进量固定为字号）
pub fn is_tategaki_punctuation(c: char) -> bool {
    matches!(
        c,
        '︑' | '︐' | '︒' | '︵' | '︶' | '︷' | '︸' | '﹁' | '﹂' | '﹃' | '﹄'
            | '︻' | '︼' | '﹇' | '﹈' | '︹' | '︺' | '︙' | '︰' | '丨'
    )
}

/// 小假名（竖排时需要偏移）
pub fn is_small_kana(c: char) -> bool {
    matches!(
        c,
        'ぁ' | 'ぃ' | 'ぅ' | 'ぇ' | 'ぉ' | 'っ' | 'ゃ' | 'ゅ' | 'ょ' | 'ゎ' | 'ゕ' | 'ゖ'
            | 'ァ' | 'ィ' | 'ゥ' | 'ェ' | 'ォ' | 'ッ' | 'ャ' | 'ュ' | 'ョ' | 'ヮ' | 'ヵ' | 'ヶ'
    )
}

/// 西文单词字符：ASCII 可见字符、带重音的拉丁字母、希腊字母、西里尔字母
pub fn is_word_char(c: char) -> bool {
    c.is_ascii_graphic()
        || ('\u{00C0}'..='\u{017F}').contains(&c)
        || ('\u{0370}'..='\u{03FF}').contains(&c)
        || ('\u{0410}'..='\u{044F}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gyoto() {
        for c in ['、', '。', '」', 'ッ', 'ー', '!', ' '] {
            assert!(is_gyoto(c), "{c} 应为行首禁则");
        }
        assert!(!is_gyoto('あ'));
        assert!(!is_gyoto('「'));
    }

    #[test]
    fn test_gyomatsu() {
        assert!(is_gyomatsu('「'));
        assert!(is_gyomatsu('('));
        assert!(!is_gyomatsu('」'));
    }

    #[test]
    fn test_tategaki_conversion() {
        assert_eq!(to_tategaki('、'), '︑');
        assert_eq!(to_tategaki('ー'), '丨');
        assert_eq!(to_tategaki('あ'), 'あ');
        assert!(is_tategaki_punctuation(to_tategaki('。')));
        // 转换后的闭括号仍是行首禁则
        assert!(is_gyoto(to_tategaki('、')));
    }

    #[test]
    fn test_vertical_forms_keep_classification() {
        for c in ['」', '』', '）', '｝', '】', '］', '〕', '\u{3009}', '》', '〗', '。', '、'] {
            assert!(is_gyoto(to_tategaki(c)), "{c} 竖排后应为行首禁则");
        }
        for c in ['「', '『', '（', '｛', '【', '［', '〔', '\u{3008}', '《', '〖'] {
            assert!(is_gyomatsu(to_tategaki(c)), "{c} 竖排后应为行尾禁则");
        }
    }

    #[test]
    fn test_word_char() {
        assert!(is_word_char('a'));
        assert!(is_word_char('é'));
        assert!(is_word_char('Ж'));
        assert!(!is_word_char(' '));
        assert!(!is_word_char('あ'));
    }
}
