//! # Text 模块
//!
//! 消息文本的分词、禁则与排版。
//!
//! - [`tokenizer`]：把消息拆分为字符与转义指令，不涉及任何度量
//! - [`kinsoku`]：禁则字符表与竖排字形替换
//! - [`layout`]：把 token 序列折叠为画笔移动与绘制事件

pub mod kinsoku;
pub mod layout;
pub mod tokenizer;

pub use layout::{IgnoreFlags, LayoutContext, LayoutEvent, LayoutParams, Margins, Reveal};
pub use tokenizer::{Directive, Token, count_chars, tokenize};

/// 台词括号（开, 闭）
const QUOTES: [(&str, &str); 6] = [
    ("（", "）"),
    ("「", "」"),
    ("『", "』"),
    ("︵", "︶"),
    ("﹁", "﹂"),
    ("﹃", "﹄"),
];

/// 跳过开头的转义指令
fn strip_leading_directives(mut text: &str) -> &str {
    while let Some(rest) = text.strip_prefix('\\') {
        let mut chars = rest.chars();
        match (chars.next(), chars.next()) {
            (Some('n' | 'c' | 'r' | 'l'), _) => text = &rest[1..],
            (Some(letter), Some('{')) => {
                let body = &rest[letter.len_utf8() + 1..];
                text = match body.find('}') {
                    Some(end) => &body[end + 1..],
                    None => "",
                };
            }
            _ => text = rest,
        }
    }
    text
}

/// 台词是否已被括号包围（忽略开头的转义指令）
pub fn is_quoted_serif(text: &str) -> bool {
    let text = strip_leading_directives(text);
    QUOTES
        .iter()
        .any(|(open, close)| text.starts_with(open) && text.ends_with(close))
}

/// 台词是否以开括号开始
pub fn is_quote_started(text: &str) -> bool {
    QUOTES.iter().any(|(open, _)| text.starts_with(open))
}

/// 把名字和台词拼接为一条消息
///
/// 开头的 `\n` 保留在最前面。日语或开启 `serif_quote` 时用「」包围，
/// 否则用 `name: text` 形式。已带括号的台词不再追加括号。
pub fn concat_serif(name: &str, serif: &str, use_brackets: bool) -> String {
    let mut lf = 0;
    let mut body = serif;
    while let Some(rest) = body.strip_prefix("\\n") {
        lf += 1;
        body = rest;
    }

    let mut out = "\\n".repeat(lf);
    out.push_str(name);
    if is_quoted_serif(body) {
        out.push_str(body);
    } else if use_brackets {
        out.push('「');
        out.push_str(body);
        out.push('」');
    } else {
        out.push_str(": ");
        out.push_str(body);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_serif() {
        assert!(is_quoted_serif("「こんにちは」"));
        assert!(is_quoted_serif("\\#{FF0000}\\n「赤」"));
        assert!(!is_quoted_serif("「途中"));
        assert!(!is_quoted_serif("plain"));
    }

    #[test]
    fn test_quote_started() {
        assert!(is_quote_started("（心の声"));
        assert!(!is_quote_started("\\n「"));
    }

    #[test]
    fn test_concat_serif() {
        assert_eq!(concat_serif("太郎", "やあ", true), "太郎「やあ」");
        assert_eq!(concat_serif("太郎", "「やあ」", true), "太郎「やあ」");
        assert_eq!(concat_serif("Taro", "Hi", false), "Taro: Hi");
        // 开头的换行保留在名字之前
        assert_eq!(concat_serif("", "\\n\\nやあ", true), "\\n\\n「やあ」");
    }
}
