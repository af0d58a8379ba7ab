//! 页模式（NVL）的行缓冲。
//!
//! 页模式下每条消息命令是页中的一行：普通行只追加到缓冲区，
//! 遇到显示指令时把整页作为一条消息显示。

use serde::{Deserialize, Serialize};

/// 页模式下一行消息的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLine<'a> {
    /// 清空页面
    Erase,
    /// 显示缓冲的页面并等待点击
    Show,
    /// 追加到页面
    Append(&'a str),
}

impl<'a> PageLine<'a> {
    pub fn classify(text: &'a str) -> Self {
        let Some(word) = text.strip_prefix('\\') else {
            return Self::Append(text);
        };
        match word {
            "===" | "E" | "P" => Self::Erase,
            "---" | "C" => Self::Show,
            w if w.eq_ignore_ascii_case("page") || w.eq_ignore_ascii_case("erase") => Self::Erase,
            w if w.eq_ignore_ascii_case("click") => Self::Show,
            _ => Self::Append(text),
        }
    }
}

/// 页缓冲
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBuffer {
    text: String,
    lines: usize,
}

impl PageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一行，非页首时先换行
    pub fn append(&mut self, line: &str) {
        if !self.is_page_top() {
            self.text.push_str("\\n");
        }
        self.text.push_str(line);
        self.lines += 1;
    }

    /// 清空页面（行数也归零）
    pub fn erase(&mut self) {
        self.text.clear();
        self.lines = 0;
    }

    /// 清空已显示的文本，保留行数（之后追加的行从新的一行开始）
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// 页中还没有任何行
    pub fn is_page_top(&self) -> bool {
        self.lines == 0
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 页中已有的行数
    pub fn lines(&self) -> usize {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(PageLine::classify("\\page"), PageLine::Erase);
        assert_eq!(PageLine::classify("\\PAGE"), PageLine::Erase);
        assert_eq!(PageLine::classify("\\P"), PageLine::Erase);
        assert_eq!(PageLine::classify("\\==="), PageLine::Erase);
        assert_eq!(PageLine::classify("\\Erase"), PageLine::Erase);
        assert_eq!(PageLine::classify("\\click"), PageLine::Show);
        assert_eq!(PageLine::classify("\\C"), PageLine::Show);
        assert_eq!(PageLine::classify("\\---"), PageLine::Show);
        assert_eq!(PageLine::classify("\\n本文"), PageLine::Append("\\n本文"));
    }

    #[test]
    fn test_append_inserts_line_breaks() {
        let mut page = PageBuffer::new();
        page.append("一行目");
        page.append("二行目");
        assert_eq!(page.text(), "一行目\\n二行目");
        assert_eq!(page.lines(), 2);

        page.clear();
        assert_eq!(page.text(), "");
        page.append("三行目");
        assert_eq!(page.text(), "\\n三行目");

        page.erase();
        assert!(page.is_page_top());
        page.append("新しいページ");
        assert_eq!(page.text(), "新しいページ");
    }
}
