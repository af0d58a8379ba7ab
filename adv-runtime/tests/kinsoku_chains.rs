//! 禁则字符出现在行尾时的换行位置。
//!
//! 宽 100、字号 10：一行放 9 个全角字符后第 10 个位置是行尾。
//! 竖排用高 50 的区域：一列放 4 个字符后第 5 个位置是列尾。

use adv_runtime::config::Color;
use adv_runtime::platform::FontSelect;
use adv_runtime::platform::headless::MonospaceRasterizer;
use adv_runtime::text::layout::glyph_positions;
use adv_runtime::text::{IgnoreFlags, LayoutContext, LayoutParams, Margins};

const LINE: &str = "あいうえおかきくけ";

fn params() -> LayoutParams {
    LayoutParams {
        font: FontSelect::Global,
        font_size: 10,
        ruby_size: 4,
        color: Color::WHITE,
        outline_color: Color::BLACK,
        outline: false,
        outline_width: 0,
        pen_x: 0,
        pen_y: 0,
        area_width: 100,
        area_height: 200,
        margins: Margins::default(),
        line_margin: 20,
        char_margin: 0,
        fill: None,
        tategaki: false,
        ignore: IgnoreFlags::default(),
        emoticons: Vec::new(),
    }
}

fn tategaki_params() -> LayoutParams {
    let mut params = params();
    params.tategaki = true;
    params.area_height = 50;
    (params.pen_x, params.pen_y) = params.origin();
    params
}

fn layout_with(text: &str, params: LayoutParams) -> Vec<(char, i32, i32)> {
    let metrics = MonospaceRasterizer::default();
    let mut ctx = LayoutContext::new(text, params);
    glyph_positions(&ctx.reveal_all(&metrics).events)
}

fn layout(text: &str) -> Vec<(char, i32, i32)> {
    layout_with(text, params())
}

/// 行尾之后的字符位置
fn tail(text: &str) -> Vec<(char, i32, i32)> {
    layout(text).split_off(LINE.chars().count())
}

#[test]
fn single_gyoto_hangs_at_line_end() {
    assert_eq!(tail("あいうえおかきくけ。さ"), vec![('。', 90, 0), ('さ', 0, 20)]);
}

#[test]
fn chains_break_after_first_hanging_char() {
    for len in 2..=4 {
        let chain: String = std::iter::once('。')
            .chain(std::iter::repeat_n('」', len - 1))
            .collect();
        let text = format!("{LINE}{chain}さ");

        let mut expected = vec![('。', 90, 0)];
        for i in 1..len {
            expected.push(('」', (i as i32 - 1) * 10, 20));
        }
        expected.push(('さ', (len as i32 - 1) * 10, 20));
        assert_eq!(tail(&text), expected, "chain of {len}");
    }
}

#[test]
fn opening_bracket_never_ends_a_line() {
    for (text, expected) in [
        ("あいうえおかきく「さ", vec![('「', 0, 20), ('さ', 10, 20)]),
        ("あいうえおかきく「。さ", vec![('「', 0, 20), ('。', 10, 20), ('さ', 20, 20)]),
        ("あいうえおかきく（」", vec![('（', 0, 20), ('」', 10, 20)]),
    ] {
        assert_eq!(layout(text).split_off(8), expected, "{text}");
    }
}

#[test]
fn opening_bracket_stays_when_partner_fits() {
    assert_eq!(
        layout("あいうえおかき「さ").split_off(7),
        vec![('「', 70, 0), ('さ', 80, 0)]
    );
}

#[test]
fn tategaki_chains_break_after_first_hanging_char() {
    for len in 1..=4 {
        let chain: String = std::iter::once('」')
            .chain(std::iter::repeat_n('』', len - 1))
            .collect();
        let text = format!("あいうえ{chain}さ");

        let mut expected = vec![('﹂', 90, 40)];
        for i in 1..len {
            expected.push(('﹄', 70, (i as i32 - 1) * 10));
        }
        expected.push(('さ', 70, (len as i32 - 1) * 10));
        assert_eq!(
            layout_with(&text, tategaki_params()).split_off(4),
            expected,
            "chain of {len}"
        );
    }
}

#[test]
fn tategaki_matches_horizontal_breaks() {
    // 同一文本横排（宽 50）与竖排（高 50）的换行位置一致
    let mut narrow = params();
    narrow.area_width = 50;
    for text in ["あいうえ」さし", "あいう「さし", "あいうえ。」さ", "あいうえおか"] {
        let lines = |pos: Vec<(char, i32, i32)>, tategaki: bool| -> Vec<i32> {
            pos.iter().map(|&(_, x, y)| if tategaki { x } else { y }).collect()
        };
        let h = lines(layout_with(text, narrow.clone()), false);
        let v = lines(layout_with(text, tategaki_params()), true);
        let h_breaks: Vec<bool> = h.windows(2).map(|w| w[0] != w[1]).collect();
        let v_breaks: Vec<bool> = v.windows(2).map(|w| w[0] != w[1]).collect();
        assert_eq!(h_breaks, v_breaks, "{text}");
    }
}

#[test]
fn layout_is_deterministic() {
    let text = "あいうえおかきくけ。」」さしすせそたちつ、てと！」なにぬねの";
    let first = layout(text);
    for _ in 0..5 {
        assert_eq!(layout(text), first);
    }
}
