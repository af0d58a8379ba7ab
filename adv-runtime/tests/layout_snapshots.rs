//! 排版结果的快照：横排禁则、竖排换列与竖排禁则。

use adv_runtime::config::Color;
use adv_runtime::platform::FontSelect;
use adv_runtime::platform::headless::MonospaceRasterizer;
use adv_runtime::text::layout::glyph_positions;
use adv_runtime::text::{IgnoreFlags, LayoutContext, LayoutParams, Margins};

/// 字号 10、行距 20、无边距
fn params(width: i32, height: i32, tategaki: bool) -> LayoutParams {
    let mut params = LayoutParams {
        font: FontSelect::Global,
        font_size: 10,
        ruby_size: 4,
        color: Color::WHITE,
        outline_color: Color::BLACK,
        outline: false,
        outline_width: 0,
        pen_x: 0,
        pen_y: 0,
        area_width: width,
        area_height: height,
        margins: Margins::default(),
        line_margin: 20,
        char_margin: 0,
        fill: None,
        tategaki,
        ignore: IgnoreFlags::default(),
        emoticons: Vec::new(),
    };
    (params.pen_x, params.pen_y) = params.origin();
    params
}

fn layout_lines(text: &str, params: LayoutParams) -> Vec<String> {
    let metrics = MonospaceRasterizer::default();
    let mut ctx = LayoutContext::new(text, params);
    let reveal = ctx.reveal_all(&metrics);
    glyph_positions(&reveal.events)
        .into_iter()
        .map(|(c, x, y)| format!("{c} {x} {y}"))
        .collect()
}

#[test]
fn kinsoku_sample() {
    let lines = layout_lines(
        "あいうえおかきくけ。」さしすせそ、たちつてと！",
        params(100, 200, false),
    );
    insta::assert_yaml_snapshot!("kinsoku_sample", lines);
}

#[test]
fn tategaki_sample() {
    let lines = layout_lines("あ、いうえお", params(100, 50, true));
    insta::assert_yaml_snapshot!("tategaki_sample", lines);
}

#[test]
fn kinsoku_brackets() {
    let lines = layout_lines(
        "あいうえおかきく「さ」しすせそた（てと",
        params(100, 200, false),
    );
    insta::assert_yaml_snapshot!("kinsoku_brackets", lines);
}

#[test]
fn tategaki_kinsoku() {
    let lines = layout_lines("あいうえ」かきく「けこ", params(100, 50, true));
    insta::assert_yaml_snapshot!("tategaki_kinsoku", lines);
}
