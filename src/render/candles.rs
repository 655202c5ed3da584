use ratatui::{
    style::Color,
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Context, Line, Rectangle},
        Block,
    },
};

use crate::models::Candle;

const BODY_WIDTH: f64 = 0.6;

/// Candlestick chart on a canvas: one slot per row, wick from low to high,
/// body between open and close.
pub fn candlestick_canvas<'a>(
    rows: &'a [Candle],
    y_bounds: [f64; 2],
    block: Block<'a>,
) -> Canvas<'a, impl Fn(&mut Context<'_>) + 'a> {
    Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([-1.0, rows.len() as f64])
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            for (i, candle) in rows.iter().enumerate() {
                let x = i as f64;
                let color = candle_color(candle);
                ctx.draw(&Line::new(x, candle.low, x, candle.high, color));

                let bottom = candle.open.min(candle.close);
                let top = candle.open.max(candle.close);
                ctx.draw(&Rectangle {
                    x: x - BODY_WIDTH / 2.0,
                    y: bottom,
                    width: BODY_WIDTH,
                    height: top - bottom,
                    color,
                });
            }
        })
}

pub fn candle_color(candle: &Candle) -> Color {
    if candle.is_bullish() {
        Color::Green
    } else {
        Color::Red
    }
}
