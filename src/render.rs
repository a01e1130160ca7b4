use crate::display::Display;
use std::io::{self, Write};
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Renderer periodically shows the framebuffer somewhere. It only ever reads
/// the display, so the interpreter doesn't need to know how it's presented.
pub trait Renderer {
    fn render(&mut self, display: &Display) -> Result<(), io::Error>;
}

// store useful metadata about the framebuffer being drawn
struct Resolution {
    width: usize,
    height: usize,
    row_bytes: usize,
}

impl Resolution {
    fn of(display: &Display) -> Self {
        Resolution {
            width: display.width(),
            height: display.height(),
            row_bytes: display.row_bytes(),
        }
    }

    fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.width - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.height - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel matching `bitplane` (0 = off, 1 = on)
    fn bitplane_from_data<'a>(
        &self,
        data: &'a [u8],
        bitplane: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let mut count = self.pixel_count();
        let (w, row_bytes) = (self.width, self.row_bytes);
        std::iter::from_fn(move || {
            while count > 0 {
                count -= 1;
                let (x, y) = (count % w, count / w);
                let bit = 1 & (data[y * row_bytes + x / 8] >> (7 - x % 8));
                if bit == bitplane {
                    return Some((
                        x as f64,        // x
                        -1.0 * y as f64, // y
                    ));
                }
            }
            None
        })
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermRenderer {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl MonoTermRenderer {
    pub fn new() -> Result<MonoTermRenderer, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(MonoTermRenderer { terminal })
    }
}

impl Renderer for MonoTermRenderer {
    fn render(&mut self, display: &Display) -> Result<(), io::Error> {
        let resolution = Resolution::of(display);
        let data = display.as_bytes();

        // one canvas cell per pixel, plus the border
        self.terminal.draw(|f| {
            let size = Rect::new(
                0,
                0,
                2 + resolution.width as u16,
                2 + resolution.height as u16,
            )
            .intersection(f.size());

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(resolution.x_bounds())
                .y_bounds(resolution.y_bounds())
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &resolution.bitplane_from_data(data, 0).collect::<Vec<_>>(),
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &resolution.bitplane_from_data(data, 1).collect::<Vec<_>>(),
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

impl Drop for MonoTermRenderer {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
    }
}

/// renders nowhere; counts frames. Used headless and in tests
#[derive(Debug, Default)]
pub struct DummyRenderer {
    pub frames: usize,
}

impl DummyRenderer {
    pub fn new() -> Self {
        DummyRenderer { frames: 0 }
    }
}

impl Renderer for DummyRenderer {
    fn render(&mut self, _display: &Display) -> Result<(), io::Error> {
        self.frames += 1;
        Ok(())
    }
}

/// Plain-text snapshot of the screen, two pixel rows per line using half
/// block characters.
pub fn half_block_lines(display: &Display) -> Vec<String> {
    (0..display.height())
        .step_by(2)
        .map(|y| {
            (0..display.width())
                .map(|x| match (display.get(x, y), display.get(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect()
        })
        .collect()
}

/// Half-block text frames written to any writer, one full frame per render.
/// With `home_cursor` each frame starts by moving the cursor to the top left
/// so a terminal shows it in place; otherwise frames are simply appended.
pub struct TextRenderer<W: Write> {
    out: W,
    home_cursor: bool,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, home_cursor: bool) -> Self {
        TextRenderer { out, home_cursor }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, display: &Display) -> Result<(), io::Error> {
        let mut frame = String::new();
        if self.home_cursor {
            frame.push_str("\x1b[H");
        }
        for line in half_block_lines(display) {
            frame.push_str(&line);
            // raw mode terminals don't return the carriage on \n
            frame.push_str("\r\n");
        }
        self.out.write_all(frame.as_bytes())?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution(width: usize, height: usize) -> Resolution {
        Resolution::of(&Display::new(width, height))
    }

    #[test]
    fn test_pixel_count() {
        assert_eq!(resolution(64, 32).pixel_count(), 2048);
    }

    #[test]
    fn test_x_bounds() {
        assert_eq!(resolution(64, 32).x_bounds(), [0.0, 63.0]);
    }

    #[test]
    fn test_y_bounds() {
        assert_eq!(resolution(64, 32).y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_blank_bitplanes() {
        let d = Display::new(64, 32);
        let r = Resolution::of(&d);
        assert_eq!(r.bitplane_from_data(d.as_bytes(), 1).count(), 0);
        assert_eq!(r.bitplane_from_data(d.as_bytes(), 0).count(), 2048);
    }

    #[test]
    fn test_lit_pixels_located() {
        let mut d = Display::new(12, 3);
        d.set(0, 0, true);
        d.set(11, 2, true);
        let r = Resolution::of(&d);
        let mut lit: Vec<_> = r.bitplane_from_data(d.as_bytes(), 1).collect();
        lit.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(lit, vec![(0.0, 0.0), (11.0, -2.0)]);
        assert_eq!(r.bitplane_from_data(d.as_bytes(), 0).count(), 34);
    }

    #[test]
    fn test_dummy_renderer_counts() {
        let d = Display::new(64, 32);
        let mut r = DummyRenderer::new();
        r.render(&d).unwrap();
        r.render(&d).unwrap();
        assert_eq!(r.frames, 2);
    }

    #[test]
    fn test_text_renderer_appends_frames() {
        let mut d = Display::new(3, 2);
        let mut r = TextRenderer::new(Vec::new(), false);
        r.render(&d).unwrap();
        d.set(1, 1, true);
        r.render(&d).unwrap();
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert_eq!(out, "   \r\n ▄ \r\n");
    }

    #[test]
    fn test_text_renderer_homes_cursor() {
        let mut d = Display::new(2, 1);
        d.set(0, 0, true);
        let mut r = TextRenderer::new(Vec::new(), true);
        r.render(&d).unwrap();
        assert_eq!(r.into_inner(), "\x1b[H▀ \r\n".as_bytes());
    }

    #[test]
    fn test_half_blocks() {
        let mut d = Display::new(4, 3);
        d.set(0, 0, true);
        d.set(0, 1, true);
        d.set(1, 0, true);
        d.set(2, 1, true);
        d.set(3, 2, true);
        assert_eq!(half_block_lines(&d), vec!["█▀▄ ", "   ▀"]);
    }
}
