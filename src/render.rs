use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::clock::{Clock, Shutdown};
use crate::display::{Canvas, Display, PixelColor, GLYPH_HEIGHT, PANEL_HEIGHT};
use crate::model::{DisplayLines, FlightRecord};

pub const DEFAULT_SCROLL_PADDING: u32 = 160;
pub const DEFAULT_ROW_HEIGHT: u32 = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub row_height: u32,
    pub glyph_width: u32,
    pub scroll_padding: u32,
    pub text_x: i32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            width: crate::display::PANEL_WIDTH,
            row_height: DEFAULT_ROW_HEIGHT,
            glyph_width: crate::display::GLYPH_WIDTH,
            scroll_padding: DEFAULT_SCROLL_PADDING,
            text_x: 0,
        }
    }
}

impl Geometry {
    pub fn row_y(&self, row: usize) -> i32 {
        let y = (row as u32).saturating_add(1).saturating_mul(self.row_height);
        y.min(i32::MAX as u32) as i32
    }

    // Header plus three rows; never smaller than the physical panel.
    pub fn height(&self) -> u32 {
        PANEL_HEIGHT.max(self.row_height.saturating_mul(4))
    }

    pub fn canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height(), self.glyph_width, GLYPH_HEIGHT)
    }

    fn text_px(&self, text: &str) -> u32 {
        (text.chars().count() as u32).saturating_mul(self.glyph_width)
    }

    pub fn overflows(&self, text: &str) -> bool {
        self.text_px(text) > self.width
    }

    pub fn scroll_steps(&self, text: &str) -> u32 {
        self.scroll_padding.saturating_add(self.text_px(text))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timing {
    pub pause: Duration,
    pub frame: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            pause: Duration::from_secs(3),
            frame: Duration::from_millis(10),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Static,
    Scrolling,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowState {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub phase: Phase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed,
    Interrupted,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub frames: usize,
    pub scrolled_rows: Vec<usize>,
}

#[derive(Debug)]
pub struct ScrollRenderer {
    geometry: Geometry,
    timing: Timing,
    rows: [RowState; 3],
    stats: CycleStats,
}

impl ScrollRenderer {
    pub fn new(geometry: Geometry, timing: Timing) -> Self {
        let rows = [0, 1, 2].map(|idx| RowState {
            text: String::new(),
            x: geometry.text_x,
            y: geometry.row_y(idx),
            phase: Phase::Static,
        });
        Self {
            geometry,
            timing,
            rows,
            stats: CycleStats::default(),
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[RowState; 3] {
        &self.rows
    }

    #[cfg(test)]
    pub fn last_cycle(&self) -> &CycleStats {
        &self.stats
    }

    pub fn render_cycle<D, C>(
        &mut self,
        display: &mut D,
        clock: &mut C,
        shutdown: &Shutdown,
        flight_id: &str,
        record: &FlightRecord,
    ) -> Result<RenderOutcome>
    where
        D: Display + ?Sized,
        C: Clock + ?Sized,
    {
        let lines = record.lines();
        self.reset(&lines);
        let header = format!("ID: {flight_id}");

        self.paint_all(display, &header)?;
        if self.hold(clock, shutdown) == RenderOutcome::Interrupted {
            return Ok(RenderOutcome::Interrupted);
        }

        for idx in 0..self.rows.len() {
            let long = lines.rows[idx].long.as_str();
            if self.geometry.overflows(long) {
                self.rows[idx].phase = Phase::Scrolling;
                self.rows[idx].text = long.to_string();
                self.stats.scrolled_rows.push(idx);
                if self.scroll(display, clock, shutdown, idx)? == RenderOutcome::Interrupted {
                    return Ok(RenderOutcome::Interrupted);
                }
            } else {
                self.rows[idx].text = long.to_string();
                self.paint_row(display, idx)?;
            }
            if self.hold(clock, shutdown) == RenderOutcome::Interrupted {
                return Ok(RenderOutcome::Interrupted);
            }

            self.rows[idx].phase = Phase::Done;
            self.rows[idx].text = lines.rows[idx].short.clone();
            self.paint_row(display, idx)?;
        }

        self.paint_all(display, &header)?;
        let outcome = self.hold(clock, shutdown);
        debug!(
            "display cycle for {flight_id}: {} frames, scrolled rows {:?}",
            self.stats.frames, self.stats.scrolled_rows
        );
        Ok(outcome)
    }

    fn reset(&mut self, lines: &DisplayLines) {
        for (idx, row) in self.rows.iter_mut().enumerate() {
            row.text = lines.rows[idx].short.clone();
            row.x = self.geometry.text_x;
            row.y = self.geometry.row_y(idx);
            row.phase = Phase::Static;
        }
        self.stats = CycleStats::default();
    }

    fn paint_all<D: Display + ?Sized>(&mut self, display: &mut D, header: &str) -> Result<()> {
        display.clear()?;
        draw(display, header, 0, 0)?;
        for row in &self.rows {
            draw(display, &row.text, row.x, row.y)?;
        }
        self.commit(display)
    }

    fn paint_row<D: Display + ?Sized>(&mut self, display: &mut D, idx: usize) -> Result<()> {
        let row = &self.rows[idx];
        display.fill_rect(
            row.x,
            row.y,
            self.geometry.width,
            self.geometry.row_height,
            PixelColor::Off,
        )?;
        draw(display, &row.text, row.x, row.y)?;
        self.commit(display)
    }

    fn scroll<D, C>(
        &mut self,
        display: &mut D,
        clock: &mut C,
        shutdown: &Shutdown,
        idx: usize,
    ) -> Result<RenderOutcome>
    where
        D: Display + ?Sized,
        C: Clock + ?Sized,
    {
        let (x, y) = (self.rows[idx].x, self.rows[idx].y);
        let text = self.rows[idx].text.clone();
        let width = self.geometry.width.min(i32::MAX as u32) as i32;
        let steps = self.geometry.scroll_steps(&text);
        debug!("row {idx} {:?} over {steps} frames", self.rows[idx].phase);
        for step in 0..steps {
            display.fill_rect(
                x,
                y,
                self.geometry.width,
                self.geometry.row_height,
                PixelColor::Off,
            )?;
            display.draw_text(&text, width.saturating_sub(x).saturating_sub(step as i32), y)?;
            self.commit(display)?;
            clock.sleep(self.timing.frame);
            if shutdown.is_requested() {
                return Ok(RenderOutcome::Interrupted);
            }
        }
        self.paint_row(display, idx)?;
        Ok(RenderOutcome::Completed)
    }

    fn hold<C: Clock + ?Sized>(&self, clock: &mut C, shutdown: &Shutdown) -> RenderOutcome {
        clock.sleep(self.timing.pause);
        if shutdown.is_requested() {
            RenderOutcome::Interrupted
        } else {
            RenderOutcome::Completed
        }
    }

    fn commit<D: Display + ?Sized>(&mut self, display: &mut D) -> Result<()> {
        display.commit()?;
        self.stats.frames += 1;
        Ok(())
    }
}

fn draw<D: Display + ?Sized>(display: &mut D, text: &str, x: i32, y: i32) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    display.draw_text(text, x, y)
}
