use anyhow::Result;

pub const PANEL_WIDTH: u32 = 128;
pub const PANEL_HEIGHT: u32 = 64;
pub const GLYPH_WIDTH: u32 = 8;
pub const GLYPH_HEIGHT: u32 = 8;

#[cfg(test)]
const LIT: char = '\u{2588}';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelColor {
    Off,
    #[cfg(test)]
    On,
}

pub trait Display {
    fn clear(&mut self) -> Result<()>;
    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<()>;
    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: PixelColor) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    cols: usize,
    rows: usize,
    glyph_w: i32,
    glyph_h: i32,
    cells: Vec<char>,
}

impl Canvas {
    pub fn new(width: u32, height: u32, glyph_w: u32, glyph_h: u32) -> Self {
        let glyph_w = glyph_w.clamp(1, i32::MAX as u32);
        let glyph_h = glyph_h.clamp(1, i32::MAX as u32);
        let cols = (width / glyph_w).max(1) as usize;
        let rows = (height / glyph_h).max(1) as usize;
        Self {
            cols,
            rows,
            glyph_w: glyph_w as i32,
            glyph_h: glyph_h as i32,
            cells: vec![' '; cols * rows],
        }
    }

    #[cfg(test)]
    pub fn panel() -> Self {
        Self::new(PANEL_WIDTH, PANEL_HEIGHT, GLYPH_WIDTH, GLYPH_HEIGHT)
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    #[cfg(test)]
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| *c == ' ')
    }

    pub fn row_text(&self, row: usize) -> String {
        if row >= self.rows {
            return String::new();
        }
        self.cells[row * self.cols..(row + 1) * self.cols]
            .iter()
            .collect()
    }

    pub fn lines(&self) -> Vec<String> {
        (0..self.rows).map(|row| self.row_text(row)).collect()
    }

    fn cell_mut(&mut self, col: i32, row: i32) -> Option<&mut char> {
        if col < 0 || row < 0 || col as usize >= self.cols || row as usize >= self.rows {
            return None;
        }
        let idx = row as usize * self.cols + col as usize;
        self.cells.get_mut(idx)
    }
}

fn span(len: u32) -> i32 {
    len.min(i32::MAX as u32) as i32 - 1
}

impl Display for Canvas {
    fn clear(&mut self) -> Result<()> {
        self.cells.fill(' ');
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<()> {
        let row = y.div_euclid(self.glyph_h);
        let start = x.div_euclid(self.glyph_w);
        for (offset, ch) in text.chars().enumerate() {
            let col = start.saturating_add(offset as i32);
            if col >= self.cols as i32 {
                break;
            }
            if let Some(cell) = self.cell_mut(col, row) {
                *cell = ch;
            }
        }
        Ok(())
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: PixelColor) -> Result<()> {
        if w == 0 || h == 0 {
            return Ok(());
        }
        let fill = match color {
            PixelColor::Off => ' ',
            #[cfg(test)]
            PixelColor::On => LIT,
        };
        let first_col = x.div_euclid(self.glyph_w);
        let last_col = x.saturating_add(span(w)).div_euclid(self.glyph_w);
        let first_row = y.div_euclid(self.glyph_h);
        let last_row = y.saturating_add(span(h)).div_euclid(self.glyph_h);
        for row in first_row..=last_row {
            for col in first_col..=last_col {
                if let Some(cell) = self.cell_mut(col, row) {
                    *cell = fill;
                }
            }
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }
}
