use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};
use unicode_width::UnicodeWidthStr;

/// How content lines are fitted into the panel interior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    /// One line per row, truncated at the right edge, starting at a scroll offset.
    Clip { offset: usize },
    /// Reflowed at word boundaries, cut off once the interior is full.
    Wrap,
}

/// A bordered, titled box with text content.
#[derive(Debug, Clone)]
pub struct Panel<'a> {
    title: String,
    lines: Vec<Line<'a>>,
    border_style: Style,
    fit: Fit,
}

impl<'a> Panel<'a> {
    pub fn new(title: impl Into<String>, lines: Vec<Line<'a>>) -> Self {
        Self {
            title: title.into(),
            lines,
            border_style: Style::default(),
            fit: Fit::Clip { offset: 0 },
        }
    }

    pub fn border_style(mut self, style: Style) -> Self {
        self.border_style = style;
        self
    }

    pub fn scrolled(mut self, offset: usize) -> Self {
        self.fit = Fit::Clip { offset };
        self
    }

    pub fn wrapped(mut self) -> Self {
        self.fit = Fit::Wrap;
        self
    }

    /// Draws into `buf`, clipped to the buffer. Targets smaller than 2x2 draw nothing.
    pub fn render(self, area: Rect, buf: &mut Buffer) {
        let area = area.intersection(buf.area);
        if area.height < 2 || area.width < 2 {
            return;
        }

        let mut block = Block::bordered().border_style(self.border_style);
        let title = format!(" {} ", self.title);
        if !self.title.is_empty() && title.width() < usize::from(area.width - 2) {
            block = block.title(title);
        }
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.is_empty() {
            return;
        }

        match self.fit {
            Fit::Clip { offset } => {
                let visible = self
                    .lines
                    .into_iter()
                    .skip(offset)
                    .take(usize::from(inner.height))
                    .collect::<Vec<_>>();
                Paragraph::new(visible).render(inner, buf);
            }
            Fit::Wrap => {
                Paragraph::new(self.lines)
                    .wrap(Wrap { trim: true })
                    .render(inner, buf);
            }
        }
    }
}

/// A `width` x `height` box centered in `area`, shrunk to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// Rows available for content inside a bordered panel.
pub fn inner_height(area: Rect) -> usize {
    usize::from(area.height.saturating_sub(2))
}

/// Largest valid scroll offset for `rows` lines in a viewport of `viewport` rows.
pub fn max_offset(rows: usize, viewport: usize) -> usize {
    rows.saturating_sub(viewport)
}
