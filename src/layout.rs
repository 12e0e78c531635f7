use ratatui::layout::Rect;

/// Height constraint for one vertically stacked panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelSpec {
    pub min_height: u16,
    pub weight: u16,
}

impl PanelSpec {
    pub const fn new(min_height: u16, weight: u16) -> Self {
        Self { min_height, weight }
    }
}

/// Splits `total` rows among `specs`.
///
/// With room to spare every panel gets its minimum plus a weighted share of
/// the surplus, and the truncation remainder goes to the last panel. When the
/// minimums do not fit, the tallest panel above one row gives up a row at a
/// time (earliest first on ties); only once every panel is down to a single
/// row are panels dropped, starting from the end of the list.
///
/// The result always sums to `max(total, 0)`.
pub fn allocate_heights(total: i32, specs: &[PanelSpec]) -> Vec<u16> {
    if total <= 0 || specs.is_empty() {
        return vec![0; specs.len()];
    }
    let total = u32::try_from(total).unwrap_or(0).min(u32::from(u16::MAX));

    let mins = specs
        .iter()
        .map(|spec| u32::from(spec.min_height))
        .collect::<Vec<_>>();
    let min_sum: u32 = mins.iter().sum();

    let heights = if min_sum >= total {
        shrink_to_total(mins, total)
    } else {
        grow_to_total(specs, mins, total - min_sum)
    };

    heights
        .into_iter()
        .map(|height| u16::try_from(height).unwrap_or(u16::MAX))
        .collect()
}

fn shrink_to_total(mut heights: Vec<u32>, total: u32) -> Vec<u32> {
    let mut sum: u32 = heights.iter().sum();
    while sum > total {
        let tallest = heights
            .iter()
            .enumerate()
            .filter(|(_, height)| **height > 1)
            .fold(None::<(usize, u32)>, |best, (index, height)| match best {
                Some((_, best_height)) if best_height >= *height => best,
                _ => Some((index, *height)),
            });

        let index = match tallest {
            Some((index, _)) => index,
            None => match heights.iter().rposition(|height| *height > 0) {
                Some(index) => index,
                None => break,
            },
        };
        heights[index] -= 1;
        sum -= 1;
    }
    heights
}

fn grow_to_total(specs: &[PanelSpec], mins: Vec<u32>, extra: u32) -> Vec<u32> {
    let weight_sum: u32 = specs.iter().map(|spec| u32::from(spec.weight)).sum();
    let mut heights = mins;
    let mut granted = 0;
    if weight_sum > 0 {
        for (height, spec) in heights.iter_mut().zip(specs) {
            let share = extra * u32::from(spec.weight) / weight_sum;
            *height += share;
            granted += share;
        }
    }
    if let Some(last) = heights.last_mut() {
        *last += extra - granted;
    }
    heights
}

/// Cuts `area` into consecutive rows of the given heights, clipped to `area`.
pub fn stack_vertical(area: Rect, heights: &[u16]) -> Vec<Rect> {
    let mut y = area.y;
    let bottom = area.bottom();
    heights
        .iter()
        .map(|height| {
            let top = y.min(bottom);
            let height = (*height).min(bottom - top);
            y = top + height;
            Rect::new(area.x, top, area.width, height)
        })
        .collect()
}

const FOOTER_HEIGHT: u16 = 1;
const LEFT_SHARE_PERCENT: u32 = 38;
const LEFT_MIN_WIDTH: u16 = 28;
const COLUMN_GAP: u16 = 1;

pub const STATUS_PANEL: PanelSpec = PanelSpec::new(3, 0);
pub const DAY_PANEL: PanelSpec = PanelSpec::new(3, 2);
pub const WEEK_PANEL: PanelSpec = PanelSpec::new(5, 3);
pub const TOP_PANEL: PanelSpec = PanelSpec::new(4, 3);
pub const CURRENT_PANEL: PanelSpec = PanelSpec::new(6, 3);
pub const GOALS_PANEL: PanelSpec = PanelSpec::new(6, 1);

/// Rectangles for every dashboard panel in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardLayout {
    pub status: Rect,
    pub day: Rect,
    pub week: Rect,
    pub top: Rect,
    pub current: Rect,
    pub goals: Rect,
    pub footer: Rect,
}

impl DashboardLayout {
    /// Left column: status, day, week and top list. Right column: current
    /// task above goals. One footer row spans the bottom.
    pub fn compute(area: Rect) -> Self {
        let content_height = area.height.saturating_sub(FOOTER_HEIGHT);
        let footer_height = area.height - content_height;
        let footer = Rect::new(area.x, area.y + content_height, area.width, footer_height);

        let share = (u32::from(area.width) * LEFT_SHARE_PERCENT / 100) as u16;
        let left_width = share.max(LEFT_MIN_WIDTH).min(area.width);
        let right_x = area.x + left_width.saturating_add(COLUMN_GAP).min(area.width);
        let right_width = area.right().saturating_sub(right_x);

        let left = Rect::new(area.x, area.y, left_width, content_height);
        let right = Rect::new(right_x, area.y, right_width, content_height);

        let left_heights = allocate_heights(
            i32::from(content_height),
            &[STATUS_PANEL, DAY_PANEL, WEEK_PANEL, TOP_PANEL],
        );
        let left_rects = stack_vertical(left, &left_heights);
        let right_heights = allocate_heights(i32::from(content_height), &[CURRENT_PANEL, GOALS_PANEL]);
        let right_rects = stack_vertical(right, &right_heights);

        Self {
            status: left_rects[0],
            day: left_rects[1],
            week: left_rects[2],
            top: left_rects[3],
            current: right_rects[0],
            goals: right_rects[1],
            footer,
        }
    }
}
