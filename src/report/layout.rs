//! Report layout: turn a report's content into positioned draw operations.
//!
//! Layout is pure (no pdfium, no I/O) so pagination and image fitting can be
//! tested directly. [`super::pdf`] replays the plan onto real pages.
//!
//! Coordinates are PDF points on an A4 page with the origin at the bottom
//! left. A running cursor `y` moves down the page; before each body line,
//! if `y` has dropped below [`BOTTOM_MARGIN`], a new page starts with the
//! cursor reset to `PAGE_HEIGHT - TOP_MARGIN`. No lookahead: a heading may end
//! up alone at the bottom of a page, but a body line is never split.

/// A4 width in points.
pub const PAGE_WIDTH: f32 = 595.2756;
/// A4 height in points.
pub const PAGE_HEIGHT: f32 = 841.8898;

pub const BANNER_HEIGHT: f32 = 100.0;
pub const LEFT_MARGIN: f32 = 50.0;
/// Cursor value after a page break, measured down from the top edge.
pub const TOP_MARGIN: f32 = 50.0;
/// Below this cursor value a new page is started.
pub const BOTTOM_MARGIN: f32 = 100.0;

/// Fixed wrap column for the description body, in characters.
pub const WRAP_COLUMNS: usize = 90;
pub const BODY_LEADING: f32 = 15.0;

/// Maximum image footprint in points.
pub const IMAGE_MAX_WIDTH: f32 = 300.0;
pub const IMAGE_MAX_HEIGHT: f32 = 200.0;

pub const REPORT_TITLE: &str = "Insurance Loss Description Report";
pub const DESCRIPTION_HEADING: &str = "Detailed Loss Description";
pub const EMPTY_DESCRIPTION: &str = "No description provided.";

pub const TITLE_SIZE: f32 = 20.0;
pub const META_SIZE: f32 = 12.0;
pub const HEADING_SIZE: f32 = 14.0;
pub const BODY_SIZE: f32 = 11.0;

/// Banner fill, RGB(0, 0.5, 0.8).
pub const BANNER_COLOR: Rgb = Rgb(0, 128, 204);
pub const WHITE: Rgb = Rgb(255, 255, 255);
pub const BLACK: Rgb = Rgb(0, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// The two faces the report uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    /// Baseline.
    pub y: f32,
    pub text: String,
    pub font: Font,
    pub size: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    Text(TextRun),
    /// The report's photo; `(x, y)` is its bottom-left corner.
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    pub ops: Vec<DrawOp>,
}

impl PagePlan {
    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(t) => Some(t),
            _ => None,
        })
    }
}

/// The whole document, one plan per page.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<PagePlan>,
}

impl ReportLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The image op and the index of the page it landed on, if any.
    pub fn image(&self) -> Option<(usize, &DrawOp)> {
        self.pages.iter().enumerate().find_map(|(i, p)| {
            p.ops
                .iter()
                .find(|op| matches!(op, DrawOp::Image { .. }))
                .map(|op| (i, op))
        })
    }
}

/// What the planner needs to know about a report.
#[derive(Debug, Clone, Copy)]
pub struct LayoutInput<'a> {
    pub damage_type: &'a str,
    pub description: &'a str,
    /// Already formatted render time.
    pub generated_at: &'a str,
    /// Intrinsic pixel size of the embedded photo.
    pub image_size: Option<(u32, u32)>,
}

/// Lay out a report.
pub fn plan(input: &LayoutInput<'_>) -> ReportLayout {
    let mut pages = vec![PagePlan::default()];

    // Banner and title
    let first = &mut pages[0];
    first.ops.push(DrawOp::FillRect {
        x: 0.0,
        y: PAGE_HEIGHT - BANNER_HEIGHT,
        width: PAGE_WIDTH,
        height: BANNER_HEIGHT,
        color: BANNER_COLOR,
    });
    first.ops.push(text(
        PAGE_HEIGHT - 60.0,
        REPORT_TITLE,
        Font::HelveticaBold,
        TITLE_SIZE,
        WHITE,
    ));

    // Metadata
    let mut y = PAGE_HEIGHT - 140.0;
    first.ops.push(text(
        y,
        &format!("Damage Type: {}", input.damage_type),
        Font::Helvetica,
        META_SIZE,
        BLACK,
    ));
    y -= 20.0;
    first.ops.push(text(
        y,
        &format!("Generated: {}", input.generated_at),
        Font::Helvetica,
        META_SIZE,
        BLACK,
    ));

    // Description
    y -= 40.0;
    first.ops.push(text(
        y,
        DESCRIPTION_HEADING,
        Font::HelveticaBold,
        HEADING_SIZE,
        BLACK,
    ));
    y -= 25.0;

    let mut lines = wrap_text(input.description, WRAP_COLUMNS);
    if lines.is_empty() {
        lines.push(EMPTY_DESCRIPTION.to_string());
    }

    for line in &lines {
        if y < BOTTOM_MARGIN {
            pages.push(PagePlan::default());
            y = PAGE_HEIGHT - TOP_MARGIN;
        }
        let idx = pages.len() - 1;
        pages[idx]
            .ops
            .push(text(y, line, Font::Helvetica, BODY_SIZE, BLACK));
        y -= BODY_LEADING;
    }

    // Photo
    if let Some((iw, ih)) = input.image_size {
        y -= 40.0;
        let (width, height) = fit_within(iw, ih, IMAGE_MAX_WIDTH, IMAGE_MAX_HEIGHT);
        if y - height < BOTTOM_MARGIN {
            pages.push(PagePlan::default());
            y = PAGE_HEIGHT - TOP_MARGIN;
        }
        let idx = pages.len() - 1;
        pages[idx].ops.push(DrawOp::Image {
            x: LEFT_MARGIN,
            y: y - height,
            width,
            height,
        });
    }

    ReportLayout { pages }
}

fn text(y: f32, s: &str, font: Font, size: f32, color: Rgb) -> DrawOp {
    DrawOp::Text(TextRun {
        x: LEFT_MARGIN,
        y,
        text: s.to_string(),
        font,
        size,
        color,
    })
}

/// Scale `(w, h)` uniformly so it fills the box along its limiting axis.
///
/// When the image is relatively wider than the box, width is pinned to
/// `max_w`; otherwise height is pinned to `max_h`. Aspect ratio is always
/// preserved and neither dimension exceeds the box.
pub fn fit_within(w: u32, h: u32, max_w: f32, max_h: f32) -> (f32, f32) {
    let aspect = w as f32 / h.max(1) as f32;
    if aspect > max_w / max_h {
        (max_w, max_w / aspect)
    } else {
        (max_h * aspect, max_h)
    }
}

/// Greedy word wrap to a fixed character column.
///
/// All whitespace (including newlines) collapses to single spaces. Words
/// longer than `width` are hard-broken into `width`-sized pieces so an
/// unbroken run can never overflow the column.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            let mut chunks = chars.chunks(width).peekable();
            while let Some(chunk) = chunks.next() {
                let piece: String = chunk.iter().collect();
                if chunks.peek().is_some() {
                    lines.push(piece);
                } else {
                    current_len = chunk.len();
                    current = piece;
                }
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(description: &'a str, image_size: Option<(u32, u32)>) -> LayoutInput<'a> {
        LayoutInput {
            damage_type: "Water Damage",
            description,
            generated_at: "2024-01-01 00:00:00",
            image_size,
        }
    }

    fn body_runs(layout: &ReportLayout) -> Vec<(usize, &TextRun)> {
        layout
            .pages
            .iter()
            .enumerate()
            .flat_map(|(i, p)| p.texts().map(move |t| (i, t)))
            .filter(|(_, t)| t.font == Font::Helvetica && t.size == BODY_SIZE)
            .collect()
    }

    #[test]
    fn fit_box_wide_image() {
        assert_eq!(fit_within(400, 200, 300.0, 200.0), (300.0, 150.0));
        assert_eq!(fit_within(4000, 2000, 300.0, 200.0), (300.0, 150.0));
    }

    #[test]
    fn fit_box_tall_image() {
        assert_eq!(fit_within(100, 200, 300.0, 200.0), (100.0, 200.0));
    }

    #[test]
    fn fit_box_exact_box_aspect() {
        assert_eq!(fit_within(30, 20, 300.0, 200.0), (300.0, 200.0));
    }

    #[test]
    fn wrap_respects_column() {
        let text = "The insured vehicle sustained multiple hail impact dents across the hood, roof \
                    and trunk lid, with several dents exhibiting paint cracking.";
        let lines = wrap_text(text, 40);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
        assert_eq!(
            lines.join(" "),
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        );
    }

    #[test]
    fn wrap_breaks_long_runs() {
        let run = "x".repeat(250);
        let lines = wrap_text(&format!("start {run} end"), 90);
        assert_eq!(lines[0], "start");
        assert_eq!(lines[1].len(), 90);
        assert_eq!(lines[2].len(), 90);
        assert_eq!(lines[3], format!("{} end", "x".repeat(70)));
    }

    #[test]
    fn wrap_collapses_newlines_and_handles_empty() {
        assert_eq!(wrap_text("a\n\nb\tc", 90), vec!["a b c"]);
        assert!(wrap_text("   \n ", 90).is_empty());
    }

    #[test]
    fn short_report_is_one_page() {
        let layout = plan(&input("Minor scuff on the bumper.", None));
        assert_eq!(layout.page_count(), 1);
        let texts: Vec<_> = layout.pages[0].texts().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                REPORT_TITLE,
                "Damage Type: Water Damage",
                "Generated: 2024-01-01 00:00:00",
                DESCRIPTION_HEADING,
                "Minor scuff on the bumper.",
            ]
        );
        assert!(matches!(layout.pages[0].ops[0], DrawOp::FillRect { .. }));
    }

    #[test]
    fn empty_description_gets_placeholder() {
        let layout = plan(&input("", None));
        let body = body_runs(&layout);
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].1.text, EMPTY_DESCRIPTION);
    }

    #[test]
    fn long_description_paginates_without_splitting_lines() {
        let description = "Water intrusion damaged drywall and flooring. ".repeat(90);
        assert!(description.len() >= 4000);
        let expected = wrap_text(&description, WRAP_COLUMNS);

        let layout = plan(&input(&description, None));
        assert!(layout.page_count() > 1, "got {} pages", layout.page_count());
        assert!(layout.image().is_none());

        let body = body_runs(&layout);
        let drawn: Vec<&str> = body.iter().map(|(_, t)| t.text.as_str()).collect();
        assert_eq!(drawn, expected, "every wrapped line drawn exactly once, in order");

        for (_, t) in &body {
            assert!(t.y >= BOTTOM_MARGIN, "line drawn below margin at y={}", t.y);
            assert!(t.y <= PAGE_HEIGHT - TOP_MARGIN + 0.01);
        }
    }

    #[test]
    fn first_page_holds_lines_down_to_margin() {
        // 18 five-column words fill one 90-column line.
        let description = "word ".repeat(18 * 40);
        let layout = plan(&input(&description, None));
        assert_eq!(layout.page_count(), 2);

        let body = body_runs(&layout);
        let first: Vec<_> = body.iter().filter(|(p, _)| *p == 0).collect();
        let second: Vec<_> = body.iter().filter(|(p, _)| *p == 1).collect();
        assert_eq!(first.len(), 35);
        assert_eq!(second.len(), 5);
        assert!((second[0].1.y - (PAGE_HEIGHT - TOP_MARGIN)).abs() < 0.01);
    }

    #[test]
    fn image_anchored_below_cursor() {
        let layout = plan(&input("Short.", Some((800, 400))));
        assert_eq!(layout.page_count(), 1);
        let (page, op) = layout.image().expect("image op");
        assert_eq!(page, 0);
        match *op {
            DrawOp::Image {
                x,
                y,
                width,
                height,
            } => {
                assert_eq!((width, height), (300.0, 150.0));
                assert_eq!(x, LEFT_MARGIN);
                // heading at H-200, body line at H-225, cursor H-240, minus 40 gap
                let cursor = PAGE_HEIGHT - 225.0 - BODY_LEADING - 40.0;
                assert!((y - (cursor - height)).abs() < 0.01);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn image_moves_to_new_page_when_it_would_overflow() {
        // 35 lines fill page one down to the margin.
        let description = "word ".repeat(18 * 35);
        let layout = plan(&input(&description, Some((100, 100))));
        let (page, op) = layout.image().expect("image op");
        assert_eq!(page, layout.page_count() - 1);
        if let DrawOp::Image { y, .. } = *op {
            assert!(y >= BOTTOM_MARGIN);
        }
    }
}
