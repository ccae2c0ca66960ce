//! Clock, reminders and weather dashboard frame.
//!
//! Date and time run across the top; below them reminders fill the left
//! column and the weather the right one.

use super::canvas::{FontFace, LumaCanvas, Weight};
use super::text::TextBlock;
use crate::image_proc::PipelineError;
use crate::sources::reminders::ReminderItem;
use crate::sources::weather::{WeatherSnapshot, describe_code};
use chrono::NaiveDateTime;
use image::GrayImage;

const MARGIN: u32 = 24;

/// Dashboard geometry and typography
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOptions {
    pub width: u32,
    pub height: u32,
    pub font_size: u32,
    pub line_spacing: u32,
    /// Gap between the header and the sections below it
    pub section_spacing: u32,
    /// Space between the reminders and weather columns
    pub column_gap: u32,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
            font_size: 18,
            line_spacing: 6,
            section_spacing: 16,
            column_gap: 32,
        }
    }
}

impl DashboardOptions {
    /// Width of each of the two columns
    fn column_width(&self) -> u32 {
        self.width.saturating_sub(MARGIN * 2 + self.column_gap) / 2
    }
}

fn format_temp(value: Option<f64>) -> String {
    match value {
        Some(t) => format!("{:.1}°C", t),
        None => "--".to_string(),
    }
}

/// Lines of the weather section; `None` means the fetch failed
pub fn weather_lines(weather: Option<&WeatherSnapshot>) -> Vec<String> {
    match weather {
        Some(w) => vec![
            format!("Now: {}", format_temp(w.temperature_c)),
            format!(
                "High: {} / Low: {}",
                format_temp(w.temp_max_c),
                format_temp(w.temp_min_c)
            ),
            describe_code(w.weather_code).to_string(),
        ],
        None => vec!["Weather unavailable".to_string()],
    }
}

/// Indent of reminder text: one bullet cell plus a space
fn bullet_width(face: FontFace) -> u32 {
    face.measure("o ", Weight::Regular)
}

/// The bitmap faces have no U+2022 glyph, so the bullet is a square dot
fn draw_bullet(canvas: &mut LumaCanvas, face: FontFace, left: i32, top: i32) {
    let cell = face.measure("o", Weight::Regular);
    let side = (cell / 2).max(2);
    canvas.fill_rect(
        left + ((cell - side) / 2) as i32,
        top + (face.height().saturating_sub(side) / 2) as i32,
        side,
        side,
    );
}

/// Bulleted reminders with a hanging indent; stops at `bottom`
fn draw_reminders(
    canvas: &mut LumaCanvas,
    reminders: Option<&[ReminderItem]>,
    left: i32,
    top: i32,
    bottom: i32,
    options: &DashboardOptions,
) {
    let body = FontFace::for_size(options.font_size);
    let column_width = options.column_width();
    let advance = (body.height() + options.line_spacing) as i32;

    let items = match reminders {
        None => {
            canvas.draw_text("Reminders unavailable", body.style(Weight::Regular), left, top);
            return;
        }
        Some([]) => {
            canvas.draw_text("No reminders", body.style(Weight::Regular), left, top);
            return;
        }
        Some(items) => items,
    };

    let indent = bullet_width(body);
    let text_left = left + indent as i32;
    let mut y = top;

    for item in items {
        let block = TextBlock::wrap(
            &item.summary,
            body,
            Weight::Regular,
            column_width.saturating_sub(indent),
            usize::MAX,
        );
        for (i, line) in block.lines.iter().enumerate() {
            if y + body.height() as i32 > bottom {
                tracing::warn!("Reminders overflow the column, dropping the rest");
                return;
            }
            if i == 0 {
                draw_bullet(canvas, body, left, y);
            }
            canvas.draw_text(line, body.style(Weight::Regular), text_left, y);
            y += advance;
        }
    }
}

fn draw_weather(
    canvas: &mut LumaCanvas,
    weather: Option<&WeatherSnapshot>,
    left: i32,
    top: i32,
    bottom: i32,
    options: &DashboardOptions,
) {
    let body = FontFace::for_size(options.font_size);
    let mut y = top;

    for line in weather_lines(weather) {
        let block = TextBlock::wrap(&line, body, Weight::Regular, options.column_width(), usize::MAX);
        if y + block.height(options.line_spacing) as i32 > bottom {
            tracing::warn!("Weather section overflows the column");
            break;
        }
        y = block.draw(canvas, left, y, options.line_spacing);
    }
}

/// Render the dashboard at `now`
///
/// `None` for reminders or weather means that fetch failed; the section
/// then shows a placeholder instead of failing the frame.
pub fn render_dashboard(
    now: NaiveDateTime,
    reminders: Option<&[ReminderItem]>,
    weather: Option<&WeatherSnapshot>,
    options: &DashboardOptions,
) -> Result<GrayImage, PipelineError> {
    if options.width <= MARGIN * 2 + options.column_gap || options.height <= MARGIN * 2 {
        return Err(PipelineError::Configuration(format!(
            "dashboard size {}x{} leaves no room inside the margins",
            options.width, options.height
        )));
    }

    let mut canvas = LumaCanvas::new(options.width, options.height);
    let header = FontFace::largest();
    let column_width = options.column_width();
    let bottom = (options.height - MARGIN) as i32;
    let mut y = MARGIN as i32;

    // Header: date on the left, time flush right
    let date = now.format("%A, %d %B %Y").to_string();
    let time = now.format("%H:%M").to_string();
    let time_width = header.measure(&time, Weight::Bold);
    canvas.draw_text(&date, header.style(Weight::Bold), MARGIN as i32, y);
    canvas.draw_text(
        &time,
        header.style(Weight::Bold),
        (options.width - MARGIN).saturating_sub(time_width) as i32,
        y,
    );
    y += (header.height() + options.section_spacing) as i32;

    let reminders_left = MARGIN as i32;
    let weather_left = (MARGIN + column_width + options.column_gap) as i32;

    let title = TextBlock::wrap("Reminders", header, Weight::Bold, column_width, 1);
    let body_top = title.draw(&mut canvas, reminders_left, y, options.line_spacing);
    draw_reminders(&mut canvas, reminders, reminders_left, body_top, bottom, options);

    let title = TextBlock::wrap("Weather", header, Weight::Bold, column_width, 1);
    let body_top = title.draw(&mut canvas, weather_left, y, options.line_spacing);
    draw_weather(&mut canvas, weather, weather_left, body_top, bottom, options);

    Ok(canvas.into_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(12, 5, 0))
            .unwrap()
    }

    fn inked(frame: &GrayImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> bool {
        xs.into_iter()
            .any(|x| ys.clone().any(|y| frame.get_pixel(x, y).0[0] == 0))
    }

    /// Top of the first body line under the section titles
    fn body_top(options: &DashboardOptions) -> u32 {
        let header = FontFace::largest().height();
        MARGIN + header + options.section_spacing + header + options.line_spacing
    }

    #[test]
    fn test_weather_lines() {
        let weather = WeatherSnapshot {
            temperature_c: Some(12.34),
            weather_code: Some(3),
            temp_max_c: Some(15.0),
            temp_min_c: None,
        };
        assert_eq!(
            weather_lines(Some(&weather)),
            vec!["Now: 12.3°C", "High: 15.0°C / Low: --", "Overcast"]
        );
        assert_eq!(weather_lines(None), vec!["Weather unavailable"]);
    }

    #[test]
    fn test_dashboard_has_panel_size_and_ink() {
        let options = DashboardOptions::default();
        let frame = render_dashboard(noon(), None, None, &options).unwrap();
        assert_eq!(frame.dimensions(), (800, 480));
        assert!(frame.pixels().any(|p| p.0[0] == 0));
        // Bottom margin stays blank
        assert!((0..800).all(|x| frame.get_pixel(x, 479).0[0] == 255));
    }

    #[test]
    fn test_time_is_right_aligned() {
        let options = DashboardOptions::default();
        let frame = render_dashboard(noon(), Some(&[]), None, &options).unwrap();
        let header = FontFace::largest();
        let band = MARGIN..MARGIN + header.height();
        assert!(inked(&frame, 700..776, band.clone()));
        assert!(!inked(&frame, 777..800, band));
    }

    #[test]
    fn test_columns_are_split_by_the_gap() {
        let options = DashboardOptions::default();
        let items = vec![
            ReminderItem::new("Refill the bird feeder on the balcony before the weekend", None),
            ReminderItem::new("Call the vet", None),
        ];
        let weather = WeatherSnapshot {
            temperature_c: Some(-4.0),
            weather_code: Some(71),
            temp_max_c: Some(1.0),
            temp_min_c: Some(-9.5),
        };
        let frame = render_dashboard(noon(), Some(items.as_slice()), Some(&weather), &options).unwrap();

        let column_width = options.column_width();
        assert_eq!(column_width, 360);
        let gap_left = MARGIN + column_width;
        let below_header = MARGIN + FontFace::largest().height()..480;

        assert!(inked(&frame, MARGIN..gap_left, below_header.clone()));
        assert!(!inked(&frame, gap_left..gap_left + options.column_gap, below_header.clone()));
        assert!(inked(&frame, gap_left + options.column_gap..800 - MARGIN, below_header));
    }

    #[test]
    fn test_reminder_continuation_lines_hang_under_the_text() {
        let options = DashboardOptions::default();
        let items = vec![ReminderItem::new(
            "Book the vet for the cat and pick up the new litter from the shop on the way home tonight",
            None,
        )];
        let frame = render_dashboard(noon(), Some(items.as_slice()), None, &options).unwrap();

        let body = FontFace::for_size(options.font_size);
        let indent = bullet_width(body);
        let first = body_top(&options);
        let second = first + body.height() + options.line_spacing;
        let bullet_cell = MARGIN..MARGIN + indent;
        let text = MARGIN + indent..MARGIN + options.column_width();

        assert!(inked(&frame, bullet_cell.clone(), first..first + body.height()));
        assert!(!inked(&frame, bullet_cell, second..second + body.height()));
        assert!(inked(&frame, text, second..second + body.height()));
    }

    #[test]
    fn test_empty_and_failed_reminders_differ() {
        let options = DashboardOptions::default();
        let empty = render_dashboard(noon(), Some(&[]), None, &options).unwrap();
        let failed = render_dashboard(noon(), None, None, &options).unwrap();

        let top = body_top(&options);
        let line = top..top + FontFace::for_size(options.font_size).height();
        assert!(inked(&empty, MARGIN..MARGIN + options.column_width(), line.clone()));
        assert!(inked(&failed, MARGIN..MARGIN + options.column_width(), line));
        assert_ne!(empty, failed);
    }

    #[test]
    fn test_long_reminder_list_stops_at_the_margin() {
        let options = DashboardOptions::default();
        let items: Vec<ReminderItem> = (0..40)
            .map(|i| ReminderItem::new(&format!("Reminder number {}", i), None))
            .collect();
        let frame = render_dashboard(noon(), Some(items.as_slice()), None, &options).unwrap();
        assert!(!inked(&frame, 0..800, 480 - MARGIN..480));
    }

    #[test]
    fn test_tiny_dashboard_rejected() {
        let options = DashboardOptions {
            width: 40,
            ..DashboardOptions::default()
        };
        let err = render_dashboard(noon(), None, None, &options).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
