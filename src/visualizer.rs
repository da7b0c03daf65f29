// src/visualizer.rs
use crate::render::{ChartConfig, ChartLayout, Series, TIME_AXIS_TITLE};
use crate::types::Sample;
use eframe::egui;
use egui::{Color32, Pos2, Rect, Rounding, Shape, Stroke, Vec2};
pub const RAW_COLOR: Color32 = Color32::from_rgb(135, 206, 235);
pub const FILTERED_COLOR: Color32 = Color32::from_rgb(255, 215, 0);
/// Draws the chart window into the space left in `ui`, at least `min_height` tall.
pub fn draw_signal_chart(ui: &mut egui::Ui, samples: &[Sample], config: &ChartConfig, min_height: f32) {
    let background = Color32::from_rgb(10, 10, 15);
    let grid_color = Color32::from_white_alpha(20);
    let label_color = Color32::from_white_alpha(128);
    let available = ui.available_size();
    let size = Vec2::new(available.x.max(100.0), available.y.max(min_height));
    let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
    let rect = response.rect;
    let origin = rect.min;
    let layout = ChartLayout::compute(samples, config, rect.width(), rect.height());
    painter.rect_filled(rect, Rounding::same(4.0), background);
    let at = |x: f32, y: f32| -> Pos2 { origin + Vec2::new(x, y) };
    // 1. Grid
    for line in &layout.horizontal {
        painter.line_segment(
            [at(0.0, line.position), at(layout.width, line.position)],
            Stroke::new(1.0, grid_color),
        );
        if let Some(label) = &line.label {
            painter.text(
                at(layout.width - 4.0, line.position - 2.0),
                egui::Align2::RIGHT_BOTTOM,
                label,
                egui::FontId::monospace(11.0),
                label_color,
            );
        }
    }
    for line in &layout.vertical {
        painter.line_segment(
            [at(line.position, 0.0), at(line.position, layout.plot_height)],
            Stroke::new(1.0, grid_color),
        );
        if let Some(label) = &line.label {
            painter.text(
                at(line.position, layout.plot_height + 4.0),
                egui::Align2::CENTER_TOP,
                label,
                egui::FontId::monospace(11.0),
                label_color,
            );
        }
    }
    painter.text(
        at(layout.width / 2.0, layout.height - 4.0),
        egui::Align2::CENTER_BOTTOM,
        TIME_AXIS_TITLE,
        egui::FontId::proportional(11.0),
        label_color,
    );
    // 2. Traces, filtered on top
    let plot_rect = Rect::from_min_size(origin, Vec2::new(layout.width, layout.plot_height));
    let clipped = painter.with_clip_rect(plot_rect);
    for series in [Series::Raw, Series::Filtered] {
        let Some(trace) = layout.trace(series) else { continue };
        let stroke = match series {
            Series::Raw => Stroke::new(1.0, RAW_COLOR),
            Series::Filtered => Stroke::new(3.0, FILTERED_COLOR),
        };
        let points: Vec<Pos2> = trace.points.iter().map(|[x, y]| at(*x, *y)).collect();
        clipped.add(Shape::line(points, stroke));
    }
    // 3. Idle placeholder
    if let Some(message) = layout.placeholder {
        painter.text(
            plot_rect.center(),
            egui::Align2::CENTER_CENTER,
            message,
            egui::FontId::proportional(20.0),
            FILTERED_COLOR.gamma_multiply(0.5),
        );
    }
}
/// Small legend row naming the two traces.
pub fn draw_legend(ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        for (color, label) in [(RAW_COLOR, "Raw"), (FILTERED_COLOR, "Filtered")] {
            let (rect, _) = ui.allocate_exact_size(Vec2::new(18.0, 10.0), egui::Sense::hover());
            ui.painter().line_segment(
                [rect.left_center(), rect.right_center()],
                Stroke::new(if label == "Raw" { 1.0 } else { 3.0 }, color),
            );
            ui.label(egui::RichText::new(label).color(color));
        }
    });
}
