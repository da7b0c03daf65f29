use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use crate::drivers::error::MonitorError;
use crate::render::{ChartConfig, ChartLayout, Series, TIME_AXIS_TITLE};
use crate::types::Sample;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub raw: RGBColor,
    pub filtered: RGBColor,
    /// Text needs a system font; headless callers can turn it off.
    pub labels: bool,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 15),
            // sky blue / gold, matching the live view
            raw: RGBColor(135, 206, 235),
            filtered: RGBColor(255, 215, 0),
            labels: true,
        }
    }
}
/// Renders the same frame the live view shows into a PNG.
pub fn render_chart_png(
    samples: &[Sample],
    config: &ChartConfig,
    style: &PlotStyle,
) -> Result<Vec<u8>, MonitorError> {
    if style.width == 0 || style.height == 0 {
        return Err(MonitorError::Plot("image size must be non-zero".into()));
    }
    let layout = ChartLayout::compute(samples, config, style.width as f32, style.height as f32);
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let grid = WHITE.mix(0.08);
        let text = ("sans-serif", 11).into_font().color(&WHITE.mix(0.5));
        let w = layout.width as i32;
        let plot_h = layout.plot_height as i32;
        for line in &layout.horizontal {
            let y = line.position as i32;
            root.draw(&PathElement::new(vec![(0, y), (w, y)], grid))?;
            if let (true, Some(label)) = (style.labels, &line.label) {
                root.draw(&Text::new(label.clone(), (w - 40, y + 4), text.clone()))?;
            }
        }
        for line in &layout.vertical {
            let x = line.position as i32;
            root.draw(&PathElement::new(vec![(x, 0), (x, plot_h)], grid))?;
            if let (true, Some(label)) = (style.labels, &line.label) {
                root.draw(&Text::new(label.clone(), ((x - 14).max(0), plot_h + 6), text.clone()))?;
            }
        }
        if style.labels {
            root.draw(&Text::new(TIME_AXIS_TITLE, (w / 2 - 30, plot_h + 22), text.clone()))?;
        }
        for trace in &layout.traces {
            let (color, width) = match trace.series {
                Series::Raw => (style.raw, 1),
                Series::Filtered => (style.filtered, 3),
            };
            let points: Vec<(i32, i32)> = trace
                .points
                .iter()
                .map(|[x, y]| (*x as i32, *y as i32))
                .collect();
            root.draw(&PathElement::new(points, color.stroke_width(width)))?;
        }
        if let (true, Some(message)) = (style.labels, layout.placeholder) {
            let font = ("sans-serif", 20).into_font().color(&RGBColor(255, 215, 0).mix(0.5));
            root.draw(&Text::new(message, (w / 2 - 110, plot_h / 2), font))?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, MonitorError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| MonitorError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::stats::Quality;
    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    fn headless() -> PlotStyle {
        PlotStyle {
            width: 200,
            height: 120,
            labels: false,
            ..PlotStyle::default()
        }
    }
    #[test]
    fn renders_idle_frame() {
        let png = render_chart_png(&[], &ChartConfig::default(), &headless()).unwrap();
        assert_eq!(png[..8], PNG_MAGIC);
    }
    #[test]
    fn renders_traces() {
        let samples: Vec<Sample> = (0..50)
            .map(|i| Sample {
                time_ms: i * 60,
                epoch_ms: i as i64 * 60,
                raw: 2000.0 + i as f64 * 10.0,
                filtered: 9000.0,
                frequency_hz: None,
                quality: Quality::Excellent,
            })
            .collect();
        let png = render_chart_png(&samples, &ChartConfig::default(), &headless()).unwrap();
        assert_eq!(png[..8], PNG_MAGIC);
        let zero = PlotStyle { width: 0, ..headless() };
        assert!(render_chart_png(&samples, &ChartConfig::default(), &zero).is_err());
    }
}
