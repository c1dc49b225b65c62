//! Render surface owned by an engine
//!
//! Engines draw into a retained display list instead of straight into an iced
//! `Frame`. The canvas program replays the list when iced asks it to draw, which keeps
//! rendering decisions testable without a GPU and lets the playhead overlay be redrawn
//! without touching the main layer.

use iced::widget::canvas::{Frame, Path, Stroke, Text};
use iced::{Color, Point, Size};

/// One retained drawing operation (surface-local pixel coordinates)
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    StrokeRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        line_width: f32,
        color: Color,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        line_width: f32,
        color: Color,
    },
    /// Closed filled polygon
    Polygon { points: Vec<(f32, f32)>, color: Color },
    Label {
        x: f32,
        y: f32,
        text: String,
        size: f32,
        color: Color,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RenderSurface {
    width: f32,
    height: f32,
    commands: Vec<DrawCommand>,
    frames: u64,
    disposed: bool,
}

impl RenderSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            ..Self::default()
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Number of completed `begin_frame` calls
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Change the surface size; returns true when it actually changed
    pub fn resize(&mut self, width: f32, height: f32) -> bool {
        let (width, height) = (width.max(0.0), height.max(0.0));
        if self.disposed || (width == self.width && height == self.height) {
            return false;
        }
        self.width = width;
        self.height = height;
        self.commands.clear();
        true
    }

    /// Release the display list; the surface draws nothing afterwards
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.commands = Vec::new();
    }

    /// Start a new frame; returns false (and keeps nothing) once disposed
    pub fn begin_frame(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.commands.clear();
        self.frames += 1;
        true
    }

    pub fn push(&mut self, command: DrawCommand) {
        if !self.disposed {
            self.commands.push(command);
        }
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.push(DrawCommand::FillRect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), line_width: f32, color: Color) {
        self.push(DrawCommand::Line {
            from,
            to,
            line_width,
            color,
        });
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Replay the display list into an iced frame
    pub fn replay(&self, frame: &mut Frame) {
        for command in &self.commands {
            match command {
                DrawCommand::FillRect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => frame.fill_rectangle(Point::new(*x, *y), Size::new(*width, *height), *color),
                DrawCommand::StrokeRect {
                    x,
                    y,
                    width,
                    height,
                    line_width,
                    color,
                } => frame.stroke(
                    &Path::rectangle(Point::new(*x, *y), Size::new(*width, *height)),
                    Stroke::default().with_width(*line_width).with_color(*color),
                ),
                DrawCommand::Line {
                    from,
                    to,
                    line_width,
                    color,
                } => frame.stroke(
                    &Path::line(Point::new(from.0, from.1), Point::new(to.0, to.1)),
                    Stroke::default().with_width(*line_width).with_color(*color),
                ),
                DrawCommand::Polygon { points, color } => {
                    if points.len() < 3 {
                        continue;
                    }
                    let path = Path::new(|builder| {
                        builder.move_to(Point::new(points[0].0, points[0].1));
                        for &(x, y) in &points[1..] {
                            builder.line_to(Point::new(x, y));
                        }
                        builder.close();
                    });
                    frame.fill(&path, *color);
                }
                DrawCommand::Label {
                    x,
                    y,
                    text,
                    size,
                    color,
                } => frame.fill_text(Text {
                    content: text.clone(),
                    position: Point::new(*x, *y),
                    size: (*size).into(),
                    color: *color,
                    ..Text::default()
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_frame_clears_commands() {
        let mut surface = RenderSurface::new(100.0, 50.0);
        surface.begin_frame();
        surface.fill_rect(0.0, 0.0, 10.0, 10.0, Color::BLACK);
        assert_eq!(surface.commands().len(), 1);

        surface.begin_frame();
        assert!(surface.commands().is_empty());
        assert_eq!(surface.frame_count(), 2);
    }

    #[test]
    fn test_resize_reports_change() {
        let mut surface = RenderSurface::new(100.0, 50.0);
        assert!(!surface.resize(100.0, 50.0));
        assert!(surface.resize(200.0, 50.0));
        assert_eq!(surface.width(), 200.0);
    }

    #[test]
    fn test_disposed_surface_draws_nothing() {
        let mut surface = RenderSurface::new(100.0, 50.0);
        surface.dispose();

        assert!(!surface.begin_frame());
        surface.fill_rect(0.0, 0.0, 1.0, 1.0, Color::WHITE);
        assert!(surface.commands().is_empty());
        assert!(!surface.resize(10.0, 10.0));
    }
}
