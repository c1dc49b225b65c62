//! Canvas programs for the waveform and timeline surfaces
//!
//! Both surfaces are drawn from the engines' retained display lists; the programs
//! only translate iced input into [`SurfaceInput`]s and replay the lists. The host
//! routes each input back to the engine that owns the surface.

use iced::keyboard;
use iced::widget::canvas::{self, Canvas, Event, Frame, Geometry, Program};
use iced::{mouse, Element, Length, Point, Rectangle, Size, Theme};

use crate::surface::RenderSurface;
use crate::timeline::SequenceTimelineEngine;
use crate::waveform::WaveformEngine;

/// Pixels per wheel "line" for trackpads reporting pixel deltas
pub const PIXELS_PER_NOTCH: f32 = 40.0;

/// Input gesture in surface-local pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceGesture {
    /// Wheel zoom around `x` (positive notches zoom in)
    Wheel { notches: f64, x: f32 },
    /// Horizontal pan (shift+wheel or horizontal scroll)
    Pan { delta: f32 },
    Pressed { x: f32, y: f32 },
    SecondaryPressed { x: f32, y: f32 },
    /// Pointer moved with the primary button held
    Moved { x: f32, y: f32 },
    Released { x: f32, y: f32 },
    /// Escape while dragging
    Cancel,
}

/// One translated event: an optional resize followed by an optional gesture
///
/// The resize is applied first so the gesture's coordinates map against the new
/// surface width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceInput {
    /// Layout size when it differs from the engine's surface
    pub resize: Option<Size>,
    pub gesture: Option<SurfaceGesture>,
}

impl SurfaceInput {
    pub fn gesture(gesture: SurfaceGesture) -> Self {
        Self {
            resize: None,
            gesture: Some(gesture),
        }
    }
}

/// Per-canvas interaction state kept by iced
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceInteraction {
    shift: bool,
    dragging: bool,
}

/// Translate an iced event into surface input
///
/// Returns `None` when the event carries no gesture and the surface size matches
/// the layout.
pub fn translate(
    interaction: &mut SurfaceInteraction,
    event: &Event,
    bounds: Rectangle,
    cursor: mouse::Cursor,
    surface_size: Size,
) -> Option<SurfaceInput> {
    let resize = (bounds.size() != surface_size).then_some(bounds.size());
    let gesture = translate_gesture(interaction, event, bounds, cursor);
    if resize.is_none() && gesture.is_none() {
        return None;
    }
    Some(SurfaceInput { resize, gesture })
}

fn translate_gesture(
    interaction: &mut SurfaceInteraction,
    event: &Event,
    bounds: Rectangle,
    cursor: mouse::Cursor,
) -> Option<SurfaceGesture> {
    if let Event::Keyboard(keyboard::Event::ModifiersChanged(modifiers)) = event {
        interaction.shift = modifiers.shift();
        return None;
    }

    if let Event::Keyboard(keyboard::Event::KeyPressed {
        key: keyboard::Key::Named(keyboard::key::Named::Escape),
        ..
    }) = event
    {
        if interaction.dragging {
            interaction.dragging = false;
            return Some(SurfaceGesture::Cancel);
        }
        return None;
    }

    // Releases and drags are tracked outside the bounds too
    let local = cursor
        .position()
        .map(|p| Point::new(p.x - bounds.x, p.y - bounds.y));

    match event {
        Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) if interaction.dragging => {
            interaction.dragging = false;
            let p = local?;
            Some(SurfaceGesture::Released { x: p.x, y: p.y })
        }
        Event::Mouse(mouse::Event::CursorMoved { .. }) if interaction.dragging => {
            let p = local?;
            Some(SurfaceGesture::Moved { x: p.x, y: p.y })
        }
        _ => {
            let p = cursor.position_in(bounds)?;
            match event {
                Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                    interaction.dragging = true;
                    Some(SurfaceGesture::Pressed { x: p.x, y: p.y })
                }
                Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Right)) => {
                    Some(SurfaceGesture::SecondaryPressed { x: p.x, y: p.y })
                }
                Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                    let (x, y) = match *delta {
                        mouse::ScrollDelta::Lines { x, y } => (x, y),
                        mouse::ScrollDelta::Pixels { x, y } => (x / PIXELS_PER_NOTCH, y / PIXELS_PER_NOTCH),
                    };
                    if interaction.shift {
                        Some(SurfaceGesture::Pan {
                            delta: -y * PIXELS_PER_NOTCH,
                        })
                    } else if x.abs() > y.abs() {
                        Some(SurfaceGesture::Pan {
                            delta: -x * PIXELS_PER_NOTCH,
                        })
                    } else if y != 0.0 {
                        Some(SurfaceGesture::Wheel {
                            notches: y as f64,
                            x: p.x,
                        })
                    } else {
                        None
                    }
                }
                _ => None,
            }
        }
    }
}

fn replay(renderer: &iced::Renderer, bounds: Rectangle, main: &RenderSurface, overlay: &RenderSurface) -> Vec<Geometry> {
    let mut frame = Frame::new(renderer, bounds.size());
    main.replay(&mut frame);
    overlay.replay(&mut frame);
    vec![frame.into_geometry()]
}

// =============================================================================
// Waveform Canvas Program
// =============================================================================

pub struct WaveformCanvas<'a, Message, F>
where
    F: Fn(SurfaceInput) -> Message,
{
    pub engine: &'a WaveformEngine,
    pub on_input: F,
}

impl<'a, Message, F> Program<Message> for WaveformCanvas<'a, Message, F>
where
    Message: Clone,
    F: Fn(SurfaceInput) -> Message,
{
    type State = SurfaceInteraction;

    fn update(
        &self,
        interaction: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        translate(interaction, event, bounds, cursor, self.engine.surface().size())
            .map(|input| canvas::Action::publish((self.on_input)(input)))
    }

    fn mouse_interaction(
        &self,
        _interaction: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if cursor.is_over(bounds) {
            mouse::Interaction::Pointer
        } else {
            mouse::Interaction::default()
        }
    }

    fn draw(
        &self,
        _interaction: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        replay(renderer, bounds, self.engine.surface(), self.engine.overlay())
    }
}

// =============================================================================
// Timeline Canvas Program
// =============================================================================

pub struct TimelineCanvas<'a, Message, F>
where
    F: Fn(SurfaceInput) -> Message,
{
    pub engine: &'a SequenceTimelineEngine,
    pub on_input: F,
}

impl<'a, Message, F> Program<Message> for TimelineCanvas<'a, Message, F>
where
    Message: Clone,
    F: Fn(SurfaceInput) -> Message,
{
    type State = SurfaceInteraction;

    fn update(
        &self,
        interaction: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> Option<canvas::Action<Message>> {
        translate(interaction, event, bounds, cursor, self.engine.surface().size())
            .map(|input| canvas::Action::publish((self.on_input)(input)))
    }

    fn mouse_interaction(
        &self,
        interaction: &Self::State,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> mouse::Interaction {
        if interaction.dragging {
            mouse::Interaction::Grabbing
        } else if cursor
            .position_in(bounds)
            .is_some_and(|p| crate::timeline::layout::hit_test(self.engine.blocks(), p.x, p.y).is_some())
        {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::default()
        }
    }

    fn draw(
        &self,
        _interaction: &Self::State,
        renderer: &iced::Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        replay(renderer, bounds, self.engine.surface(), self.engine.overlay())
    }
}

// =============================================================================
// Views
// =============================================================================

/// Waveform surface element
///
/// `on_input` turns surface input into host messages; the host forwards it to
/// [`WaveformEngine`] (wheel/pan) or the playback tracker (click to seek).
pub fn waveform_view<'a, Message>(
    engine: &'a WaveformEngine,
    on_input: impl Fn(SurfaceInput) -> Message + 'a,
) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    Canvas::new(WaveformCanvas { engine, on_input })
        .width(Length::Fill)
        .height(Length::Fixed(engine.surface().height().max(1.0)))
        .into()
}

/// Timeline surface element
pub fn timeline_view<'a, Message>(
    engine: &'a SequenceTimelineEngine,
    on_input: impl Fn(SurfaceInput) -> Message + 'a,
) -> Element<'a, Message>
where
    Message: Clone + 'a,
{
    Canvas::new(TimelineCanvas { engine, on_input })
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}
