use std::collections::HashMap;

use glam::Vec2;
use winit::event::{MouseScrollDelta, TouchPhase};

/// A press and release closer than this (logical pixels) is a click, not a drag.
pub const CLICK_THRESHOLD: f32 = 5.0;
/// Pixels per wheel line, for mice that report lines.
pub const WHEEL_LINE_HEIGHT: f32 = 100.0;

/// Pointer input after winit events have been folded into gestures. Positions
/// are in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Click { position: Vec2 },
    Drag { delta: Vec2 },
    /// Positive scrolls forward (content moves up), like a browser's `deltaY`.
    Wheel { delta: f32 },
    TouchStart { id: u64, position: Vec2 },
    TouchMove { id: u64, previous: Vec2, position: Vec2 },
    TouchEnd { id: u64, position: Vec2 },
}

#[derive(Debug, Clone, Copy)]
struct Press {
    travel: f32,
}

#[derive(Debug, Default)]
pub struct PointerTracker {
    cursor: Vec2,
    press: Option<Press>,
    touches: HashMap<u64, Vec2>,
}

impl PointerTracker {
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    pub fn cursor_moved(&mut self, position: Vec2) -> Option<InputEvent> {
        let delta = position - self.cursor;
        self.cursor = position;

        let press = self.press.as_mut()?;
        press.travel += delta.length();
        Some(InputEvent::Drag { delta })
    }

    pub fn primary_button(&mut self, pressed: bool) -> Option<InputEvent> {
        if pressed {
            self.press = Some(Press { travel: 0.0 });
            return None;
        }

        let press = self.press.take()?;
        (press.travel < CLICK_THRESHOLD).then_some(InputEvent::Click {
            position: self.cursor,
        })
    }

    pub fn touch(&mut self, phase: TouchPhase, id: u64, position: Vec2) -> Option<InputEvent> {
        match phase {
            TouchPhase::Started => {
                self.touches.insert(id, position);
                Some(InputEvent::TouchStart { id, position })
            }
            TouchPhase::Moved => {
                let previous = self.touches.insert(id, position).unwrap_or(position);
                Some(InputEvent::TouchMove {
                    id,
                    previous,
                    position,
                })
            }
            TouchPhase::Ended => {
                self.touches.remove(&id);
                Some(InputEvent::TouchEnd { id, position })
            }
            TouchPhase::Cancelled => {
                self.touches.remove(&id);
                None
            }
        }
    }
}

/// Converts a winit wheel delta into browser-style pixels.
pub fn wheel_delta(delta: MouseScrollDelta, scale_factor: f64) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * WHEEL_LINE_HEIGHT,
        MouseScrollDelta::PixelDelta(position) => -(position.y / scale_factor) as f32,
    }
}

#[cfg(test)]
mod tests {
    use winit::dpi::PhysicalPosition;

    use super::*;

    #[test]
    fn short_press_is_a_click() {
        let mut tracker = PointerTracker::default();
        tracker.cursor_moved(Vec2::new(100.0, 100.0));

        assert_eq!(tracker.primary_button(true), None);
        tracker.cursor_moved(Vec2::new(102.0, 101.0));

        assert_eq!(
            tracker.primary_button(false),
            Some(InputEvent::Click {
                position: Vec2::new(102.0, 101.0)
            })
        );
    }

    #[test]
    fn long_drag_is_not_a_click() {
        let mut tracker = PointerTracker::default();
        tracker.primary_button(true);

        let drag = tracker.cursor_moved(Vec2::new(30.0, 0.0));
        assert_eq!(
            drag,
            Some(InputEvent::Drag {
                delta: Vec2::new(30.0, 0.0)
            })
        );

        // Coming back doesn't undo the travel.
        tracker.cursor_moved(Vec2::ZERO);
        assert_eq!(tracker.primary_button(false), None);
    }

    #[test]
    fn hovering_does_not_drag() {
        let mut tracker = PointerTracker::default();
        assert_eq!(tracker.cursor_moved(Vec2::new(10.0, 10.0)), None);
        assert_eq!(tracker.primary_button(false), None);
    }

    #[test]
    fn touch_moves_report_previous_position() {
        let mut tracker = PointerTracker::default();
        tracker.touch(TouchPhase::Started, 1, Vec2::new(0.0, 500.0));

        assert_eq!(
            tracker.touch(TouchPhase::Moved, 1, Vec2::new(0.0, 450.0)),
            Some(InputEvent::TouchMove {
                id: 1,
                previous: Vec2::new(0.0, 500.0),
                position: Vec2::new(0.0, 450.0),
            })
        );

        assert!(matches!(
            tracker.touch(TouchPhase::Ended, 1, Vec2::new(0.0, 450.0)),
            Some(InputEvent::TouchEnd { id: 1, .. })
        ));
        assert_eq!(tracker.touch(TouchPhase::Cancelled, 2, Vec2::ZERO), None);
    }

    #[test]
    fn wheel_lines_are_hundred_pixels() {
        assert_eq!(wheel_delta(MouseScrollDelta::LineDelta(0.0, -2.0), 1.0), 200.0);
        assert_eq!(
            wheel_delta(
                MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -60.0)),
                2.0
            ),
            30.0
        );
    }
}
