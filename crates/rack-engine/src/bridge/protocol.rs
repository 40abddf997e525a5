//! Flat f32 frame shared with the browser host.
//! Must stay in sync with the JS reader.
//!
//! Layout (all values f32 / 4 bytes):
//! ```text
//! [Header: 4 floats]   frame counter, cue live, ball count, event count
//! [Balls: 16 × 4]      id, x, y, live   (slot index == ball id)
//! [Events: 32 × 4]     kind, a, b, c
//! ```
//!
//! Ball positions are normalized table space.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::api::types::BallId;

pub const HEADER_FLOATS: usize = 4;

pub const HEADER_FRAME_COUNTER: usize = 0;
pub const HEADER_CUE_LIVE: usize = 1;
pub const HEADER_BALL_COUNT: usize = 2;
pub const HEADER_EVENT_COUNT: usize = 3;

/// Cue plus fifteen object balls.
pub const BALL_SLOTS: usize = 16;

/// Floats per ball slot: id, x, y, live. Fixed by the wire format.
pub const BALL_SLOT_FLOATS: usize = 4;

/// Floats per event: kind, a, b, c. Fixed by the wire format.
pub const EVENT_FLOATS: usize = 4;

pub const MAX_EVENTS: usize = 32;

pub const BALL_DATA_OFFSET: usize = HEADER_FLOATS;
pub const EVENT_DATA_OFFSET: usize = BALL_DATA_OFFSET + BALL_SLOTS * BALL_SLOT_FLOATS;
pub const FRAME_FLOATS: usize = EVENT_DATA_OFFSET + MAX_EVENTS * EVENT_FLOATS;

/// Event kinds understood by the host.
pub const EVENT_TURN_CHANGED: f32 = 1.0;
pub const EVENT_SCORE_UPDATED: f32 = 2.0;
pub const EVENT_FOUL: f32 = 3.0;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct BallSlot {
    pub id: f32,
    pub x: f32,
    pub y: f32,
    /// 1.0 while the ball is on the table.
    pub live: f32,
}

/// Generic event record: `kind` identifies the event, `a/b/c` carry payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct FrameEvent {
    pub kind: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

/// The frame buffer itself. Overwritten in place every tick.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    data: Vec<f32>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        let mut buffer = Self {
            data: vec![0.0; FRAME_FLOATS],
        };
        for i in 0..BALL_SLOTS {
            buffer.write_slot(i, BallSlot {
                id: i as f32,
                ..BallSlot::default()
            });
        }
        buffer
    }

    /// Bump the frame counter and forget last frame's events.
    pub fn begin_frame(&mut self) {
        self.data[HEADER_FRAME_COUNTER] += 1.0;
        self.data[HEADER_EVENT_COUNT] = 0.0;
    }

    pub fn frame_counter(&self) -> u32 {
        self.data[HEADER_FRAME_COUNTER] as u32
    }

    fn write_slot(&mut self, index: usize, slot: BallSlot) {
        let offset = BALL_DATA_OFFSET + index * BALL_SLOT_FLOATS;
        self.data[offset..offset + BALL_SLOT_FLOATS].copy_from_slice(bytemuck::cast_slice(&[slot]));
    }

    pub fn slot(&self, id: BallId) -> Option<BallSlot> {
        if id.index() >= BALL_SLOTS {
            return None;
        }
        let offset = BALL_DATA_OFFSET + id.index() * BALL_SLOT_FLOATS;
        Some(bytemuck::pod_read_unaligned(bytemuck::cast_slice(
            &self.data[offset..offset + BALL_SLOT_FLOATS],
        )))
    }

    pub fn set_cue(&mut self, pos: Option<Vec2>) {
        let slot = match pos {
            Some(p) => BallSlot { id: 0.0, x: p.x, y: p.y, live: 1.0 },
            None => BallSlot::default(),
        };
        self.write_slot(BallId::CUE.index(), slot);
        self.data[HEADER_CUE_LIVE] = slot.live;
    }

    /// Replace every object-ball slot. Ids not listed are marked not live.
    pub fn set_balls(&mut self, balls: &[(BallId, Vec2)]) {
        for i in 1..BALL_SLOTS {
            self.write_slot(i, BallSlot {
                id: i as f32,
                ..BallSlot::default()
            });
        }
        let mut count = 0;
        for (id, pos) in balls {
            if id.is_cue() || id.index() >= BALL_SLOTS {
                continue;
            }
            self.write_slot(id.index(), BallSlot {
                id: id.0 as f32,
                x: pos.x,
                y: pos.y,
                live: 1.0,
            });
            count += 1;
        }
        self.data[HEADER_BALL_COUNT] = count as f32;
    }

    pub fn event_count(&self) -> usize {
        self.data[HEADER_EVENT_COUNT] as usize
    }

    /// Append an event. Returns false once the event section is full.
    pub fn push_event(&mut self, event: FrameEvent) -> bool {
        let count = self.event_count();
        if count >= MAX_EVENTS {
            log::warn!("Frame event section full, dropping kind {}", event.kind);
            return false;
        }
        let offset = EVENT_DATA_OFFSET + count * EVENT_FLOATS;
        self.data[offset..offset + EVENT_FLOATS].copy_from_slice(bytemuck::cast_slice(&[event]));
        self.data[HEADER_EVENT_COUNT] = (count + 1) as f32;
        true
    }

    pub fn events(&self) -> &[FrameEvent] {
        let end = EVENT_DATA_OFFSET + self.event_count() * EVENT_FLOATS;
        bytemuck::cast_slice(&self.data[EVENT_DATA_OFFSET..end])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_ptr(&self) -> *const f32 {
        self.data.as_ptr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_contiguous() {
        assert_eq!(BALL_DATA_OFFSET, 4);
        assert_eq!(EVENT_DATA_OFFSET, 4 + 16 * 4);
        assert_eq!(FRAME_FLOATS, 4 + 16 * 4 + 32 * 4);
        assert_eq!(std::mem::size_of::<BallSlot>(), BALL_SLOT_FLOATS * 4);
        assert_eq!(std::mem::size_of::<FrameEvent>(), EVENT_FLOATS * 4);
        assert_eq!(FrameBuffer::new().as_slice().len(), FRAME_FLOATS);
    }

    #[test]
    fn slots_land_at_their_id() {
        let mut frame = FrameBuffer::new();
        frame.set_cue(Some(Vec2::new(0.25, 0.5)));
        frame.set_balls(&[(BallId(3), Vec2::new(0.75, 0.5)), (BallId(15), Vec2::new(0.9, 0.1))]);

        assert_eq!(frame.as_slice()[HEADER_CUE_LIVE], 1.0);
        assert_eq!(frame.as_slice()[HEADER_BALL_COUNT], 2.0);
        assert_eq!(frame.slot(BallId(3)), Some(BallSlot { id: 3.0, x: 0.75, y: 0.5, live: 1.0 }));
        assert_eq!(frame.slot(BallId(4)).map(|s| s.live), Some(0.0));
        let raw = &frame.as_slice()[BALL_DATA_OFFSET + 15 * 4..BALL_DATA_OFFSET + 16 * 4];
        assert_eq!(raw, &[15.0, 0.9, 0.1, 1.0]);
    }

    #[test]
    fn potted_ball_goes_dark() {
        let mut frame = FrameBuffer::new();
        frame.set_balls(&[(BallId(1), Vec2::ZERO), (BallId(2), Vec2::ONE)]);
        frame.set_balls(&[(BallId(2), Vec2::ONE)]);
        assert_eq!(frame.slot(BallId(1)).map(|s| s.live), Some(0.0));
        assert_eq!(frame.slot(BallId(1)).map(|s| s.id), Some(1.0));
        frame.set_cue(None);
        assert_eq!(frame.as_slice()[HEADER_CUE_LIVE], 0.0);
    }

    #[test]
    fn events_reset_each_frame_and_cap() {
        let mut frame = FrameBuffer::new();
        frame.begin_frame();
        assert!(frame.push_event(FrameEvent { kind: EVENT_SCORE_UPDATED, a: 1.0, b: 8.0, c: 2.0 }));
        assert_eq!(frame.events().len(), 1);
        assert_eq!(frame.events()[0].b, 8.0);

        frame.begin_frame();
        assert_eq!(frame.frame_counter(), 2);
        assert!(frame.events().is_empty());

        for _ in 0..MAX_EVENTS {
            assert!(frame.push_event(FrameEvent::default()));
        }
        assert!(!frame.push_event(FrameEvent::default()));
        assert_eq!(frame.event_count(), MAX_EVENTS);
    }
}
