//! Frame-to-frame object identity by maximum IOU.
//!
//! The tracker only looks one frame back and does not handle occlusion: an
//! object missing for one frame comes back with a new id.

use std::fmt;

use serde::Serialize;

use crate::geom::{iou, Normalized, Rect};
use crate::label::ObjectId;

/// IOU at or above which two rectangles are the same object.
pub const DEFAULT_IOU_THR: f64 = 0.5;

/// Something the tracker can assign ids to.
pub trait Trackable {
    /// Coordinate space of [`Trackable::rect`].
    type Space;

    fn rect(&self) -> Rect<Self::Space>;

    fn id(&self) -> ObjectId;

    fn set_id(&mut self, id: ObjectId);

    /// Number of consecutive frames the object has been seen.
    fn life(&self) -> u32;

    fn set_life(&mut self, life: u32);
}

/// Tracks objects of one stream. Frames must be fed in order.
#[derive(Clone)]
pub struct IouTracker<T> {
    iou_thr: f64,
    objects: Vec<T>,
    next_id: i64,
}

impl<T> Default for IouTracker<T> {
    fn default() -> Self {
        Self::new(DEFAULT_IOU_THR)
    }
}

impl<T> IouTracker<T> {
    /// A tracker whose fresh ids start at 1.
    pub fn new(iou_thr: f64) -> Self {
        Self::starting_at(iou_thr, ObjectId::new(1))
    }

    /// A tracker whose fresh ids start at `first_id`, e.g. to continue a
    /// counter kept elsewhere.
    pub fn starting_at(iou_thr: f64, first_id: ObjectId) -> Self {
        Self {
            iou_thr,
            objects: Vec::new(),
            next_id: first_id.as_i64(),
        }
    }

    pub fn iou_thr(&self) -> f64 {
        self.iou_thr
    }

    /// Objects of the last tracked frame.
    pub fn objects(&self) -> &[T] {
        &self.objects
    }

    /// The id the next new object will get.
    pub fn peek_next_id(&self) -> ObjectId {
        ObjectId::new(self.next_id)
    }

    fn fresh_id(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

impl<T: Trackable + Clone> IouTracker<T> {
    /// Assigns ids and lives to the objects of a new frame and remembers
    /// them for the next one.
    ///
    /// Each object takes the id of the previous object it overlaps most,
    /// if that IOU reaches the threshold, and one more frame of life. When
    /// an earlier object of this frame already took that id (one object
    /// split in two), it gets a fresh id but still inherits the life.
    /// Anything else is new: a fresh id and a life of 1.
    ///
    /// Among equal IOUs the earliest previous object wins.
    pub fn track(&mut self, objects: &mut [T]) {
        let mut claimed: Vec<ObjectId> = Vec::with_capacity(objects.len());

        for ob in objects.iter_mut() {
            let rect = ob.rect();
            let mut best: Option<(f64, usize)> = None;
            for (i, prev) in self.objects.iter().enumerate() {
                let v = iou(&rect, &prev.rect());
                if best.map_or(true, |(b, _)| v > b) {
                    best = Some((v, i));
                }
            }

            match best.filter(|(v, _)| *v >= self.iou_thr) {
                Some((v, i)) => {
                    let prev_id = self.objects[i].id();
                    let prev_life = self.objects[i].life();
                    if claimed.contains(&prev_id) {
                        let id = self.fresh_id();
                        log::debug!("object {prev_id} split, new id {id}");
                        ob.set_id(id);
                    } else {
                        log::trace!("object {prev_id} continues (iou {v:.3})");
                        ob.set_id(prev_id);
                        claimed.push(prev_id);
                    }
                    ob.set_life(prev_life + 1);
                }
                None => {
                    let id = self.fresh_id();
                    ob.set_id(id);
                    ob.set_life(1);
                }
            }
        }

        self.objects = objects.to_vec();
    }
}

/// A detected box with a class and score, the usual tracker input.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub id: ObjectId,
    pub life: u32,
    pub class_id: u32,
    pub score: f64,
    pub rect: Rect<Normalized>,
}

impl Detection {
    /// An untracked detection.
    pub fn new(class_id: u32, score: f64, rect: Rect<Normalized>) -> Self {
        Self {
            id: ObjectId::UNASSIGNED,
            life: 0,
            class_id,
            score,
            rect,
        }
    }
}

impl Trackable for Detection {
    type Space = Normalized;

    fn rect(&self) -> Rect<Normalized> {
        self.rect
    }

    fn id(&self) -> ObjectId {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn life(&self) -> u32 {
        self.life
    }

    fn set_life(&mut self, life: u32) {
        self.life = life;
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} class {} life {} score {:.2} {:?}",
            self.id, self.class_id, self.life, self.score, self.rect
        )
    }
}
