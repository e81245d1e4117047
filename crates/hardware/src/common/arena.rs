//! Request slab.
//!
//! Controllers never hold requests by pointer. Every admitted or synthesized
//! request lives in a `RequestArena` slot and queues carry `Handle`s into it.
//! Freed slots go on a free list and are reused by later allocations; each
//! slot carries a generation counter so a handle to a recycled slot is
//! detected instead of silently aliasing the new occupant.

use super::error::ControllerError;
use super::request::Request;

/// Index into a `RequestArena`, tagged with the slot generation it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Slot index of this handle.
    #[inline]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the slot at the time the handle was issued.
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    value: Option<Request>,
}

/// Slab of requests with a LIFO free list.
#[derive(Debug, Clone, Default)]
pub struct RequestArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl RequestArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty arena with room for `capacity` requests before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Stores `request` and returns its handle, reusing a freed slot when one exists.
    pub fn alloc(&mut self, request: Request) -> Handle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.value = Some(request);
            return Handle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(request),
        });
        Handle {
            index,
            generation: 0,
        }
    }

    /// Returns the request behind `handle`.
    ///
    /// # Errors
    ///
    /// `ControllerError::StaleHandle` if the slot was freed or recycled.
    pub fn get(&self, handle: Handle) -> Result<&Request, ControllerError> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
            .ok_or(ControllerError::StaleHandle(handle))
    }

    /// Returns the request behind `handle` for in-place mutation.
    ///
    /// # Errors
    ///
    /// `ControllerError::StaleHandle` if the slot was freed or recycled.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Request, ControllerError> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
            .ok_or(ControllerError::StaleHandle(handle))
    }

    /// Removes the request behind `handle` and frees its slot.
    ///
    /// # Errors
    ///
    /// `ControllerError::StaleHandle` if the slot was already freed or recycled.
    pub fn remove(&mut self, handle: Handle) -> Result<Request, ControllerError> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation)
            .ok_or(ControllerError::StaleHandle(handle))?;
        let request = slot.value.take().ok_or(ControllerError::StaleHandle(handle))?;
        self.free.push(handle.index);
        self.live -= 1;
        Ok(request)
    }

    /// Number of live requests.
    #[inline]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no request is stored.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated (live plus free).
    #[inline]
    pub const fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
