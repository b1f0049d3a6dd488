use crate::utils::*;

use super::TransientMemoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageCursor {
    capacity: u64,
    offset: u64,
}

impl PageCursor {
    fn new(capacity: u64) -> Self {
        Self {
            capacity,
            offset: 0,
        }
    }

    fn suballocate(&mut self, size: u64, alignment: u64) -> Option<u64> {
        let start = align_up(self.offset, alignment);
        let end = start.checked_add(size)?;
        if end > self.capacity {
            return None;
        }
        self.offset = end;
        Some(start)
    }
}

#[derive(Debug)]
struct Page<P> {
    resource: P,
    cursor: PageCursor,
}

#[derive(Debug)]
struct FrameSlot<P> {
    pages: Vec<Page<P>>,
    /// Index of the first page that may still have room this frame.
    active: usize,
}

impl<P> FrameSlot<P> {
    fn used_bytes(&self) -> u64 {
        self.pages.iter().map(|page| page.cursor.offset).sum()
    }
}

/// A region handed out by [`FrameAllocator::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubAllocation {
    /// Index of the page within the current frame.
    pub page: usize,
    pub offset: u64,
    pub size: u64,
    pub frame: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStatistics {
    pub pages: usize,
    pub committed_bytes: u64,
    pub used_bytes: u64,
    pub peak_used_bytes: u64,
    pub allocations: u64,
    pub frame: u64,
}

/// Bump allocator over pages of `P`, with one set of pages per frame in flight.
///
/// A frame's pages are only reused once `frames_in_flight` further frames have been committed.
#[derive(Debug)]
pub struct FrameAllocator<P> {
    slots: Vec<FrameSlot<P>>,
    current: usize,
    page_size: u64,
    frame: u64,
    allocations: u64,
    peak_used_bytes: u64,
}

impl<P> FrameAllocator<P> {
    pub fn new(frames_in_flight: usize, page_size: u64) -> Self {
        let slots = (0..frames_in_flight.max(1))
            .map(|_| FrameSlot {
                pages: Vec::new(),
                active: 0,
            })
            .collect();
        Self {
            slots,
            current: 0,
            page_size: page_size.max(1),
            frame: 0,
            allocations: 0,
            peak_used_bytes: 0,
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Allocates `size` bytes at a multiple of `alignment` in the current frame.
    ///
    /// `make_page` is called with the capacity of the page to create when no existing page of
    /// this frame has room. Requests larger than the page size get a dedicated page rounded up
    /// to a multiple of the page size. Pages skipped over are not revisited until the frame is
    /// recycled.
    pub fn allocate<E: From<TransientMemoryError>>(
        &mut self,
        size: u64,
        alignment: u64,
        make_page: impl FnOnce(u64) -> Result<P, E>,
    ) -> Result<(SubAllocation, &P), E> {
        if size == 0 {
            return Err(TransientMemoryError::ZeroSized.into());
        }
        if !alignment.is_power_of_two() {
            return Err(TransientMemoryError::InvalidAlignment { alignment }.into());
        }
        let slot = &mut self.slots[self.current];
        let mut found: Option<(usize, u64)> = None;
        while slot.active < slot.pages.len() {
            if let Some(offset) = slot.pages[slot.active].cursor.suballocate(size, alignment) {
                found = Some((slot.active, offset));
                break;
            }
            slot.active += 1;
        }
        let (page, offset) = match found {
            Some(found) => found,
            None => {
                let capacity = if size > self.page_size {
                    align_up(size, self.page_size)
                } else {
                    self.page_size
                };
                let resource = make_page(capacity)?;
                slot.pages.push(Page {
                    resource,
                    cursor: PageCursor {
                        capacity,
                        offset: size,
                    },
                });
                slot.active = slot.pages.len() - 1;
                (slot.active, 0)
            }
        };
        self.allocations += 1;
        self.peak_used_bytes = self.peak_used_bytes.max(slot.used_bytes());
        let sub_allocation = SubAllocation {
            page,
            offset,
            size,
            frame: self.frame,
        };
        Ok((sub_allocation, &slot.pages[page].resource))
    }

    /// Page `index` of the current frame.
    pub fn page(&self, index: usize) -> Option<&P> {
        self.slots[self.current]
            .pages
            .get(index)
            .map(|page| &page.resource)
    }

    /// Finishes the current frame and recycles the oldest frame's pages for the next one.
    pub fn commit_frame(&mut self) {
        let used_bytes = self.slots[self.current].used_bytes();
        self.frame += 1;
        self.current = (self.current + 1) % self.slots.len();
        let slot = &mut self.slots[self.current];
        for page in &mut slot.pages {
            page.cursor = PageCursor::new(page.cursor.capacity);
        }
        slot.active = 0;
        log::debug!(
            "committed transient frame {} ({used_bytes} bytes used), recycling {} pages",
            self.frame - 1,
            slot.pages.len()
        );
    }

    /// Releases trailing pages that the last frame written to them left empty. The current
    /// frame keeps its pages. Returns the number of pages released.
    pub fn garbage_collect(&mut self) -> usize {
        let mut released = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if index == self.current {
                continue;
            }
            while slot.pages.last().is_some_and(|page| page.cursor.offset == 0) {
                slot.pages.pop();
                released += 1;
            }
            slot.active = slot.active.min(slot.pages.len());
        }
        if released != 0 {
            log::debug!("released {released} unused transient pages");
        }
        released
    }

    pub fn statistics(&self) -> FrameStatistics {
        let pages = self.slots.iter().flat_map(|slot| slot.pages.iter());
        FrameStatistics {
            pages: pages.clone().count(),
            committed_bytes: pages.map(|page| page.cursor.capacity).sum(),
            used_bytes: self.slots[self.current].used_bytes(),
            peak_used_bytes: self.peak_used_bytes,
            allocations: self.allocations,
            frame: self.frame,
        }
    }
}
