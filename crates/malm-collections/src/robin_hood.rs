//! Robin Hood hash set over an allocator handle.

use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr;

use malm_core::{Alloc, EntryKey, KeyOps, RawBlock};

use crate::error::CollectionError;

const PSL_BITS: u32 = 15;
const HASH_BITS: u32 = 48;
/// Maximal probe-sequence length; doubles as the sentinel marker.
const PSL_MAX: u16 = (1u16 << PSL_BITS) - 1;
const HASH_MASK: u64 = (1u64 << HASH_BITS) - 1;

/// Slot metadata: used flag (bit 0), probe-sequence length (15 bits),
/// truncated hash (48 bits), packed into one word.
#[derive(Clone, Copy, PartialEq, Eq)]
struct SlotMeta(u64);

impl SlotMeta {
    const EMPTY: Self = Self(0);

    fn occupied(psl: u16, hash48: u64) -> Self {
        debug_assert!(psl <= PSL_MAX);
        debug_assert!(hash48 <= HASH_MASK);
        Self(1 | (u64::from(psl) << 1) | (hash48 << (PSL_BITS + 1)))
    }

    fn sentinel() -> Self {
        Self::occupied(PSL_MAX, 0)
    }

    fn used(self) -> bool {
        self.0 & 1 != 0
    }

    fn psl(self) -> u16 {
        ((self.0 >> 1) & u64::from(PSL_MAX)) as u16
    }

    fn hash48(self) -> u64 {
        self.0 >> (PSL_BITS + 1)
    }

    fn bump_psl(self) -> Self {
        Self::occupied(self.psl() + 1, self.hash48())
    }
}

/// One table slot: metadata word plus entry storage.
#[repr(C)]
struct Slot<T> {
    meta: SlotMeta,
    entry: MaybeUninit<T>,
}

/// Write empty metadata into the first `capacity` slots and the
/// sentinel marker into the extra slot.
///
/// # Safety
///
/// `base` must point to storage for `capacity + 1` slots.
unsafe fn init_slots<T>(base: *mut Slot<T>, capacity: usize) {
    for index in 0..capacity {
        // SAFETY: index < capacity stays inside the storage; writing
        // through addr_of_mut! touches only the meta word.
        unsafe { ptr::addr_of_mut!((*base.add(index)).meta).write(SlotMeta::EMPTY) };
    }
    // SAFETY: the extra slot is within the storage.
    unsafe { ptr::addr_of_mut!((*base.add(capacity)).meta).write(SlotMeta::sentinel()) };
}

/// Displacement-only insert used while rebuilding into a larger table.
///
/// No equality checks: a rebuild never sees duplicate keys, and the
/// stored 48-bit hash is exactly what a fresh hash-and-mask would give.
///
/// # Safety
///
/// `base` must point to an initialized table of `capacity + 1` slots
/// with at least one empty slot, and `capacity` must be nonzero.
unsafe fn rehash_insert<T>(base: *mut Slot<T>, capacity: usize, hash48: u64, entry: T) {
    let mut cand_meta = SlotMeta::occupied(0, hash48);
    let mut cand_entry = entry;
    let mut index = (hash48 % capacity as u64) as usize;
    loop {
        // SAFETY: index wraps at capacity, staying inside the table.
        let resident = unsafe { base.add(index) };
        let meta = unsafe { (*resident).meta };
        if !meta.used() {
            // SAFETY: the slot is empty; the candidate comes to rest.
            unsafe {
                ptr::addr_of_mut!((*resident).meta).write(cand_meta);
                (*resident).entry.write(cand_entry);
            }
            return;
        }
        if cand_meta.psl() > meta.psl() {
            // SAFETY: both entries are initialized; swap candidate and
            // resident wholesale.
            unsafe {
                ptr::addr_of_mut!((*resident).meta).write(cand_meta);
                ptr::swap((*resident).entry.as_mut_ptr(), &mut cand_entry);
            }
            cand_meta = meta;
        }
        index += 1;
        if index == capacity {
            index = 0;
        }
        cand_meta = cand_meta.bump_psl();
    }
}

/// Open-addressing hash set with Robin Hood displacement.
///
/// Stores whole entries; [`EntryKey`] exposes the key portion and a
/// [`KeyOps`] value supplies the hash and equality capabilities. Slots
/// live in one block of `capacity + 1` obtained from the allocator
/// handle; the extra slot is a permanent sentinel that serves as
/// insertion scratch mid-flight and as the iteration end-marker at
/// rest.
///
/// The load factor never exceeds 3/4 after an insert returns: an
/// insert that would cross it first rebuilds the table at double
/// capacity (a full linear rehash, built completely before the old
/// table is discarded). Removal uses backward-shift deletion, so
/// lookups can rely on the probe-length invariant with no tombstones.
///
/// A failed growth leaves the set exactly as it was. Over an arena
/// handle growth allocates fresh tables and the discarded ones are
/// never reclaimed; back the set with a heap or pool handle instead.
pub struct RobinHood<'a, T, O, A>
where
    T: EntryKey,
    O: KeyOps<T::Key>,
    A: Alloc + ?Sized,
{
    alloc: &'a A,
    block: RawBlock,
    capacity: usize,
    count: usize,
    ops: O,
    _entries: PhantomData<T>,
}

impl<'a, T, O, A> std::fmt::Debug for RobinHood<'a, T, O, A>
where
    T: EntryKey,
    O: KeyOps<T::Key>,
    A: Alloc + ?Sized,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobinHood")
            .field("capacity", &self.capacity)
            .field("count", &self.count)
            .finish()
    }
}

impl<'a, T, O, A> RobinHood<'a, T, O, A>
where
    T: EntryKey,
    O: KeyOps<T::Key>,
    A: Alloc + ?Sized,
{
    /// Create a set with a nonzero initial capacity.
    pub fn new(alloc: &'a A, capacity: usize, ops: O) -> Result<Self, CollectionError> {
        crate::check_layout::<T>()?;
        if capacity == 0 {
            return Err(CollectionError::InvalidCapacity);
        }
        let bytes = capacity
            .checked_add(1)
            .and_then(|slots| slots.checked_mul(std::mem::size_of::<Slot<T>>()))
            .ok_or(CollectionError::CapacityOverflow)?;
        let block = alloc
            .alloc(bytes)
            .ok_or(CollectionError::AllocFailed { requested: bytes })?;
        // SAFETY: the block holds capacity + 1 slots.
        unsafe { init_slots(block.as_ptr().cast::<Slot<T>>(), capacity) };
        Ok(Self {
            alloc,
            block,
            capacity,
            count: 0,
            ops,
            _entries: PhantomData,
        })
    }

    /// Pointer to slot `index`.
    ///
    /// # Safety
    ///
    /// `index` must be at most `capacity` (the sentinel).
    unsafe fn slot(&self, index: usize) -> *mut Slot<T> {
        debug_assert!(index <= self.capacity);
        // SAFETY: the block holds capacity + 1 slots.
        unsafe { self.block.as_ptr().cast::<Slot<T>>().add(index) }
    }

    /// Probe for a key, returning its slot index.
    fn find_index(&self, key: &T::Key) -> Option<usize> {
        let hash = self.ops.hash(key) & HASH_MASK;
        let mut index = (hash % self.capacity as u64) as usize;
        let mut probe = 0u32;
        loop {
            // SAFETY: index wraps at capacity.
            let meta = unsafe { (*self.slot(index)).meta };
            if !meta.used() {
                return None;
            }
            if u32::from(meta.psl()) < probe {
                // The probe invariant says the key cannot rest past a
                // slot whose entry sits closer to its own home.
                return None;
            }
            if meta.hash48() == hash {
                // SAFETY: the slot is occupied, so the entry is
                // initialized.
                let entry = unsafe { (*self.slot(index)).entry.assume_init_ref() };
                if self.ops.eq(entry.key(), key) {
                    return Some(index);
                }
            }
            index += 1;
            if index == self.capacity {
                index = 0;
            }
            probe += 1;
        }
    }

    /// Insert an entry, overwriting a present entry with the same key.
    ///
    /// Grows first whenever the insert would push the load factor above
    /// 3/4; a failed growth leaves the set unchanged.
    pub fn insert(&mut self, entry: T) -> Result<(), CollectionError> {
        if (self.count + 1) * 4 > self.capacity * 3 {
            self.grow()?;
        }
        let hash = self.ops.hash(entry.key()) & HASH_MASK;
        let capacity = self.capacity;

        // SAFETY throughout: indices wrap at capacity; the sentinel slot
        // (index capacity) is the insertion scratch holding the in-flight
        // candidate, and its marker is restored on every exit path.
        unsafe {
            let scratch = self.slot(capacity);
            ptr::addr_of_mut!((*scratch).meta).write(SlotMeta::occupied(0, hash));
            (*scratch).entry.write(entry);

            let mut index = (hash % capacity as u64) as usize;
            loop {
                let resident = self.slot(index);
                let meta = (*resident).meta;
                if !meta.used() {
                    // Empty slot: the candidate comes to rest here.
                    ptr::copy_nonoverlapping(scratch, resident, 1);
                    ptr::addr_of_mut!((*scratch).meta).write(SlotMeta::sentinel());
                    self.count += 1;
                    return Ok(());
                }
                let cand = (*scratch).meta;
                if meta.hash48() == cand.hash48()
                    && self.ops.eq(
                        (*resident).entry.assume_init_ref().key(),
                        (*scratch).entry.assume_init_ref().key(),
                    )
                {
                    // Same key: the candidate replaces the resident
                    // entry at its probe position.
                    ptr::drop_in_place((*resident).entry.as_mut_ptr());
                    ptr::copy_nonoverlapping(
                        (*scratch).entry.as_ptr(),
                        (*resident).entry.as_mut_ptr(),
                        1,
                    );
                    ptr::addr_of_mut!((*scratch).meta).write(SlotMeta::sentinel());
                    return Ok(());
                }
                if cand.psl() > meta.psl() {
                    // Robin Hood displacement: steal the slot and keep
                    // probing with the evicted entry.
                    ptr::swap(resident, scratch);
                }
                index += 1;
                if index == capacity {
                    index = 0;
                }
                (*scratch).meta = (*scratch).meta.bump_psl();
            }
        }
    }

    /// Rebuild at double capacity, re-homing every live entry.
    fn grow(&mut self) -> Result<(), CollectionError> {
        let new_capacity = self
            .capacity
            .checked_mul(2)
            .ok_or(CollectionError::CapacityOverflow)?;
        let bytes = new_capacity
            .checked_add(1)
            .and_then(|slots| slots.checked_mul(std::mem::size_of::<Slot<T>>()))
            .ok_or(CollectionError::CapacityOverflow)?;
        let new_block = self
            .alloc
            .alloc(bytes)
            .ok_or(CollectionError::AllocFailed { requested: bytes })?;
        let new_base = new_block.as_ptr().cast::<Slot<T>>();

        // Build the new table completely, then discard the old one. The
        // rebuild touches no user capabilities, so it cannot fail or
        // panic midway.
        unsafe {
            // SAFETY: the new block holds new_capacity + 1 slots.
            init_slots(new_base, new_capacity);
            for index in 0..self.capacity {
                let slot = self.slot(index);
                let meta = (*slot).meta;
                if meta.used() {
                    // SAFETY: occupied slots hold initialized entries;
                    // reading moves them into the new table.
                    let entry = (*slot).entry.as_ptr().read();
                    rehash_insert(new_base, new_capacity, meta.hash48(), entry);
                }
            }
        }
        self.alloc.release(self.block);
        self.block = new_block;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        let index = self.find_index(key)?;
        // SAFETY: find_index returned an occupied slot.
        Some(unsafe { (*self.slot(index)).entry.assume_init_ref() })
    }

    /// Remove an entry by key and return it.
    ///
    /// Performs backward-shift deletion: every follower in the probe
    /// chain moves one slot toward its home with its probe length
    /// decremented, so lookups keep their early-termination rule
    /// without tombstones.
    pub fn remove(&mut self, key: &T::Key) -> Option<T> {
        let mut index = self.find_index(key)?;
        // SAFETY: find_index returned an occupied slot; reading moves
        // the entry out before the shift overwrites the slot.
        let entry = unsafe { (*self.slot(index)).entry.as_ptr().read() };
        self.count -= 1;

        // SAFETY: indices wrap at capacity; each shifted slot is
        // occupied, and the hole left at the end is marked empty.
        unsafe {
            loop {
                let next = if index + 1 == self.capacity { 0 } else { index + 1 };
                let next_slot = self.slot(next);
                let next_meta = (*next_slot).meta;
                if !next_meta.used() || next_meta.psl() == 0 {
                    ptr::addr_of_mut!((*self.slot(index)).meta).write(SlotMeta::EMPTY);
                    break;
                }
                let here = self.slot(index);
                ptr::addr_of_mut!((*here).meta)
                    .write(SlotMeta::occupied(next_meta.psl() - 1, next_meta.hash48()));
                ptr::copy_nonoverlapping((*next_slot).entry.as_ptr(), (*here).entry.as_mut_ptr(), 1);
                index = next;
            }
        }
        Some(entry)
    }

    /// Iterate the live entries in bucket order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slot: self.block.as_ptr().cast::<Slot<T>>(),
            _entries: PhantomData,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the set holds no entries.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current bucket capacity (excluding the sentinel slot).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes held by the slot block.
    pub fn memory_bytes(&self) -> usize {
        self.block.size()
    }
}

impl<T, O, A> Drop for RobinHood<'_, T, O, A>
where
    T: EntryKey,
    O: KeyOps<T::Key>,
    A: Alloc + ?Sized,
{
    fn drop(&mut self) {
        if std::mem::needs_drop::<T>() {
            for index in 0..self.capacity {
                // SAFETY: occupied slots hold initialized entries; the
                // sentinel is excluded and never holds one at rest.
                unsafe {
                    let slot = self.slot(index);
                    if (*slot).meta.used() {
                        ptr::drop_in_place((*slot).entry.as_mut_ptr());
                    }
                }
            }
        }
        self.alloc.release(self.block);
    }
}

/// Bucket-order iterator over a [`RobinHood`] set.
///
/// Skips unused slots and stops at the sentinel's maximal-psl marker.
pub struct Iter<'s, T> {
    slot: *const Slot<T>,
    _entries: PhantomData<&'s T>,
}

impl<'s, T> Iterator for Iter<'s, T> {
    type Item = &'s T;

    fn next(&mut self) -> Option<&'s T> {
        loop {
            // SAFETY: the walk cannot pass slot `capacity`: its sentinel
            // marker is always present and stops it.
            let meta = unsafe { (*self.slot).meta };
            if meta.used() {
                if meta.psl() == PSL_MAX {
                    return None;
                }
                // SAFETY: occupied non-sentinel slots hold initialized
                // entries.
                let entry = unsafe { (*self.slot).entry.assume_init_ref() };
                // SAFETY: not at the sentinel, so one step stays in the
                // table.
                self.slot = unsafe { self.slot.add(1) };
                return Some(entry);
            }
            // SAFETY: as above.
            self.slot = unsafe { self.slot.add(1) };
        }
    }
}
