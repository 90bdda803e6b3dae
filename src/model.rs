//! Reference Semantics of the Generated Atomic Cells
//!
//! Executable model of what the emitted header does at its call sites, one
//! code path per backend, so the behavioural guarantees can be tested
//! without a C toolchain.
//!
//! ## Backends
//!
//! - Native / Standard: a `std::sync::atomic` integer of the operand's
//!   internal width, every access `SeqCst`. Both facilities expose the same
//!   operations with the same orderings, so they share one representation.
//! - Legacy: a `Mutex` owned by the cell around a plain unsigned slot of the
//!   internal width. Operands are staged into the slot type by copying their
//!   bytes, then handed to a per-width helper that runs under the lock.
//!
//! ## Debug marker
//!
//! With instrumentation enabled the cell tracks
//! `Uninitialized -> Live -> Dead` and panics when an operation runs outside
//! the `[init, destroy)` window. Without it, misuse is not detected.
//!
//! ## Limitations
//! - Only integer operands of 1, 2, 4 or 8 bytes
//! - No threading-analysis mode; the lock exists only on the legacy backend

use crate::catalog::{Backend, OpKind};
use crate::registry::InternalWidth;
use num_traits::{PrimInt, WrappingAdd};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{self, AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, PoisonError};

const SEQ_CST: Ordering = Ordering::SeqCst;

/// An operand type the model can hold.
pub trait Scalar: PrimInt + WrappingAdd + fmt::Debug + Send + Sync + 'static {
    /// `sizeof` of the operand.
    const SIZE: usize;

    fn write_bytes(self, buf: &mut [u8]);

    fn read_bytes(buf: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn write_bytes(self, buf: &mut [u8]) {
                    buf.copy_from_slice(&self.to_ne_bytes());
                }

                #[inline]
                fn read_bytes(buf: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(buf);
                    <$ty>::from_ne_bytes(raw)
                }
            }
        )*
    };
}

impl_scalar!(i8, u8, i16, u16, i32, u32, i64, u64, isize, usize);

/// Representation-preserving copy between two types of the same size.
#[inline]
fn restage<Src: Scalar, Dst: Scalar>(value: Src) -> Dst {
    debug_assert_eq!(Src::SIZE, Dst::SIZE);
    let mut buf = [0u8; 8];
    value.write_bytes(&mut buf[..Src::SIZE]);
    Dst::read_bytes(&buf[..Dst::SIZE])
}

/// Per-width helpers of the legacy backend. The caller holds the cell lock.
mod helpers {
    use num_traits::{PrimInt, WrappingAdd};

    pub fn and_assign<S: PrimInt>(slot: &mut S, value: S) {
        *slot = *slot & value;
    }

    pub fn compare_and_swap<S: PrimInt>(slot: &mut S, expected: &mut S, desired: S) -> bool {
        if *slot == *expected {
            *slot = desired;
            true
        } else {
            *expected = *slot;
            false
        }
    }

    pub fn fetch_and_add<S: PrimInt + WrappingAdd>(slot: &mut S, value: S) -> S {
        let old = *slot;
        *slot = old.wrapping_add(&value);
        old
    }

    pub fn load<S: PrimInt>(slot: &S) -> S {
        *slot
    }

    pub fn or_assign<S: PrimInt>(slot: &mut S, value: S) {
        *slot = *slot | value;
    }

    pub fn store<S: PrimInt>(slot: &mut S, value: S) {
        *slot = value;
    }

    pub fn swap<S: PrimInt>(slot: &mut S, value: S) -> S {
        std::mem::replace(slot, value)
    }

    pub fn xor_assign<S: PrimInt>(slot: &mut S, value: S) {
        *slot = *slot ^ value;
    }
}

#[derive(Debug)]
enum AtomicSlot {
    W1(AtomicU8),
    W2(AtomicU16),
    W4(AtomicU32),
    W8(AtomicU64),
}

#[derive(Debug)]
enum PlainSlot {
    W1(u8),
    W2(u16),
    W4(u32),
    W8(u64),
}

#[derive(Debug)]
enum Storage {
    Lockfree(AtomicSlot),
    Locked(Mutex<PlainSlot>),
}

/// Runs `$body` with `$bind` bound to the width-specific payload.
macro_rules! by_width {
    ($value:expr, $kind:ident, $bind:ident => $body:expr) => {
        match $value {
            $kind::W1($bind) => $body,
            $kind::W2($bind) => $body,
            $kind::W4($bind) => $body,
            $kind::W8($bind) => $body,
        }
    };
}

/// Lifecycle state recorded by the debug marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Marker {
    Uninitialized = 0,
    Live = 1,
    Dead = 2,
}

impl Marker {
    fn from_u8(raw: u8) -> Marker {
        match raw {
            1 => Marker::Live,
            2 => Marker::Dead,
            _ => Marker::Uninitialized,
        }
    }
}

/// Model of one generated `embb_atomic_<type>` cell.
pub struct AtomicCell<T: Scalar> {
    backend: Backend,
    storage: Storage,
    debug: bool,
    marker: AtomicU8,
    _operand: PhantomData<T>,
}

impl<T: Scalar> fmt::Debug for AtomicCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicCell")
            .field("backend", &self.backend)
            .field("width", &Self::width().bytes)
            .field("marker", &self.marker())
            .finish()
    }
}

impl<T: Scalar> AtomicCell<T> {
    /// Declares a cell; it must be initialized with [`init`](Self::init) before use.
    pub fn new(backend: Backend) -> Self {
        Self::declare(backend, false)
    }

    /// Declares a cell with the debug marker checks enabled.
    pub fn with_debug(backend: Backend) -> Self {
        Self::declare(backend, true)
    }

    fn declare(backend: Backend, debug: bool) -> Self {
        let storage = match (backend, Self::width().bytes) {
            (Backend::Legacy, 1) => Storage::Locked(Mutex::new(PlainSlot::W1(0))),
            (Backend::Legacy, 2) => Storage::Locked(Mutex::new(PlainSlot::W2(0))),
            (Backend::Legacy, 4) => Storage::Locked(Mutex::new(PlainSlot::W4(0))),
            (Backend::Legacy, _) => Storage::Locked(Mutex::new(PlainSlot::W8(0))),
            (_, 1) => Storage::Lockfree(AtomicSlot::W1(AtomicU8::new(0))),
            (_, 2) => Storage::Lockfree(AtomicSlot::W2(AtomicU16::new(0))),
            (_, 4) => Storage::Lockfree(AtomicSlot::W4(AtomicU32::new(0))),
            (_, _) => Storage::Lockfree(AtomicSlot::W8(AtomicU64::new(0))),
        };
        Self {
            backend,
            storage,
            debug,
            marker: AtomicU8::new(Marker::Uninitialized as u8),
            _operand: PhantomData,
        }
    }

    /// The internal width backing `T`.
    pub fn width() -> &'static InternalWidth {
        match InternalWidth::for_size(T::SIZE) {
            Some(width) => width,
            None => unreachable!("Scalar is only implemented for 1, 2, 4 and 8 byte integers"),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn marker(&self) -> Marker {
        Marker::from_u8(self.marker.load(SEQ_CST))
    }

    fn check_live(&self, op: OpKind) {
        if self.debug {
            let marker = self.marker();
            assert!(
                marker == Marker::Live,
                "{} on an atomic cell that is {:?}",
                op,
                marker
            );
        }
    }

    fn with_lock<R>(&self, slot: &Mutex<PlainSlot>, f: impl FnOnce(&mut PlainSlot) -> R) -> R {
        // A panic under the lock leaves the slot in a consistent state.
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn init(&self, value: T) {
        self.marker.store(Marker::Live as u8, SEQ_CST);
        match &self.storage {
            Storage::Lockfree(slot) => by_width!(slot, AtomicSlot, a => a.store(restage(value), SEQ_CST)),
            Storage::Locked(slot) => self.with_lock(slot, |plain| {
                by_width!(plain, PlainSlot, s => helpers::store(s, restage(value)))
            }),
        }
    }

    pub fn load(&self) -> T {
        self.check_live(OpKind::Load);
        match &self.storage {
            Storage::Lockfree(slot) => by_width!(slot, AtomicSlot, a => restage(a.load(SEQ_CST))),
            Storage::Locked(slot) => self.with_lock(slot, |plain| {
                by_width!(plain, PlainSlot, s => restage(helpers::load(s)))
            }),
        }
    }

    pub fn store(&self, value: T) {
        self.check_live(OpKind::Store);
        match &self.storage {
            Storage::Lockfree(slot) => by_width!(slot, AtomicSlot, a => a.store(restage(value), SEQ_CST)),
            Storage::Locked(slot) => self.with_lock(slot, |plain| {
                by_width!(plain, PlainSlot, s => helpers::store(s, restage(value)))
            }),
        }
    }

    /// Replaces the value and returns the previous one.
    pub fn swap(&self, value: T) -> T {
        self.check_live(OpKind::Swap);
        match &self.storage {
            Storage::Lockfree(slot) => {
                by_width!(slot, AtomicSlot, a => restage(a.swap(restage(value), SEQ_CST)))
            }
            Storage::Locked(slot) => self.with_lock(slot, |plain| {
                by_width!(plain, PlainSlot, s => restage(helpers::swap(s, restage(value))))
            }),
        }
    }

    /// Single strong attempt. On mismatch `expected` receives the current value.
    pub fn compare_and_swap(&self, expected: &mut T, desired: T) -> bool {
        self.check_live(OpKind::CompareAndSwap);
        match &self.storage {
            Storage::Lockfree(slot) => by_width!(slot, AtomicSlot, a => {
                match a.compare_exchange(restage(*expected), restage(desired), SEQ_CST, SEQ_CST) {
                    Ok(_) => true,
                    Err(current) => {
                        *expected = restage(current);
                        false
                    }
                }
            }),
            Storage::Locked(slot) => self.with_lock(slot, |plain| {
                by_width!(plain, PlainSlot, s => {
                    let mut expected_basic = restage(*expected);
                    let swapped = helpers::compare_and_swap(s, &mut expected_basic, restage(desired));
                    *expected = restage(expected_basic);
                    swapped
                })
            }),
        }
    }

    /// Adds with wraparound and returns the previous value.
    pub fn fetch_and_add(&self, value: T) -> T {
        self.check_live(OpKind::FetchAndAdd);
        match &self.storage {
            Storage::Lockfree(slot) => {
                by_width!(slot, AtomicSlot, a => restage(a.fetch_add(restage(value), SEQ_CST)))
            }
            Storage::Locked(slot) => self.with_lock(slot, |plain| {
                by_width!(plain, PlainSlot, s => restage(helpers::fetch_and_add(s, restage(value))))
            }),
        }
    }

    pub fn and_assign(&self, value: T) {
        self.check_live(OpKind::AndAssign);
        match &self.storage {
            Storage::Lockfree(slot) => by_width!(slot, AtomicSlot, a => {
                a.fetch_and(restage(value), SEQ_CST);
            }),
            Storage::Locked(slot) => self.with_lock(slot, |plain| {
                by_width!(plain, PlainSlot, s => helpers::and_assign(s, restage(value)))
            }),
        }
    }

    pub fn or_assign(&self, value: T) {
        self.check_live(OpKind::OrAssign);
        match &self.storage {
            Storage::Lockfree(slot) => by_width!(slot, AtomicSlot, a => {
                a.fetch_or(restage(value), SEQ_CST);
            }),
            Storage::Locked(slot) => self.with_lock(slot, |plain| {
                by_width!(plain, PlainSlot, s => helpers::or_assign(s, restage(value)))
            }),
        }
    }

    pub fn xor_assign(&self, value: T) {
        self.check_live(OpKind::XorAssign);
        match &self.storage {
            Storage::Lockfree(slot) => by_width!(slot, AtomicSlot, a => {
                a.fetch_xor(restage(value), SEQ_CST);
            }),
            Storage::Locked(slot) => self.with_lock(slot, |plain| {
                by_width!(plain, PlainSlot, s => helpers::xor_assign(s, restage(value)))
            }),
        }
    }

    /// Ends the cell's lifetime; further operations are misuse.
    pub fn destroy(&self) {
        self.check_live(OpKind::Destroy);
        self.marker.store(Marker::Dead as u8, SEQ_CST);
    }

    /// Applies one scripted step.
    pub fn apply(&self, step: Step<T>) -> Outcome<T> {
        match step {
            Step::Store(value) => {
                self.store(value);
                Outcome::Done
            }
            Step::Load => Outcome::Value(self.load()),
            Step::Swap(value) => Outcome::Value(self.swap(value)),
            Step::CompareAndSwap { expected, desired } => {
                let mut expected = expected;
                let success = self.compare_and_swap(&mut expected, desired);
                Outcome::Exchanged { success, expected }
            }
            Step::FetchAndAdd(value) => Outcome::Value(self.fetch_and_add(value)),
            Step::AndAssign(value) => {
                self.and_assign(value);
                Outcome::Done
            }
            Step::OrAssign(value) => {
                self.or_assign(value);
                Outcome::Done
            }
            Step::XorAssign(value) => {
                self.xor_assign(value);
                Outcome::Done
            }
        }
    }
}

/// Full sequentially-consistent fence.
pub fn memory_barrier() {
    atomic::fence(SEQ_CST);
}

/// One operation of a scripted sequence, between `init` and `destroy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T> {
    Store(T),
    Load,
    Swap(T),
    CompareAndSwap { expected: T, desired: T },
    FetchAndAdd(T),
    AndAssign(T),
    OrAssign(T),
    XorAssign(T),
}

impl<T> Step<T> {
    pub fn kind(&self) -> OpKind {
        match self {
            Step::Store(_) => OpKind::Store,
            Step::Load => OpKind::Load,
            Step::Swap(_) => OpKind::Swap,
            Step::CompareAndSwap { .. } => OpKind::CompareAndSwap,
            Step::FetchAndAdd(_) => OpKind::FetchAndAdd,
            Step::AndAssign(_) => OpKind::AndAssign,
            Step::OrAssign(_) => OpKind::OrAssign,
            Step::XorAssign(_) => OpKind::XorAssign,
        }
    }
}

/// Observable result of a [`Step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    Done,
    Value(T),
    Exchanged { success: bool, expected: T },
}

/// Runs `steps` on a fresh cell and returns every outcome plus the final value.
pub fn run_script<T: Scalar>(backend: Backend, initial: T, steps: &[Step<T>]) -> (Vec<Outcome<T>>, T) {
    let cell = AtomicCell::with_debug(backend);
    cell.init(initial);
    let outcomes = steps.iter().map(|step| cell.apply(*step)).collect();
    let last = cell.load();
    cell.destroy();
    (outcomes, last)
}
