//! Recycling of the per-render scratch structures: ending stacks,
//! ending frames and response buffers.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

use chj_util::nowarn;
use lazy_static::lazy_static;

use crate::config::PoolConfig;
use crate::response::Response;

/// A deferred action registered by a wrapper-start callback, run
/// when the wrapper's `}}` is reached.
pub type Ending = Box<dyn FnOnce(&mut Response) + Send>;

/// The endings registered by one wrapper start.
pub type Frame = Vec<Ending>;

/// Things that can be reset and handed out again.
pub trait Recycle {
    /// Reset `self` for reuse; return false to have it dropped
    /// instead.
    fn recycle(&mut self, config: &PoolConfig) -> bool;
}

pub struct Pool<T> {
    config: PoolConfig,
    items: Mutex<Vec<T>>,
}

impl<T: Recycle + Default> Pool<T> {
    pub fn new(config: PoolConfig) -> Self {
        Pool { config, items: Mutex::new(Vec::new()) }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Take an item from the pool, or a fresh one if it is empty.
    pub fn get(&self) -> PoolGuard<'_, T> {
        let item = {
            let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
            items.pop()
        };
        PoolGuard { pool: self, item: item.unwrap_or_default() }
    }

    /// Number of items currently waiting in the pool.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put(&self, mut item: T) {
        // Recycling (dropping captured closures) happens outside the lock
        if !item.recycle(&self.config) {
            return
        }
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if items.len() < self.config.max_pooled {
            items.push(item);
        } else {
            nowarn!("pool full, dropping item");
        }
    }
}

/// Hands its item back to the pool when dropped.
pub struct PoolGuard<'p, T: Recycle + Default> {
    pool: &'p Pool<T>,
    item: T,
}

impl<'p, T: Recycle + Default> Deref for PoolGuard<'p, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.item
    }
}

impl<'p, T: Recycle + Default> DerefMut for PoolGuard<'p, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<'p, T: Recycle + Default> Drop for PoolGuard<'p, T> {
    fn drop(&mut self) {
        let item = std::mem::take(&mut self.item);
        self.pool.put(item);
    }
}

impl Recycle for Frame {
    fn recycle(&mut self, config: &PoolConfig) -> bool {
        self.clear();
        self.shrink_to(config.max_frame_capacity);
        true
    }
}

/// One frame per open wrapper of a render.
#[derive(Default)]
pub struct EndingStack {
    pub(crate) frames: Vec<Frame>,
}

impl EndingStack {
    /// Make room for `depth` nested wrappers.
    pub fn reserve_depth(&mut self, depth: usize) {
        while self.frames.len() < depth {
            self.frames.push(Frame::new());
        }
    }

    /// The number of nested wrappers there is room for.
    pub fn depth_capacity(&self) -> usize {
        self.frames.len()
    }

    /// Whether no endings are held.
    pub fn is_clear(&self) -> bool {
        self.frames.iter().all(|f| f.is_empty())
    }
}

impl Recycle for EndingStack {
    fn recycle(&mut self, config: &PoolConfig) -> bool {
        self.frames.truncate(config.max_stack_frames);
        for frame in &mut self.frames {
            frame.recycle(config);
        }
        true
    }
}

pub struct Pools {
    pub stacks: Pool<EndingStack>,
    pub frames: Pool<Frame>,
    pub responses: Pool<Response>,
}

impl Pools {
    pub fn new(config: PoolConfig) -> Self {
        Pools {
            stacks: Pool::new(config.clone()),
            frames: Pool::new(config.clone()),
            responses: Pool::new(config),
        }
    }

    /// An ending stack with room for `expected_depth` nested
    /// wrappers.
    pub fn acquire_stack(&self, expected_depth: usize) -> PoolGuard<'_, EndingStack> {
        let mut stack = self.stacks.get();
        stack.reserve_depth(expected_depth);
        stack
    }

    pub fn frame(&self) -> PoolGuard<'_, Frame> {
        self.frames.get()
    }

    pub fn response(&self) -> PoolGuard<'_, Response> {
        self.responses.get()
    }
}

lazy_static! {
    /// The pools used by all renders in the process.
    pub static ref POOLS: Pools = Pools::new(PoolConfig::from_env_or_default());
}
