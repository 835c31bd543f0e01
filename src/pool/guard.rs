//! Scoped connection-identifier buffer
//!
//! Returns its slot to the pool when dropped.

use std::ops::{Deref, DerefMut};

use super::slot_pool::ConnectionIdPool;
use super::task::TaskHandle;
use crate::error::PoolError;

/// A pooled buffer released on drop
pub struct IdBuffer<'a> {
    pool: &'a ConnectionIdPool,
    task: Option<TaskHandle>,
}

impl IdBuffer<'_> {
    /// Borrow the underlying task handle
    pub fn task(&self) -> &TaskHandle {
        match &self.task {
            Some(task) => task,
            None => unreachable!("task is only taken on drop or detach"),
        }
    }

    /// Keep the slot outstanding and hand the raw task to the caller
    ///
    /// The caller becomes responsible for `ConnectionIdPool::release`.
    pub fn into_task(mut self) -> TaskHandle {
        match self.task.take() {
            Some(task) => task,
            None => unreachable!("task is only taken on drop or detach"),
        }
    }
}

impl ConnectionIdPool {
    /// Allocate a buffer that goes back to the pool when dropped
    pub fn checkout(&self, identifier: &[u8]) -> Result<IdBuffer<'_>, PoolError> {
        let task = self.allocate(identifier)?;
        Ok(IdBuffer {
            pool: self,
            task: Some(task),
        })
    }
}

impl Deref for IdBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.pool.buffer(self.task())
    }
}

impl DerefMut for IdBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        let pool = self.pool;
        match self.task.as_mut() {
            Some(task) => pool.buffer_mut(task),
            None => unreachable!("task is only taken on drop or detach"),
        }
    }
}

impl Drop for IdBuffer<'_> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.pool.release(task);
        }
    }
}

impl std::fmt::Debug for IdBuffer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdBuffer").field("task", &self.task).finish()
    }
}
