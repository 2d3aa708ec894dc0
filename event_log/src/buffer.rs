//! 有损的事件环形缓冲。
//!
//! 固定容量，满了就丢最老的一条并计数。丢弃不是错误，
//! dropped 计数就是信号。容量 0 表示整个缓冲关闭。

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::event::mysql_event::BufferedEvent;

pub struct EventCircularBuffer {
    inner: Mutex<BufferInner>,
}

struct BufferInner {
    events: VecDeque<Box<BufferedEvent>>,
    capacity: usize,
    added: u64,
    dropped: u64,
}

impl EventCircularBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BufferInner {
                events: VecDeque::with_capacity(capacity),
                capacity,
                added: 0,
                dropped: 0,
            }),
        }
    }

    /// 入队。满时丢最老的一条；容量 0 时直接丢当前这条。
    pub fn insert(&self, event: Box<BufferedEvent>) {
        let mut inner = self.inner.lock().unwrap();
        inner.added += 1;
        if inner.capacity == 0 {
            inner.dropped += 1;
            return;
        }
        if inner.events.len() == inner.capacity {
            inner.events.pop_front();
            inner.dropped += 1;
        }
        inner.events.push_back(event);
    }

    /// 取走全部事件，保持插入顺序，缓冲清空
    pub fn drain(&self) -> Vec<Box<BufferedEvent>> {
        let mut inner = self.inner.lock().unwrap();
        std::mem::take(&mut inner.events).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }

    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.capacity = capacity;
        while inner.events.len() > capacity {
            inner.events.pop_front();
            inner.dropped += 1;
        }
    }

    pub fn added_count(&self) -> u64 {
        self.inner.lock().unwrap().added
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.lock().unwrap().dropped
    }
}
