//! 线程安全的无界 FIFO 队列
//!
//! 每个方向（发送/接收）一个实例。队列在元素出队前独占它们。
//! 两个队列各自持有独立的锁，任何操作都不会同时持有两把锁。

use armlink_protocol::Point;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// 消息队列
pub struct MessageQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
}

/// 位姿点队列
pub type PointQueue = MessageQueue<Point>;

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MessageQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// 入队（队尾）
    pub fn push(&self, item: T) {
        self.items.lock().push_back(item);
        self.available.notify_one();
    }

    /// 放回队首（发送失败的消息在重连后优先发送）
    pub fn push_front(&self, item: T) {
        self.items.lock().push_front(item);
        self.available.notify_one();
    }

    /// 按原顺序整体放回队首
    pub fn prepend(&self, batch: Vec<T>) {
        if batch.is_empty() {
            return;
        }
        let mut items = self.items.lock();
        for item in batch.into_iter().rev() {
            items.push_front(item);
        }
        drop(items);
        self.available.notify_all();
    }

    /// 非阻塞出队
    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// 阻塞出队，最多等待 `timeout`
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.items.lock();
        loop {
            if let Some(item) = items.pop_front() {
                return Some(item);
            }
            if self.available.wait_until(&mut items, deadline).timed_out() {
                return items.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }

    /// 取出全部元素
    pub fn drain(&self) -> Vec<T> {
        self.items.lock().drain(..).collect()
    }
}

impl<T: Clone> MessageQueue<T> {
    /// 查看队首元素（不出队）
    pub fn peek(&self) -> Option<T> {
        self.items.lock().front().cloned()
    }

    /// 复制当前全部元素
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }
}
