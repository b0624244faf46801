// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 可重置的定时器，用于 keep-alive 超时。
//!
//! 定时器本身是一个 tokio 任务；重置即中止旧任务再启动新任务。

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::task::JoinHandle;

pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

pub struct RestartableTimer {
    interval: Duration,
    callback: TimerCallback,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RestartableTimer {
    pub fn new(interval: Duration, callback: TimerCallback) -> Self {
        Self {
            interval,
            callback,
            handle: Mutex::new(None),
        }
    }

    fn handle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn(&self) -> JoinHandle<()> {
        let interval = self.interval;
        let callback = self.callback.clone();
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            callback();
        })
    }

    /// 已经在计时则什么也不做
    pub fn start(&self) {
        let mut handle = self.handle();
        if handle.is_none() {
            *handle = Some(self.spawn());
        }
    }

    /// 从头开始计时；尚未启动时同样不会启动
    pub fn reset(&self) {
        let mut handle = self.handle();
        if let Some(old) = handle.take() {
            old.abort();
            *handle = Some(self.spawn());
        }
    }

    pub fn cancel(&self) {
        if let Some(old) = self.handle().take() {
            old.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle().as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for RestartableTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
