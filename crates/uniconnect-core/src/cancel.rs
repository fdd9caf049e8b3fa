/*
Copyright 2024, Zep Software, Inc.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Cooperative cancellation for a recomputation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::{ConnectError, ConnectResult};

/// Shared flag plus an optional deadline. Long loops call [`check`]
/// between units of work.
///
/// [`check`]: CancellationToken::check
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<(Instant, Duration)>,
}

impl CancellationToken {
    /// Token that only trips when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Token that also trips once `limit` has elapsed from now.
    pub fn with_deadline(limit: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some((Instant::now() + limit, limit)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return true;
        }
        matches!(self.deadline, Some((deadline, _)) if Instant::now() >= deadline)
    }

    pub fn limit(&self) -> Duration {
        self.deadline.map(|(_, limit)| limit).unwrap_or(Duration::ZERO)
    }

    pub fn check(&self) -> ConnectResult<()> {
        if self.is_cancelled() {
            return Err(ConnectError::Timeout { limit: self.limit() });
        }
        Ok(())
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
