// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation abstraction used by the interceptor and guards.

use std::sync::Mutex;

/// Current location plus the ability to move somewhere else.
pub trait Navigator: Send + Sync {
    fn current_url(&self) -> String;
    fn navigate(&self, url: &str);
}

/// In-memory navigation history.
#[derive(Debug)]
pub struct HistoryNavigator {
    history: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new(initial_url: impl Into<String>) -> Self {
        Self {
            history: Mutex::new(vec![initial_url.into()]),
        }
    }

    /// Every URL visited, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Navigator for HistoryNavigator {
    fn current_url(&self) -> String {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
            .unwrap_or_else(|| "/".to_string())
    }

    fn navigate(&self, url: &str) {
        tracing::debug!(url, "Navigating");
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
    }
}
