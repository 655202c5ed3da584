//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::models::{Candle, History, PriceTable, Query};
use crate::provider::{DataProvider, ProviderError};
use crate::render::{ChartFrame, Notice, RenderError, Renderer};

/// History of one-minute rows with the given closes.
pub fn history(closes: &[f64]) -> History {
    let rows = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: Utc.timestamp_opt(1_700_000_000 + 60 * i as i64, 0).unwrap(),
            open: close - 0.25,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1_000,
        })
        .collect();
    History::new(PriceTable::new(rows), "Test Corp")
}

/// Hands out scripted results in order and counts calls.
#[derive(Clone)]
pub struct ScriptedProvider {
    script: Arc<Mutex<VecDeque<Result<History, ProviderError>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<History, ProviderError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
    async fn fetch(&self, _query: &Query) -> Result<History, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Api("script exhausted".to_string())))
    }
}

/// Remembers every frame and notice; optionally fails on the n-th render.
#[derive(Default)]
pub struct RecordingRenderer {
    pub frames: Vec<(String, PriceTable)>,
    pub notices: Vec<Notice>,
    pub fail_on_render: Option<usize>,
}

impl RecordingRenderer {
    pub fn failing_on(render: usize) -> Self {
        Self {
            fail_on_render: Some(render),
            ..Self::default()
        }
    }

    pub fn last_table(&self) -> Option<&PriceTable> {
        self.frames.last().map(|(_, table)| table)
    }

    pub fn has_notice(&self, needle: &str) -> bool {
        self.notices.iter().any(|n| n.message.contains(needle))
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, frame: &ChartFrame<'_>) -> Result<(), RenderError> {
        if self.fail_on_render == Some(self.frames.len() + 1) {
            return Err(RenderError::InvalidData("forced failure".to_string()));
        }
        self.frames.push((frame.title.clone(), frame.table.clone()));
        Ok(())
    }

    fn notice(&mut self, notice: Notice) -> Result<(), RenderError> {
        self.notices.push(notice);
        Ok(())
    }
}
