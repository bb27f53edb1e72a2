use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use category_actions_core::{Category, CategoryAction, CategoryActionFactory};

/// Request to build one category action, decoded from a single input line.
///
/// Wire shape: `{"op": "create", "category": {...}}`; `reset` takes no category.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", content = "category", rename_all = "snake_case")]
pub enum CategoryIntent {
    Create(Category),
    Update(Category),
    Delete(Category),
    Reset,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to decode intent: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to encode action: {0}")]
    Encode(serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Totals reported after the input stream is drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeSummary {
    pub dispatched: u64,
    pub rejected: u64,
}

/// Turns newline-delimited intents into newline-delimited actions.
#[derive(Debug, Clone)]
pub struct Bridge {
    factory: CategoryActionFactory,
}

impl Bridge {
    pub fn new(factory: CategoryActionFactory) -> Self {
        Self { factory }
    }

    pub fn dispatch(&self, intent: CategoryIntent) -> CategoryAction {
        let action = match intent {
            CategoryIntent::Create(category) => self.factory.create(category),
            CategoryIntent::Update(category) => self.factory.update(category),
            CategoryIntent::Delete(category) => self.factory.delete(category),
            CategoryIntent::Reset => self.factory.reset(),
        };
        counter!("category_actions_total", "type" => action.name()).increment(1);
        action
    }

    pub fn handle_line(&self, line: &str) -> Result<CategoryAction, BridgeError> {
        let intent: CategoryIntent = serde_json::from_str(line)?;
        Ok(self.dispatch(intent))
    }

    /// Processes `reader` until EOF. Lines that are not UTF-8 or do not decode
    /// into an intent are logged and skipped; only I/O and encoding failures
    /// abort the run. The writer is flushed on every exit path.
    pub async fn run<R, W>(&self, reader: R, writer: &mut W) -> Result<BridgeSummary, BridgeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut summary = BridgeSummary::default();
        let outcome = self.pump(reader, writer, &mut summary).await;
        writer.flush().await?;
        outcome.map(|()| summary)
    }

    async fn pump<R, W>(
        &self,
        mut reader: R,
        writer: &mut W,
        summary: &mut BridgeSummary,
    ) -> Result<(), BridgeError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buffer = Vec::new();
        let mut line_no = 0u64;

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer).await? == 0 {
                return Ok(());
            }
            line_no += 1;

            let line = match std::str::from_utf8(&buffer) {
                Ok(line) => line.trim(),
                Err(err) => {
                    reject(summary, line_no, &err);
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            let action = match self.handle_line(line) {
                Ok(action) => action,
                Err(err) => {
                    reject(summary, line_no, &err);
                    continue;
                }
            };

            let mut encoded = serde_json::to_vec(&action).map_err(BridgeError::Encode)?;
            encoded.push(b'\n');
            writer.write_all(&encoded).await?;
            debug!(stage = "bridge", line = line_no, action = action.name(), "action emitted");
            summary.dispatched += 1;
        }
    }
}

fn reject(summary: &mut BridgeSummary, line_no: u64, err: &dyn std::fmt::Display) {
    warn!(stage = "bridge", line = line_no, error = %err, "rejected intent");
    counter!("category_intents_rejected_total").increment(1);
    summary.rejected += 1;
}
