//! Background codec queue
//!
//! A single worker thread runs every compression and inflation, so no two
//! codec operations ever run concurrently; operations on different tiles
//! interleave in submission order. Completions are delivered over a channel
//! the owning thread drains, never as cross-thread callbacks.

use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, warn};

use crate::scale::ScaleKey;
use crate::unit::CompressionUnit;

enum TileTask {
    Compress {
        unit: Arc<CompressionUnit>,
        keep_raw: bool,
        jpeg_quality: u8,
    },
    Inflate {
        unit: Arc<CompressionUnit>,
        scale: ScaleKey,
        row: u32,
        col: u32,
    },
    Barrier(Sender<()>),
    Shutdown,
}

/// Completion of a background inflation, drained on the owning thread.
#[derive(Clone, Copy, Debug)]
pub struct InflateDone {
    pub scale: ScaleKey,
    pub row: u32,
    pub col: u32,
    pub ok: bool,
}

/// Handle to the sequential codec worker.
pub struct TaskQueue {
    task_tx: Sender<TileTask>,
    done_rx: Receiver<InflateDone>,
}

impl TaskQueue {
    /// Spawn the worker thread.
    #[must_use]
    pub fn new() -> Self {
        let (task_tx, task_rx) = flume::unbounded();
        let (done_tx, done_rx) = flume::unbounded();

        std::thread::spawn(move || codec_worker(&task_rx, &done_tx));

        Self { task_tx, done_rx }
    }

    /// Queue a compress; when `keep_raw` is false the raw buffer is released
    /// on the worker right after the encodings exist.
    pub fn schedule_compress(&self, unit: Arc<CompressionUnit>, keep_raw: bool, jpeg_quality: u8) {
        let _ = self.task_tx.send(TileTask::Compress {
            unit,
            keep_raw,
            jpeg_quality,
        });
    }

    /// Queue an inflation for the tile at (scale, row, col).
    pub fn schedule_inflate(&self, unit: Arc<CompressionUnit>, scale: ScaleKey, row: u32, col: u32) {
        let _ = self.task_tx.send(TileTask::Inflate {
            unit,
            scale,
            row,
            col,
        });
    }

    /// Drain finished inflations without blocking.
    pub fn poll_done(&self) -> Vec<InflateDone> {
        let mut done = Vec::new();
        while let Ok(completion) = self.done_rx.try_recv() {
            done.push(completion);
        }
        done
    }

    /// Block until every task queued so far has finished. Completions stay
    /// queued for `poll_done`. Test-oriented; the owning thread normally
    /// just polls.
    pub fn wait_idle(&self) {
        let (ack_tx, ack_rx) = flume::bounded(1);
        let _ = self.task_tx.send(TileTask::Barrier(ack_tx));
        let _ = ack_rx.recv();
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        let _ = self.task_tx.send(TileTask::Shutdown);
    }
}

fn codec_worker(tasks: &Receiver<TileTask>, done: &Sender<InflateDone>) {
    for task in tasks {
        match task {
            TileTask::Compress {
                unit,
                keep_raw,
                jpeg_quality,
            } => {
                if let Err(fault) = unit.compress(keep_raw, jpeg_quality) {
                    warn!("tile compression failed: {fault}");
                }
            }

            TileTask::Inflate {
                unit,
                scale,
                row,
                col,
            } => {
                let ok = match unit.inflate() {
                    Ok(()) => true,
                    Err(fault) => {
                        debug!("tile ({row},{col}) inflation failed: {fault}");
                        false
                    }
                };
                let _ = done.send(InflateDone {
                    scale,
                    row,
                    col,
                    ok,
                });
            }

            TileTask::Barrier(ack) => {
                let _ = ack.send(());
            }

            TileTask::Shutdown => break,
        }
    }
}
