//! Bus trace recorder
//!
//! A [`TraceTap`] is installed as (part of) a node's frame sink and forwards
//! each delivery over a crossbeam channel. A [`TraceWriter`] drains the
//! channel into `frames.csv` and `frames.jsonl`.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use s32sim_shared::{CanFrame, CanNode, FrameSink};

use crate::simulator::event_queue::SimClock;

pub const CSV_FILE: &str = "frames.csv";
pub const JSONL_FILE: &str = "frames.jsonl";

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One frame landing in one node's queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusEvent {
    pub seq: u64,
    pub time_us: u64,
    /// Receiving node
    pub node: u8,
    pub id: u32,
    pub dlc: u8,
    /// Payload as space separated hex bytes
    pub data: String,
}

impl BusEvent {
    pub fn new(seq: u64, time_us: u64, node: &CanNode, frame: &CanFrame) -> Self {
        let mut data = String::with_capacity(frame.payload().len() * 3);
        for (i, byte) in frame.payload().iter().enumerate() {
            if i > 0 {
                data.push(' ');
            }
            let _ = write!(data, "{:02X}", byte);
        }
        Self {
            seq,
            time_us,
            node: node.id().0,
            id: frame.id(),
            dlc: frame.dlc(),
            data,
        }
    }
}

/// Frame sink forwarding deliveries to the recorder.
pub struct TraceTap {
    tx: Sender<BusEvent>,
    clock: SimClock,
    seq: AtomicU64,
}

impl TraceTap {
    pub fn new(tx: Sender<BusEvent>, clock: SimClock) -> Self {
        Self {
            tx,
            clock,
            seq: AtomicU64::new(0),
        }
    }

    /// Tap plus the receiving end of its channel.
    pub fn channel(clock: SimClock) -> (Self, Receiver<BusEvent>) {
        let (tx, rx) = unbounded();
        (Self::new(tx, clock), rx)
    }
}

impl FrameSink for TraceTap {
    fn deliver(&self, node: &CanNode, frame: &CanFrame) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let time_us = u64::try_from(self.clock.now().as_micros()).unwrap_or(u64::MAX);
        // The recorder may already be gone at shutdown.
        if self.tx.send(BusEvent::new(seq, time_us, node, frame)).is_err() {
            tracing::trace!("trace receiver dropped; event discarded");
        }
    }
}

/// Writes bus events as CSV and JSON lines.
pub struct TraceWriter {
    csv: csv::Writer<File>,
    jsonl: BufWriter<File>,
    dir: PathBuf,
    written: usize,
}

impl TraceWriter {
    /// Create `dir` if needed and open both trace files, truncating old ones.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, TraceError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let csv = csv::Writer::from_path(dir.join(CSV_FILE))?;
        let jsonl = BufWriter::new(File::create(dir.join(JSONL_FILE))?);
        tracing::info!("Writing bus trace to {}", dir.display());
        Ok(Self {
            csv,
            jsonl,
            dir,
            written: 0,
        })
    }

    pub fn write(&mut self, event: &BusEvent) -> Result<(), TraceError> {
        self.csv.serialize(event)?;
        serde_json::to_writer(&mut self.jsonl, event)?;
        self.jsonl.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Write every event currently queued on `rx` without blocking.
    pub fn drain(&mut self, rx: &Receiver<BusEvent>) -> Result<usize, TraceError> {
        let mut count = 0;
        for event in rx.try_iter() {
            self.write(&event)?;
            count += 1;
        }
        Ok(count)
    }

    /// Flush both files and return how many events were written in total.
    pub fn finish(mut self) -> Result<usize, TraceError> {
        self.csv.flush()?;
        self.jsonl.flush()?;
        tracing::info!(events = self.written, "Bus trace written to {}", self.dir.display());
        Ok(self.written)
    }

    pub fn written(&self) -> usize {
        self.written
    }
}
