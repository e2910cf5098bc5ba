use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use serde::Serialize;

use crate::Result;

/// What the trainer records after every epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochStats {
    pub epoch: usize,
    /// The mean distance between predictions and labels after the epoch.
    pub cost: f32,
    /// The mean loss of the epoch's batches, measured before each update.
    pub loss: f32,
    /// Seconds since training started.
    pub elapsed_secs: f64,
}

#[derive(Debug, Serialize)]
struct Split<T> {
    split_time: f64,
    data: T,
}

#[derive(Serialize)]
struct Dump<'a, T> {
    start_time: u64,
    end_time: u64,
    data: &'a [Split<T>],
}

/// Collects timestamped records of a run and dumps them as json.
///
/// Every record is stored with the seconds elapsed since the previous one (or since the
/// tracker was created, for the first one).
#[derive(Debug)]
pub struct StatTracker<T: Serialize> {
    start_time: u64,
    last_split: Instant,
    data: Vec<Split<T>>,
}

impl<T: Serialize> Default for StatTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize> StatTracker<T> {
    pub fn new() -> Self {
        Self {
            start_time: unix_secs(),
            last_split: Instant::now(),
            data: Vec::new(),
        }
    }

    /// Records `datum` along with the time split since the last record.
    pub fn log(&mut self, datum: T) {
        let now = Instant::now();
        let split_time = now.duration_since(self.last_split).as_secs_f64();
        self.last_split = now;

        self.data.push(Split {
            split_time,
            data: datum,
        });
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The recorded data, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.data.iter().map(|split| &split.data)
    }

    /// Writes `{ start_time, end_time, data: [{ split_time, data }] }` to `writer`, times in
    /// seconds since the unix epoch.
    pub fn dump<W: Write>(&self, writer: W) -> Result<()> {
        let dump = Dump {
            start_time: self.start_time,
            end_time: unix_secs(),
            data: &self.data,
        };

        serde_json::to_writer_pretty(writer, &dump)?;
        Ok(())
    }

    /// Same as `dump` but creates (or truncates) the file at `path`.
    pub fn dump_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.dump(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
