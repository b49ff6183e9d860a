#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use export_engine::{ExportEvent, ProgressSink};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 33-character hash suffix in the export system's shape.
pub const HASH: &str = " 0123456789abcdef0123456789abcdef";

#[derive(Default, Clone)]
pub struct TestSink {
    events: Arc<Mutex<Vec<ExportEvent>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<ExportEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: ExportEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub enum Entry<'a> {
    Dir(&'a str),
    File(&'a str, &'a [u8]),
}

/// Builds an uncompressed zip archive in memory.
pub fn build_zip(entries: &[Entry<'_>]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for entry in entries {
        match entry {
            Entry::Dir(name) => writer.add_directory(*name, options).unwrap(),
            Entry::File(name, body) => {
                writer.start_file(*name, options).unwrap();
                writer.write_all(body).unwrap();
            }
        }
    }
    writer.finish().unwrap().into_inner()
}
