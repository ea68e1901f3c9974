//! End-to-end stream scenarios across the registry, backends and filerefs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use glkrt_core::{CharBuffer, Dispatch, FileMode, FileType, FileUsage, GlkError, SeekMode};
use glkrt_stream::{FilerefRegistry, StreamRegistry, StreamResult};
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug, Clone)]
struct CapturedEvent {
    target: String,
    level: tracing::Level,
    fields: HashMap<String, String>,
}

#[derive(Clone, Default)]
struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            target: event.metadata().target().to_string(),
            level: *event.metadata().level(),
            fields: visitor.0.into_iter().collect(),
        });
    }
}

fn codes(text: &str) -> Vec<u32> {
    text.chars().map(u32::from).collect()
}

#[test]
fn read_write_memory_scenario() {
    let mut dispatch = Dispatch::new();
    let mut streams = StreamRegistry::new();
    let id = streams
        .open_memory(CharBuffer::Latin1(vec![0; 8]), FileMode::ReadWrite, 0, &mut dispatch)
        .unwrap();
    streams.write(id, &[0x10, 0x20, 0x30]).unwrap();
    streams.set_position(id, 0, SeekMode::Start).unwrap();
    let mut out = [0u8; 3];
    assert_eq!(streams.get_buffer(id, &mut out).unwrap(), 3);
    assert_eq!(out, [0x10, 0x20, 0x30]);
    let closed = streams.close(id, &mut dispatch).unwrap();
    assert_eq!(
        closed.result,
        StreamResult {
            read_count: 3,
            write_count: 3
        }
    );
}

#[test]
fn read_mode_memory_exposes_contents_then_ends() {
    let mut dispatch = Dispatch::new();
    let mut streams = StreamRegistry::new();
    let id = streams
        .open_memory(CharBuffer::Unicode(codes("héllo")), FileMode::Read, 0, &mut dispatch)
        .unwrap();
    assert_eq!(streams.get_position(id).unwrap(), 0);
    let mut narrow = [0u8; 16];
    assert_eq!(streams.get_buffer(id, &mut narrow).unwrap(), 5);
    assert_eq!(&narrow[..5], &[b'h', 0xE9, b'l', b'l', b'o']);
    assert_eq!(streams.get_char(id).unwrap(), None);
    assert_eq!(streams.get_buffer(id, &mut narrow).unwrap(), 0);
}

#[test]
fn unicode_file_written_then_read_through_fileref() {
    let dir = tempfile::tempdir().unwrap();
    let mut dispatch = Dispatch::new();
    let mut refs = FilerefRegistry::new();
    let mut streams = StreamRegistry::new();
    let usage = FileUsage::new(FileType::Data, true);
    let fref = refs
        .create_by_path(dir.path().join("notes.txt"), usage, 0, &mut dispatch)
        .unwrap();
    let path = refs.get("test", fref).unwrap().path().to_path_buf();

    let out = streams
        .open_file(&path, FileMode::Write, usage.text_mode, true, 0, &mut dispatch)
        .unwrap();
    streams.write(out, &codes("first\nsecond ☺\n")).unwrap();
    assert_eq!(streams.get_position(out).unwrap(), 15);
    streams.close(out, &mut dispatch).unwrap();
    assert!(refs.does_file_exist(fref).unwrap());

    let input = streams
        .open_file(&path, FileMode::Read, usage.text_mode, true, 0, &mut dispatch)
        .unwrap();
    let mut line = [0u32; 32];
    assert_eq!(streams.get_line(input, &mut line).unwrap(), 6);
    let mut narrow = [0u8; 32];
    let n = streams.get_line(input, &mut narrow).unwrap();
    assert_eq!(&narrow[..n], b"second ?\n");
    assert_eq!(narrow[n], 0);
    let closed = streams.close(input, &mut dispatch).unwrap();
    assert_eq!(closed.result.read_count, 15);
    assert!(closed.buffer.is_none());
}

#[test]
fn caller_errors_emit_strict_warnings() {
    let capture = EventCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    tracing::subscriber::with_default(subscriber, || {
        let mut dispatch = Dispatch::new();
        let mut streams = StreamRegistry::new();
        let id = streams
            .open_memory(CharBuffer::Latin1(vec![0; 4]), FileMode::Write, 0, &mut dispatch)
            .unwrap();
        streams.close(id, &mut dispatch).unwrap();
        let err = streams.close(id, &mut dispatch).unwrap_err();
        assert!(matches!(err, GlkError::InvalidStream { .. }));
    });
    let strict: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|event| event.target == "glkrt.strict")
        .collect();
    assert_eq!(strict.len(), 1);
    assert_eq!(strict[0].level, tracing::Level::WARN);
    assert_eq!(strict[0].fields.get("op").map(String::as_str), Some("stream_close"));
}
