#![cfg(feature = "runtime")]

use glkrt::prelude::*;
use glkrt::{HeadlessPeer, RawSignal};

#[test]
fn prelude_drives_a_short_session() {
    let peer = HeadlessPeer::new();
    let monitor = peer.monitor();
    let mut glk = Glk::new(peer);
    let status = run(&mut glk, |glk| {
        let main = glk.window_open(None, WinMethod::default(), 0, WinType::TextBuffer, 0)?;
        glk.set_window(Some(main))?;
        glk.put_string("What is your name? ")?;
        glk.request_line_event(main, CharBuffer::Unicode(vec![0; 20]), 0)?;
        monitor.sender().send(RawSignal::line_input(main, "Zoë"));
        let event = glk.select()?;
        assert_eq!(event.kind, EventType::LineInput);
        let name = event.line_text().unwrap_or_default();
        glk.put_string_uni(&format!("Hello, {name}."))
    });
    assert!(status.is_success());
    let printed: String = monitor
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            glkrt::backend::PeerCall::Print(_, text) => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(printed, "What is your name? Hello, Zoë.");
}
