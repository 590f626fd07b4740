//! Fuzz target for the MySQL request and response decoders.
//!
//! Each input is decoded as a request and as a response under every
//! previous-request context the session can be in, with a registered
//! prepared statement so execute and binary-row paths are reached.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mysqltrace_core::mysql::decoding::{RequestDecoder, ResponseDecoder, StaticView};
use mysqltrace_core::mysql::structure::{CommandCode, RequestKind};

const CONTEXTS: [RequestKind; 6] = [
    RequestKind::Login,
    RequestKind::Query,
    RequestKind::Prepare,
    RequestKind::Execute,
    RequestKind::Quit,
    RequestKind::Command(CommandCode::FieldList),
];

fuzz_target!(|data: &[u8]| {
    let requests = RequestDecoder::new();
    let _ = requests.decode(data, &StaticView::default().with_statement(1, 3));

    let mut greeting_view = StaticView::default();
    greeting_view.just_saw_greeting = true;
    let _ = requests.decode(data, &greeting_view);

    let mut auth_view = StaticView::after(RequestKind::Login);
    auth_view.auth_in_progress = true;
    let _ = requests.decode(data, &auth_view);

    for kind in CONTEXTS {
        let view = StaticView::after(kind).with_statement(1, 3);
        let _ = requests.decode(data, &view);

        // Feed the input twice so multi-packet responses see a continuation
        let mut responses = ResponseDecoder::new();
        let _ = responses.decode(data, &view);
        let _ = responses.decode(data, &view);
        let _ = responses.interrupt();
        let _ = responses.decode(data, &view);
        let _ = responses.flush();
    }
});
