//! Fuzz target: wire envelope decoding
//!
//! Arbitrary bytes go through `Message::from_line`. Anything that decodes
//! must survive a re-encode unchanged.
//!
//! Run: cargo +nightly fuzz run fuzz_message_decode -- -max_len=8192

#![no_main]
use libfuzzer_sys::fuzz_target;
use shp_network::Message;

fuzz_target!(|data: &[u8]| {
    let Ok(message) = Message::from_line(data) else {
        return;
    };
    let line = message.to_line().expect("decoded message must encode");
    let again = Message::from_line(&line).expect("encoded message must decode");
    assert_eq!(message, again);
});
