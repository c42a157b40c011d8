#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The decoder should reject arbitrary bytes with an error, never panic.
    let _ = shade_binary::decode(data);
});
