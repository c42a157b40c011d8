#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must also survive validation without panicking.
    if let Ok(module) = shade_binary::decode(data) {
        let _ = shade_validate::validate(&module, shade_validate::Capabilities::NONE);
    }
});
