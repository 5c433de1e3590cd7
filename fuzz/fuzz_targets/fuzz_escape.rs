#![no_main]

use chatd_ext::core::{escape, Codec, Context, ExtSerialize, SerializeFormat};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must re-encode to the same bytes
    if let Some(fields) = escape::decode(data) {
        assert_eq!(escape::encode(&fields), data);
    }

    // Codecs must tolerate arbitrary text without panicking
    let ctx = Context::detached();
    for format in [SerializeFormat::Internal, SerializeFormat::Persist] {
        let _ = <Vec<u32> as ExtSerialize>::Codec::default().unserialize(format, data, &ctx);
        let _ = <std::collections::BTreeMap<String, (u32, String)> as ExtSerialize>::Codec::default()
            .unserialize(format, data, &ctx);
    }
});
