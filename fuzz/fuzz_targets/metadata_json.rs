#![no_main]

use evalstat::metadata::{InMemoryMetadata, MetadataResolver};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing and resolving arbitrary metadata should not panic
        if let Ok(metadata) = InMemoryMetadata::from_json_str(input) {
            let _ = metadata.score_metadata("s");
        }
    }
});
