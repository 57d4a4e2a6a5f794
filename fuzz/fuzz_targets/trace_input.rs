#![no_main]

use flowtrace::config::ReconstructionConfig;
use flowtrace::input::parse_batches;
use flowtrace::reconstruction::TraceReconstructor;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any decodable input must reconstruct without panicking
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(batches) = parse_batches(input) {
            let reconstructor = TraceReconstructor::new(ReconstructionConfig::default());
            let _ = reconstructor.reconstruct_all(batches);
        }
    }
});
