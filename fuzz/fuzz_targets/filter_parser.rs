#![no_main]

use flowtrace::filter::TraceIdFilter;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Selection expressions must never panic, valid or not
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(filter) = TraceIdFilter::from_expr(input) {
            let _ = filter.should_process(0);
        }
    }
});
