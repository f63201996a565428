#![no_main]
use libfuzzer_sys::fuzz_target;
use uscn_core::Automaton;

fuzz_target!(|data: &[u8]| {
    if data.len() > uscn_core::buffer::MAX_BUFFER_SIZE {
        return;
    }

    let automaton = Automaton::new();
    // Must never panic regardless of input; rejection is the expected
    // outcome for almost all fuzzer-generated bytes.
    let _ = automaton.run(data);
});
