#![no_main]
use libfuzzer_sys::fuzz_target;
use uscn_core::buffer::Buffer;
use uscn_core::schema::{FieldDescriptor, FieldType, Schema};
use uscn_membrane::{Validator, ValidatorConfig};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > uscn_core::buffer::MAX_BUFFER_SIZE {
        return;
    }

    let schema = Schema::new(vec![
        FieldDescriptor::new("id", FieldType::Uint64, true, None, None).unwrap(),
        FieldDescriptor::new("payload", FieldType::String, false, Some(256), None).unwrap(),
    ])
    .unwrap();
    let validator = Validator::new(schema, ValidatorConfig::default()).unwrap();

    let Ok(mut buffer) = Buffer::from_bytes(data.to_vec()) else {
        return;
    };
    // Must never panic regardless of input; the outcome is almost always a
    // typed rejection (spec §7's closed taxonomy), never an unwind.
    let _ = validator.validate(&mut buffer);
});
