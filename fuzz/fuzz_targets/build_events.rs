#![no_main]
use libfuzzer_sys::fuzz_target;
use xtree::{Config, Event, EventStream};

// Arbitrary event orders must never panic the builder, balanced or not.
fuzz_target!(|data: &[u8]| {
    let events: Vec<Event> = data
        .chunks(2)
        .map(|chunk| {
            let arg = chunk.get(1).copied().unwrap_or_default();
            match chunk[0] % 4 {
                0 => Event::start(format!("e{}", arg % 8)),
                1 => Event::end(format!("e{}", arg % 8)),
                2 => Event::text(char::from(arg).to_string()),
                _ => Event::cdata(vec![arg]),
            }
        })
        .collect();
    let mut stream = EventStream::new(events);
    let _ = xtree::parse_with(&mut stream, Config::default());
});
