#![no_main]
use libfuzzer_sys::fuzz_target;
use xtree::Config;

fuzz_target!(|data: &[u8]| {
    let _ = xtree::parse(data, Config::default());
    let _ = xtree::parse(
        data,
        Config::default()
            .with_trim_whitespace(false)
            .with_process_namespaces(true)
            .with_report_namespace_prefixes(true),
    );
});
