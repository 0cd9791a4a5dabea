#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are fine; panics are not.
    if let Ok(mut cfg) = toml::from_str::<garage_config::Config>(data) {
        cfg.apply_env(|_| Some(data.to_string()));
        let _ = cfg.validate();
    }
});
