#![no_main]
use libfuzzer_sys::fuzz_target;
use memsim_rs::{ManagerConfig, MemoryManager, UnisImage};

// Arbitrary text must parse or fail cleanly, and anything that restores
// must survive a save/parse cycle unchanged
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(image) = UnisImage::parse(text) else {
        return;
    };
    // Skip geometries that would allocate absurd page counts
    if image.total_size > 1 << 20 {
        return;
    }
    let Ok(memory) = MemoryManager::restore(ManagerConfig::default(), image) else {
        return;
    };

    let encoded = memory.to_unis().encode();
    let reparsed = UnisImage::parse(&encoded).expect("encoded image must parse");
    let restored = MemoryManager::restore(*memory.config(), reparsed).expect("must restore");
    assert_eq!(restored.list(), memory.list());
});
