#![no_main]
use libfuzzer_sys::{fuzz_target, arbitrary::{Arbitrary, Unstructured}};
use memsim_rs::{AllocationPolicy, MemError, MemoryManager, ReplacementPolicy};

#[derive(Debug, Arbitrary)]
enum Op {
    Load { id: u8, len: u16 },
    Delete { id: u8 },
    DeleteAt { address: u16 },
    Overwrite { id: u8, len: u16 },
    Read { id: u8 },
    Defragment,
}

#[derive(Debug, Arbitrary)]
struct Session {
    worst_fit: bool,
    replacement: u8,
    ops: Vec<Op>,
}

fuzz_target!(|input: &[u8]| {
    let mut u = Unstructured::new(input);
    let session: Session = match u.arbitrary() {
        Ok(session) => session,
        Err(_) => return,
    };

    let allocation = if session.worst_fit {
        AllocationPolicy::WorstFit
    } else {
        AllocationPolicy::BestFit
    };
    let replacement = match session.replacement % 3 {
        0 => ReplacementPolicy::None,
        1 => ReplacementPolicy::Fifo,
        _ => ReplacementPolicy::Lru,
    };

    let mut memory = MemoryManager::builder()
        .allocation(allocation)
        .replacement(replacement)
        .build()
        .unwrap();

    for op in session.ops.iter().take(256) {
        let result = match op {
            Op::Load { id, len } => memory
                .load(&format!("f{}", id), vec![0xAA; *len as usize % 1500])
                .map(|_| ()),
            Op::Delete { id } => memory.delete(&format!("f{}", id)).map(|_| ()),
            Op::DeleteAt { address } => memory.delete_at(*address as u64).map(|_| ()),
            Op::Overwrite { id, len } => {
                memory.overwrite(&format!("f{}", id), vec![0x55; *len as usize % 300])
            }
            Op::Read { id } => memory.read(&format!("f{}", id)).map(|_| ()),
            Op::Defragment => memory.defragment().map(|_| ()),
        };

        if let Err(err) = result {
            assert!(!err.is_contract_violation(), "contract violation: {}", err);
            assert!(!matches!(err, MemError::Io(_)));
        }

        let blocks = memory.list();
        for pair in blocks.windows(2) {
            assert!(pair[0].end_address() <= pair[1].start_address);
        }
        if replacement != ReplacementPolicy::None {
            assert_eq!(memory.replacement_order().len(), blocks.len());
        }
    }
});
