//! Benchmarks for building the resolver (merge + index)
//!
//! Run with: cargo bench --bench index

use std::sync::Arc;

use keychord::keymap::{
    combine, parse_when, KeyCode, KeybindingIndex, KeybindingResolver, KeymapLayers, Keystroke,
    Modifiers, ResolvedKeybinding,
};

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

fn main() {
    divan::main();
}

const MODS: [Modifiers; 4] = [
    Modifiers::CTRL,
    Modifiers::ALT,
    Modifiers::META,
    Modifiers::SHIFT,
];

/// `count` rules over a few dozen first keys, a quarter of them chords and
/// most of them guarded
fn synthetic_rules(count: usize) -> Vec<Arc<ResolvedKeybinding>> {
    (0..count)
        .map(|i| {
            let letter = (b'a' + (i % 26) as u8) as char;
            let first = Keystroke::new(KeyCode::Char(letter), MODS[(i / 26) % MODS.len()]);
            let mut rule = if i % 4 == 0 {
                let second = Keystroke::new(KeyCode::Char(letter), Modifiers::NONE);
                ResolvedKeybinding::bind(&[first, second], &format!("cmd.{}", i))
            } else {
                ResolvedKeybinding::bind(&[first], &format!("cmd.{}", i))
            };
            if i % 3 != 0 {
                let guard = format!("ctx{} && !ctx{}", i % 7, (i + 1) % 7);
                if let Ok(when) = parse_when(&guard) {
                    rule = rule.with_when(when);
                }
            }
            Arc::new(rule)
        })
        .collect()
}

// ============================================================================
// Index build
// ============================================================================

#[divan::bench(args = [100, 1_000, 10_000])]
fn build_index(bencher: divan::Bencher, count: usize) {
    let rules = synthetic_rules(count);
    bencher.bench(|| divan::black_box(KeybindingIndex::build(&rules)));
}

#[divan::bench(args = [100, 1_000, 10_000])]
fn combine_with_removals(bencher: divan::Bencher, count: usize) {
    let defaults = synthetic_rules(count);
    let overrides: Vec<_> = (0..count / 10)
        .map(|i| Arc::new(ResolvedKeybinding::unbound(&format!("-cmd.{}", i * 10))))
        .collect();

    bencher.bench(|| divan::black_box(combine(&defaults, &overrides)));
}

#[divan::bench(args = [100, 1_000, 10_000])]
fn build_resolver(bencher: divan::Bencher, count: usize) {
    let defaults = synthetic_rules(count);
    bencher.bench(|| {
        divan::black_box(KeybindingResolver::from_shared(defaults.clone(), Vec::new()))
    });
}

// ============================================================================
// Shipped keymap
// ============================================================================

#[divan::bench]
fn load_embedded_defaults() {
    divan::black_box(KeymapLayers::defaults_only().into_resolver());
}
