//! Benchmarks for the per-key-press hot path
//!
//! Run with: cargo bench --bench resolve

use std::time::Instant;

use keychord::keymap::{
    CurrentChord, KeyCode, KeyContext, KeybindingResolver, Keystroke, Modifiers,
    ResolvedKeybinding, WhenExpr,
};

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

fn main() {
    divan::main();
}

fn ctrl(c: char) -> Keystroke {
    Keystroke::new(KeyCode::Char(c), Modifiers::CTRL)
}

/// `depth` guarded rules stacked on ctrl+a; only the lowest one matches
fn stacked_resolver(depth: usize) -> KeybindingResolver {
    let mut rules = vec![ResolvedKeybinding::bind(&[ctrl('a')], "fallback")];
    for i in 0..depth {
        rules.push(
            ResolvedKeybinding::bind(&[ctrl('a')], &format!("cmd.{}", i))
                .with_when(WhenExpr::has(format!("never{}", i))),
        );
    }
    KeybindingResolver::new(rules, Vec::new())
}

fn chord_resolver(count: usize) -> KeybindingResolver {
    let rules = (0..count)
        .map(|i| {
            let second = Keystroke::new(KeyCode::F((i % 24 + 1) as u8), Modifiers::NONE);
            ResolvedKeybinding::bind(&[ctrl('k'), second], &format!("chord.{}", i))
        })
        .collect();
    KeybindingResolver::new(rules, Vec::new())
}

fn context() -> KeyContext {
    KeyContext::new()
        .with("editorTextFocus", true)
        .with("resourceLangId", "rust")
}

// ============================================================================
// Single key press
// ============================================================================

#[divan::bench]
fn resolve_unbound_key(bencher: divan::Bencher) {
    let resolver = stacked_resolver(10);
    let ctx = context();
    bencher.bench(|| divan::black_box(resolver.resolve(&ctx, None, &ctrl('z'))));
}

#[divan::bench(args = [1, 10, 100])]
fn resolve_through_guards(bencher: divan::Bencher, depth: usize) {
    let resolver = stacked_resolver(depth);
    let ctx = context();
    bencher.bench(|| divan::black_box(resolver.resolve(&ctx, None, &ctrl('a'))));
}

// ============================================================================
// Chords
// ============================================================================

#[divan::bench(args = [1, 24, 240])]
fn enter_chord(bencher: divan::Bencher, count: usize) {
    let resolver = chord_resolver(count);
    let ctx = context();
    bencher.bench(|| divan::black_box(resolver.resolve(&ctx, None, &ctrl('k'))));
}

#[divan::bench(args = [1, 24, 240])]
fn leave_chord(bencher: divan::Bencher, count: usize) {
    let resolver = chord_resolver(count);
    let ctx = context();
    let chord = CurrentChord::new(ctrl('k'), Instant::now());
    let second = Keystroke::new(KeyCode::F(1), Modifiers::NONE);

    bencher.bench(|| divan::black_box(resolver.resolve(&ctx, Some(&chord), &second)));
}

// ============================================================================
// Reverse lookup
// ============================================================================

#[divan::bench(args = [1, 24, 240])]
fn lookup_keybindings(bencher: divan::Bencher, count: usize) {
    let resolver = chord_resolver(count);
    bencher.bench(|| divan::black_box(resolver.lookup_keybindings("chord.0")));
}
