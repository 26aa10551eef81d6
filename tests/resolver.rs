//! Resolver behaviour through the public API
//!
//! The second half plugs in a minimal guard type of its own to check that the
//! resolver only relies on the `WhenClause` capability.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use keychord::keymap::{
    combine, parse_when, when_is_entirely_included, BindingSource, CurrentChord, KeyCode,
    KeyContext, KeybindingResolver, Keystroke, Modifiers, ResolveResult, ResolvedKeybinding,
    WhenClause, WhenExpr,
};
use serde_json::Value;

fn ctrl(c: char) -> Keystroke {
    Keystroke::new(KeyCode::Char(c), Modifiers::CTRL)
}

fn when(s: &str) -> WhenExpr {
    parse_when(s).unwrap()
}

fn shared(rules: Vec<ResolvedKeybinding>) -> Vec<Arc<ResolvedKeybinding>> {
    rules.into_iter().map(Arc::new).collect()
}

// ========================================================================
// Merge
// ========================================================================

#[test]
fn test_combine_without_overrides_is_identity() {
    let defaults = shared(vec![
        ResolvedKeybinding::bind(&[ctrl('a')], "a"),
        ResolvedKeybinding::bind(&[ctrl('k'), ctrl('b')], "b").with_when(when("editorFocus")),
    ]);

    let merged = combine(&defaults, &[]);
    assert_eq!(merged.len(), defaults.len());
    for (merged, rule) in merged.iter().zip(&defaults) {
        assert!(Arc::ptr_eq(merged, rule));
    }
}

#[test]
fn test_exact_removal_directive_drops_rule() {
    let defaults = shared(vec![
        ResolvedKeybinding::bind(&[ctrl('a')], "x").with_when(when("editorFocus && !readonly")),
        ResolvedKeybinding::bind(&[ctrl('b')], "x"),
    ]);
    let overrides = shared(vec![ResolvedKeybinding::bind(&[ctrl('a')], "-x")
        .with_when(when("!readonly && editorFocus"))]);

    let merged = combine(&defaults, &overrides);
    assert_eq!(merged.len(), 1);
    assert!(Arc::ptr_eq(&merged[0], &defaults[1]));
}

// ========================================================================
// Subsumption
// ========================================================================

#[test]
fn test_anything_implies_always() {
    for guard in ["a", "a && b", "a || b", "!a", "false"] {
        assert!(when_is_entirely_included(Some(&when(guard)), None));
    }
}

#[test]
fn test_always_does_not_imply_a_condition() {
    for guard in ["a", "a && b", "a || b", "lang == rust"] {
        assert!(!when_is_entirely_included(None, Some(&when(guard))));
    }
}

#[test]
fn test_one_step_check_is_incomplete() {
    let simple = when("a");
    assert!(when_is_entirely_included(Some(&simple), Some(&simple)));

    // Proving a conjunction implies itself takes more than one step
    let conj = when("a && b");
    assert!(!when_is_entirely_included(Some(&conj), Some(&conj)));
}

// ========================================================================
// Resolution
// ========================================================================

#[test]
fn test_empty_resolver_never_matches() {
    let resolver = KeybindingResolver::<WhenExpr>::new(vec![], vec![]);
    assert!(resolver.resolve(&KeyContext::new(), None, &ctrl('a')).is_no_match());
    assert!(resolver
        .resolve(&KeyContext::new(), Some(&CurrentChord::new(ctrl('k'), Instant::now())), &ctrl('a'))
        .is_no_match());
}

#[test]
fn test_same_command_different_guards_both_survive() {
    let resolver = KeybindingResolver::new(
        vec![
            ResolvedKeybinding::bind(&[ctrl('a')], "x").with_when(when("editorFocus")),
            ResolvedKeybinding::bind(&[ctrl('a')], "x").with_when(when("terminalFocus")),
        ],
        vec![],
    );

    assert_eq!(resolver.lookup_keybindings("x").len(), 2);
    let terminal = KeyContext::new().with("terminalFocus", true);
    assert_eq!(resolver.resolve(&terminal, None, &ctrl('a')).command(), Some("x"));
}

#[test]
fn test_later_definition_wins() {
    let resolver = KeybindingResolver::new(
        vec![ResolvedKeybinding::<WhenExpr>::bind(&[ctrl('a')], "X")],
        vec![ResolvedKeybinding::bind(&[ctrl('a')], "Y")],
    );

    assert_eq!(
        resolver.resolve(&KeyContext::new(), None, &ctrl('a')),
        ResolveResult::Dispatch {
            command: Some("Y".to_string()),
            args: Value::Null,
            bubble: false,
        }
    );
}

#[test]
fn test_chord_within_and_after_timeout() {
    let resolver = KeybindingResolver::new(
        vec![ResolvedKeybinding::<WhenExpr>::bind(&[ctrl('k'), ctrl('c')], "foo").with_timeout(1000)],
        vec![],
    );
    let ctx = KeyContext::new();

    assert_eq!(
        resolver.resolve(&ctx, None, &ctrl('k')),
        ResolveResult::EnterChord { max_timeout: 1000 }
    );

    let t = Instant::now();
    let chord = CurrentChord::new(ctrl('k'), t);
    assert_eq!(
        resolver
            .resolve_at(&ctx, Some(&chord), &ctrl('c'), t + Duration::from_millis(500))
            .command(),
        Some("foo")
    );
    assert!(resolver
        .resolve_at(&ctx, Some(&chord), &ctrl('c'), t + Duration::from_millis(1500))
        .is_no_match());
}

#[test]
fn test_zero_timeout_uses_default() {
    let kb = ResolvedKeybinding::<WhenExpr>::new(
        Some(&[ctrl('k'), ctrl('c')]),
        Some("foo"),
        Value::Null,
        None,
        Some(0),
        BindingSource::user(),
    );
    assert_eq!(kb.timeout, 5000);
}

#[test]
fn test_dispatch_parts_cut_at_first_gap() {
    let parts = [Some(ctrl('k')), None, Some(ctrl('c'))];
    let kb = ResolvedKeybinding::<WhenExpr>::new(
        Some(&parts[..]),
        Some("foo"),
        Value::Null,
        None,
        None,
        BindingSource::user(),
    );
    assert_eq!(kb.keypress_parts, vec![ctrl('k')]);
    assert!(!kb.is_chord());
}

#[test]
fn test_primary_keybinding_is_last_registered() {
    let resolver = KeybindingResolver::new(
        vec![
            ResolvedKeybinding::<WhenExpr>::bind(&[ctrl('a')], "x"),
            ResolvedKeybinding::bind(&[ctrl('b')], "x"),
        ],
        vec![],
    );

    let primary = resolver.lookup_primary_keybinding("x").unwrap();
    assert!(Arc::ptr_eq(&primary, &resolver.keybindings()[1]));
    assert!(resolver.lookup_primary_keybinding("y").is_none());
}

#[test]
fn test_custom_log_sink() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);

    let resolver = KeybindingResolver::with_log(
        shared(vec![
            ResolvedKeybinding::bind(&[ctrl('k'), ctrl('a')], "a"),
            ResolvedKeybinding::bind(&[ctrl('k'), ctrl('b')], "b"),
        ]),
        vec![],
        move |line| sink.lock().unwrap().push(line.to_string()),
    );

    let ctx = KeyContext::new();
    resolver.resolve(&ctx, None, &ctrl('k'));
    let chord = CurrentChord::new(ctrl('k'), Instant::now());
    resolver.resolve(&ctx, Some(&chord), &ctrl('z'));

    let lines = lines.lock().unwrap();
    assert_eq!(
        *lines,
        vec![
            "| Resolving ctrl+k".to_string(),
            "\\ From 2 keybinding entries, matched 2 chord.".to_string(),
            "| Resolving ctrl+z chorded from ctrl+k".to_string(),
            "\\ From 2 keybinding entries, no when clauses matched the context.".to_string(),
        ]
    );
}

// ========================================================================
// A guard type of our own
// ========================================================================

#[derive(Debug, Clone, PartialEq)]
enum Flag {
    Always,
    Never,
    On(&'static str),
    Off(&'static str),
    Either(Vec<Flag>),
    Both(Vec<Flag>),
}

impl WhenClause for Flag {
    type Context = HashSet<&'static str>;

    fn evaluate(&self, context: &Self::Context) -> bool {
        match self {
            Flag::Always => true,
            Flag::Never => false,
            Flag::On(name) => context.contains(name),
            Flag::Off(name) => !context.contains(name),
            Flag::Either(flags) => flags.iter().any(|f| f.evaluate(context)),
            Flag::Both(flags) => flags.iter().all(|f| f.evaluate(context)),
        }
    }

    fn negate(&self) -> Self {
        match self {
            Flag::Always => Flag::Never,
            Flag::Never => Flag::Always,
            Flag::On(name) => Flag::Off(*name),
            Flag::Off(name) => Flag::On(*name),
            Flag::Either(flags) => Flag::Both(flags.iter().map(Flag::negate).collect()),
            Flag::Both(flags) => Flag::Either(flags.iter().map(Flag::negate).collect()),
        }
    }

    fn equals(&self, other: &Self) -> bool {
        self == other
    }

    fn serialize(&self) -> String {
        format!("{:?}", self)
    }

    fn disjuncts(&self) -> Option<&[Self]> {
        match self {
            Flag::Either(flags) => Some(flags),
            _ => None,
        }
    }

    fn is_always_false(&self) -> bool {
        matches!(self, Flag::Never)
    }
}

fn flag_rule(key: Keystroke, command: &str, guard: Flag) -> ResolvedKeybinding<Flag> {
    ResolvedKeybinding::new(
        Some(&[key]),
        Some(command),
        Value::Null,
        Some(guard),
        None,
        BindingSource::builtin(),
    )
}

#[test]
fn test_custom_guard_type_resolves() {
    let resolver = KeybindingResolver::new(
        vec![
            flag_rule(ctrl('a'), "plain", Flag::Always),
            flag_rule(ctrl('a'), "focused", Flag::On("focus")),
            flag_rule(ctrl('a'), "dead", Flag::Never),
        ],
        vec![],
    );

    let focused: HashSet<_> = ["focus"].into_iter().collect();
    assert_eq!(resolver.resolve(&focused, None, &ctrl('a')).command(), Some("focused"));
    assert_eq!(
        resolver.resolve(&HashSet::new(), None, &ctrl('a')).command(),
        Some("plain")
    );
    // Statically false rules are not indexed
    assert!(resolver.lookup_keybindings("dead").is_empty());
}

#[test]
fn test_custom_guard_subsumption_prunes_lookup() {
    let resolver = KeybindingResolver::new(
        vec![
            flag_rule(ctrl('a'), "narrow", Flag::On("focus")),
            flag_rule(
                ctrl('a'),
                "wide",
                Flag::Either(vec![Flag::On("focus"), Flag::On("hover")]),
            ),
        ],
        vec![],
    );

    // "focus" implies "focus || hover", so the later rule covers the earlier one
    assert!(resolver.lookup_keybindings("narrow").is_empty());
    assert_eq!(resolver.lookup_keybindings("wide").len(), 1);
}
