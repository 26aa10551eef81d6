use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use keychord::cli::{context_from_assignments, CliArgs, CliCommand};
use keychord::keymap::{
    load_keymap_file, parse_keymap_yaml, BindingSource, KeyContext, KeySequence, Keymap,
    KeymapLayers, KeymapWatcher, ResolvedKeybinding, DEFAULT_KEYMAP_YAML,
};

fn main() -> Result<()> {
    let args = CliArgs::parse();

    keychord::tracing::init_with_default(if args.verbose { "keychord=debug" } else { "warn" });

    let paths = args.override_paths();
    match &args.command {
        CliCommand::Resolve { context, set, keys } => {
            let context = match context {
                Some(path) => read_context(path)?,
                None => context_from_assignments(set).map_err(anyhow::Error::msg)?,
            };
            resolve(&KeymapLayers::load(&paths), &context, keys)
        }
        CliCommand::Lookup { command } => lookup(&KeymapLayers::load(&paths), command),
        CliCommand::List { defaults } => {
            list(&KeymapLayers::load(&paths), *defaults);
            Ok(())
        }
        CliCommand::Check => check(&paths),
        CliCommand::Watch => watch(paths),
    }
}

fn read_context(path: &Path) -> Result<KeyContext> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse context file {}", path.display()))
}

fn resolve(layers: &KeymapLayers, context: &KeyContext, keys: &[String]) -> Result<()> {
    let mut keymap = Keymap::new(Arc::new(layers.resolver()));

    for arg in keys {
        // One argument may hold a whole chord
        let sequence: KeySequence = arg
            .parse()
            .with_context(|| format!("Invalid key press '{}'", arg))?;

        for keystroke in sequence.parts() {
            let result = keymap.handle_keystroke(context, keystroke);
            println!("{}\t{}", keystroke, result);
        }
    }

    if let Some(pending) = keymap.pending_chord_display() {
        println!("(chord {} still pending)", pending);
    }
    Ok(())
}

fn lookup(layers: &KeymapLayers, command: &str) -> Result<()> {
    let resolver = layers.resolver();
    let bindings = resolver.lookup_keybindings(command);
    if bindings.is_empty() {
        bail!("No keybinding for {}", command);
    }

    for kb in bindings {
        println!("{}", describe(&kb));
    }
    Ok(())
}

fn list(layers: &KeymapLayers, defaults_only: bool) {
    let resolver = layers.resolver();
    let rules = if defaults_only {
        resolver.default_keybindings()
    } else {
        resolver.keybindings()
    };

    for kb in rules {
        println!("{}\t{}", kb.command.as_deref().unwrap_or("<unbound>"), describe(kb));
    }
}

fn describe(kb: &ResolvedKeybinding) -> String {
    let keys = match kb.key_string() {
        k if k.is_empty() => "-".to_string(),
        k => k,
    };
    let when = kb
        .when
        .as_ref()
        .map(|w| w.to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "{}\twhen: {}\t{}{}",
        keys,
        when,
        kb.source.describe(),
        if kb.bubble { "\tbubble" } else { "" }
    )
}

fn check(paths: &[PathBuf]) -> Result<()> {
    let mut failures = 0;

    match parse_keymap_yaml(DEFAULT_KEYMAP_YAML, &BindingSource::builtin()) {
        Ok(bindings) => println!("ok\tembedded defaults ({} bindings)", bindings.len()),
        Err(e) => {
            failures += 1;
            println!("error\tembedded defaults: {}", e);
        }
    }

    for path in paths {
        if !path.exists() {
            println!("skip\t{} (not found)", path.display());
            continue;
        }
        match load_keymap_file(path, &BindingSource::user()) {
            Ok(bindings) => println!("ok\t{} ({} bindings)", path.display(), bindings.len()),
            Err(e) => {
                failures += 1;
                println!("error\t{}: {}", path.display(), e);
            }
        }
    }

    if failures > 0 {
        bail!("{} keymap file(s) failed to load", failures);
    }
    Ok(())
}

fn watch(paths: Vec<PathBuf>) -> Result<()> {
    let layers = KeymapLayers::load(&paths);
    let mut keymap = Keymap::new(Arc::new(layers.resolver()));

    let watcher = KeymapWatcher::with_layers(paths).context("Failed to start keymap watcher")?;
    println!(
        "watching {} keymap file(s), {} rules loaded",
        watcher.layers().len(),
        keymap.resolver().keybindings().len()
    );

    loop {
        if let Some(resolver) = watcher.poll_reload(&layers.defaults) {
            println!("reloaded\t{} rules", resolver.keybindings().len());
            keymap.replace_resolver(resolver);
        }
        thread::sleep(Duration::from_millis(250));
    }
}
