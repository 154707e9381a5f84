//! End-to-end tests for dispatch table generation.
//!
//! These drive the whole pipeline: symbols in, C source out, and read the
//! source back to check what the C compiler would see.

use std::collections::BTreeSet;
use std::fs;

use composite_dispatch::catalog::COORDINATE_COUNT;
use composite_dispatch::key::CandidateKey;
use composite_dispatch::reader::{read_declarations, read_definitions};
use composite_dispatch::{
    coordinates, Config, Coordinate, DispatchError, DispatchTable, Generation, Generator,
    ModuleId, Operation, PixelFormat, SymbolLoader, SymbolTable,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn generic_module(skip: &[Operation]) -> (ModuleId, SymbolTable) {
    let symbols = Operation::ALL
        .into_iter()
        .filter(|op| !skip.contains(op))
        .map(|op| format!("{}_any_any_any_impl", op));
    (
        ModuleId::from_path("gimp-composite-generic.o"),
        SymbolTable::from_symbols("generic", symbols),
    )
}

fn special_module(symbols: &[&str]) -> (ModuleId, SymbolTable) {
    (
        ModuleId::from_path("gimp-composite-special.o"),
        SymbolTable::from_symbols("special", symbols.iter().copied()),
    )
}

fn generate(sources: Vec<(ModuleId, SymbolTable)>) -> Generation {
    Generator::new(Config::default())
        .generate_from_sources(sources)
        .unwrap()
}

fn same(op: Operation, format: PixelFormat) -> Coordinate {
    Coordinate::new(op, format, format, format)
}

#[test]
fn test_special_module_overrides_one_cell() {
    let generation = generate(vec![
        generic_module(&[]),
        special_module(&["multiply_rgba8_rgba8_rgba8_impl"]),
    ]);
    let target = same(Operation::Multiply, PixelFormat::Rgba8);

    assert_eq!(generation.master.len(), COORDINATE_COUNT);
    for coord in coordinates() {
        let selection = generation.master.get(coord).unwrap();
        if coord == target {
            assert_eq!(selection.implementation, "multiply_rgba8_rgba8_rgba8_impl");
            assert_eq!(selection.module, 1);
        } else {
            assert_eq!(selection.implementation, format!("{}_any_any_any_impl", coord.op));
            assert_eq!(selection.module, 0);
        }
    }
}

#[test]
fn test_unimplemented_cell_is_empty_in_name_table() {
    let generation = generate(vec![generic_module(&[Operation::Dissolve])]);
    let target = same(Operation::Dissolve, PixelFormat::V8);

    assert!(generation.master.get(target).is_none());

    let definitions = read_definitions(&generation.artifacts.definitions).unwrap();
    let names = definitions
        .name_table("gimp_composite_function_name")
        .unwrap();
    assert!(!names.cells.contains_key(&target));
    assert_eq!(names.cells.len(), COORDINATE_COUNT - 64);

    let functions = definitions.function_table("gimp_composite_function").unwrap();
    assert!(!functions.cells.contains_key(&target));
}

#[test]
fn test_wildcard_destination_fallback() {
    let generation = generate(vec![special_module(&[
        "screen_rgba8_rgba8_any_fallback",
        "screen_rgba8_rgba8_rgba8_exact",
    ])]);

    for d in PixelFormat::CONCRETE {
        let coord = Coordinate::new(Operation::Screen, PixelFormat::Rgba8, PixelFormat::Rgba8, d);
        let expected = if d == PixelFormat::Rgba8 {
            "screen_rgba8_rgba8_rgba8_exact"
        } else {
            "screen_rgba8_rgba8_any_fallback"
        };
        assert_eq!(generation.master.implementation(coord), Some(expected));
    }
    assert_eq!(generation.master.len(), 4);
}

#[test]
fn test_ambiguous_module_is_rejected() {
    let result = Generator::new(Config::default()).generate_from_sources(vec![special_module(&[
        "multiply_rgb8_rgb8_rgb8",
        "multiply_rgb8_rgb8_rgb8_sse",
    ])]);

    match result {
        Err(DispatchError::AmbiguousSymbol { key, candidates, .. }) => {
            assert_eq!(key, "multiply_rgb8_rgb8_rgb8");
            assert_eq!(candidates.len(), 2);
        }
        other => panic!("Expected ambiguity, got {:?}", other.map(|g| g.master.len())),
    }
}

#[test]
fn test_artifacts_read_back() {
    let generation = generate(vec![
        generic_module(&[Operation::Dissolve]),
        special_module(&["hue_va8_any_va8_impl", "normal_rgb8_rgb8_any_impl"]),
    ]);

    let shape = read_declarations(&generation.artifacts.declarations).unwrap();
    assert_eq!(shape.name, "GimpCompositeFunctionTable");
    assert_eq!(shape.dimensions.len(), 4);

    let definitions = read_definitions(&generation.artifacts.definitions).unwrap();
    let master = definitions.function_table("gimp_composite_function").unwrap();
    let expected: Vec<(Coordinate, String)> = generation
        .master
        .iter()
        .map(|(coord, selection)| (coord, selection.implementation.clone()))
        .collect();
    let actual: Vec<(Coordinate, String)> = master.cells.clone().into_iter().collect();
    assert_eq!(actual, expected);

    for module in &generation.modules {
        let read = definitions.function_table(module.id.ident()).unwrap();
        assert_eq!(read.cells.len(), module.table.len());
        for (coord, implementation) in module.table.iter() {
            assert_eq!(read.cells.get(&coord).map(String::as_str), Some(implementation));
        }
    }
}

#[test]
fn test_symbol_prefix() {
    let config = Config {
        symbol_prefix: "gimp_composite_".to_string(),
        ..Config::default()
    };
    let generation = Generator::new(config)
        .generate_from_sources(vec![special_module(&[
            "gimp_composite_burn_any_any_any_generic",
            "burn_v8_v8_v8_unprefixed",
        ])])
        .unwrap();

    assert_eq!(generation.master.len(), 64);
    assert_eq!(
        generation.master.implementation(same(Operation::Burn, PixelFormat::V8)),
        Some("gimp_composite_burn_any_any_any_generic")
    );
}

#[test]
fn test_listing_modules_written_and_checked() {
    let dir = tempfile::tempdir().unwrap();
    let generic = dir.path().join("gimp-composite-generic.syms");
    let special = dir.path().join("gimp-composite-mmx.syms");
    fs::write(
        &generic,
        "0000000000000000 T normal_any_any_any_generic\n                 U memcpy\n",
    )
    .unwrap();
    fs::write(&special, "0000000000000000 T normal_rgba8_rgba8_rgba8_mmx\n").unwrap();

    let config = Config::default();
    let generator = Generator::with_loader(
        config.clone(),
        SymbolLoader::Listing {
            strip_leading_underscore: false,
        },
    );
    let generation = generator.generate(&[generic, special]).unwrap();
    assert_eq!(generation.modules[1].id.ident(), "gimp_composite_mmx");

    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    assert_eq!(generation.stale_files(&out, &config).len(), 3);

    generation.write_to(&out, &config).unwrap();
    assert!(generation.stale_files(&out, &config).is_empty());

    let written = fs::read_to_string(out.join("gimp-composite-dispatch.c")).unwrap();
    assert_eq!(written, generation.artifacts.definitions);
    assert!(written.contains("gimp_composite_mmx_init ();"));

    let harness = fs::read_to_string(out.join("gimp-composite-test.c")).unwrap();
    assert!(harness.contains("normal_rgba8_rgba8_rgba8_mmx, &special_ctx"));
}

/// Symbols for one module: a set of distinct keys, each with a module tag.
fn module_strategy(tag: usize) -> impl Strategy<Value = (ModuleId, SymbolTable)> {
    let format = prop_oneof![
        Just(PixelFormat::V8),
        Just(PixelFormat::Va8),
        Just(PixelFormat::Rgb8),
        Just(PixelFormat::Rgba8),
        Just(PixelFormat::Any),
    ];
    let op = (0..Operation::ALL.len()).prop_map(|i| Operation::ALL[i]);
    let key = (op, format.clone(), format.clone(), format)
        .prop_map(|(op, a, b, d)| CandidateKey { op, a, b, d }.to_string());

    proptest::collection::btree_set(key, 0..24).prop_map(move |keys: BTreeSet<String>| {
        let symbols = keys.iter().map(|key| format!("{}_m{}", key, tag));
        (
            ModuleId::from_path(format!("module-{}.o", tag)),
            SymbolTable::from_symbols(format!("m{}", tag), symbols),
        )
    })
}

fn modules_strategy() -> impl Strategy<Value = Vec<(ModuleId, SymbolTable)>> {
    (module_strategy(0), module_strategy(1), module_strategy(2))
        .prop_map(|(a, b, c)| vec![a, b, c])
}

proptest! {
    #[test]
    fn prop_last_defining_module_wins(sources in modules_strategy()) {
        let generation = generate(sources);

        for coord in coordinates() {
            let expected = generation
                .modules
                .iter()
                .rposition(|module| module.table.contains(coord));
            let actual = generation.master.get(coord).map(|selection| selection.module);
            prop_assert_eq!(actual, expected);

            if let Some(index) = expected {
                prop_assert_eq!(
                    generation.master.implementation(coord),
                    generation.modules[index].table.get(coord)
                );
            }
        }
    }

    #[test]
    fn prop_most_specific_key_wins(sources in modules_strategy()) {
        let tables: Vec<SymbolTable> = sources.iter().map(|(_, table)| table.clone()).collect();
        let generation = generate(sources);

        for (module, symbols) in generation.modules.iter().zip(&tables) {
            let keys: Vec<CandidateKey> = symbols
                .iter()
                .filter_map(|symbol| {
                    let key = symbol.rsplit_once('_').map(|(key, _)| key)?;
                    CandidateKey::parse(key, "")
                })
                .collect();

            for coord in coordinates() {
                let best = keys
                    .iter()
                    .filter(|key| key.covers(coord))
                    .max_by_key(|key| key.rank());
                let expected = best.map(|key| key.to_string());
                let actual = module
                    .table
                    .get(coord)
                    .and_then(|symbol| symbol.rsplit_once('_'))
                    .map(|(key, _)| key.to_string());
                prop_assert_eq!(actual, expected);
            }
        }
    }

    #[test]
    fn prop_generation_is_deterministic(sources in modules_strategy()) {
        let first = generate(sources.clone());
        let second = generate(sources);
        prop_assert_eq!(first.artifacts, second.artifacts);
    }
}
