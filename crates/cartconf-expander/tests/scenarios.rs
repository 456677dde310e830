//! Black-box integration tests driving only the public entry points
//! (`cartconf_expander::parse`/`parse_without_includes`), covering the
//! concrete scenarios and universal properties enumerated for this
//! system.

use cartconf_expander::{parse_without_includes, MapLoader};
use cartconf_parser::FilterKind;

#[test]
fn empty_source_yields_an_empty_iterator() {
    let variants: Vec<_> = parse_without_includes("", &[], &[]).unwrap().collect();
    assert!(variants.is_empty());
}

#[test]
fn single_assignment_yields_one_dict_with_the_wrapper_keys() {
    let variants: Vec<_> = parse_without_includes("x = 1\n", &[], &[]).unwrap().collect();
    assert_eq!(variants.len(), 1);
    let v = &variants[0];
    assert_eq!(v.name, "");
    assert_eq!(v.short_name, "");
    assert_eq!(v.dict["name"], "");
    assert_eq!(v.dict["shortname"], "");
    assert_eq!(v.dict["dep"], "[]");
    assert_eq!(v.dict["x"], "1");
}

#[test]
fn two_dim_product_matches_the_documented_emission_order() {
    let src = "variants:\n  - a:\n  - b:\nvariants:\n  - 1:\n  - 2:\n";
    let names: Vec<String> = parse_without_includes(src, &[], &[])
        .unwrap()
        .map(|v| v.name)
        .collect();
    assert_eq!(names, vec!["1.a", "2.a", "1.b", "2.b"]);
}

#[test]
fn only_filter_selects_the_named_branch() {
    let src = "variants:\n  - a:\n      x = va\n  - b:\n      x = vb\nonly a\n";
    let variants: Vec<_> = parse_without_includes(src, &[], &[]).unwrap().collect();
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].name, "a");
    assert_eq!(variants[0].dict["x"], "va");
}

#[test]
fn interpolation_with_override_matches_the_readme_fixture() {
    let src = "word = abc\n\
               variants:\n\
               \x20 - a:\n\
               \x20     x = va\n\
               \x20     word = ${x}\n\
               \x20 - b:\n\
               \x20     x = vb\n\
               variants:\n\
               \x20 - 1:\n\
               \x20     y = w1\n\
               \x20 - 2:\n\
               \x20     y = w2\n\
               \x20     word = ${y}\n\
               only a.1\n";
    let variants: Vec<_> = parse_without_includes(src, &[], &[]).unwrap().collect();
    assert_eq!(variants.len(), 1);
    let v = &variants[0];
    assert_eq!(v.name, "1.a");
    assert_eq!(v.dict["x"], "va");
    assert_eq!(v.dict["y"], "w1");
    assert_eq!(v.dict["word"], "va");
}

#[test]
fn filter_applying_twice_is_idempotent() {
    let src = "variants:\n  - a:\n  - b:\nonly a\nonly a\n";
    let variants: Vec<_> = parse_without_includes(src, &[], &[]).unwrap().collect();
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].name, "a");
}

#[test]
fn filter_order_does_not_affect_the_result_set() {
    let src_ab = "variants:\n  - a:\n  - b:\n  - c:\nonly (a,b)\nonly (b,c)\n";
    let src_ba = "variants:\n  - a:\n  - b:\n  - c:\nonly (b,c)\nonly (a,b)\n";
    let mut names_ab: Vec<String> = parse_without_includes(src_ab, &[], &[]).unwrap().map(|v| v.name).collect();
    let mut names_ba: Vec<String> = parse_without_includes(src_ba, &[], &[]).unwrap().map(|v| v.name).collect();
    names_ab.sort();
    names_ba.sort();
    assert_eq!(names_ab, names_ba);
    assert_eq!(names_ab, vec!["b".to_string()]);
}

#[test]
fn repeated_parses_of_the_same_source_produce_identical_output() {
    let src = "variants:\n  - a:\n  - b:\nvariants:\n  - 1:\n  - 2:\n";
    let first: Vec<String> = parse_without_includes(src, &[], &[]).unwrap().map(|v| v.name).collect();
    let second: Vec<String> = parse_without_includes(src, &[], &[]).unwrap().map(|v| v.name).collect();
    assert_eq!(first, second);
}

#[test]
fn every_emitted_dict_is_free_of_interpolation_tokens() {
    let src = "x = va\nword = ${x}-${missing}\n";
    let variants: Vec<_> = parse_without_includes(src, &[], &[]).unwrap().collect();
    assert_eq!(variants.len(), 1);
    for value in variants[0].dict.values() {
        assert!(!value.contains("${"));
    }
}

#[test]
fn single_child_unnamed_block_does_not_change_output() {
    let wrapped = "variants:\n  - a:\n      x = 1\n";
    let unwrapped = "x = 1\n";
    let wrapped_dicts: Vec<_> = parse_without_includes(wrapped, &[], &[]).unwrap().map(|v| v.dict).collect();
    let unwrapped_dicts: Vec<_> = parse_without_includes(unwrapped, &[], &[]).unwrap().map(|v| v.dict).collect();
    assert_eq!(wrapped_dicts.len(), unwrapped_dicts.len());
    assert_eq!(wrapped_dicts[0]["x"], unwrapped_dicts[0]["x"]);
    assert_eq!(wrapped_dicts[0]["name"], unwrapped_dicts[0]["name"]);
}

#[test]
fn included_block_participates_in_the_product_at_its_splice_point() {
    let src = "variants:\n  - a:\n  - b:\ninclude shared\n";
    let loader = MapLoader::new([("shared".to_string(), "variants:\n  - p:\n  - q:\n".to_string())]);
    let names: Vec<String> = cartconf_expander::parse(src, &loader, &[], &[])
        .unwrap()
        .map(|v| v.name)
        .collect();
    assert_eq!(names.len(), 4);
    for expected in ["p.a", "q.a", "p.b", "q.b"] {
        assert!(names.contains(&expected.to_string()), "missing {expected} in {names:?}");
    }
}

#[test]
fn missing_include_target_reports_an_include_error() {
    let src = "include nowhere\n";
    let loader = MapLoader::new([]);
    let err = cartconf_expander::parse(src, &loader, &[], &[]).unwrap_err();
    assert!(err.to_string().contains("nowhere"));
}

#[test]
fn extra_cli_filter_restricts_output_at_the_outermost_scope() {
    let src = "variants:\n  - a:\n  - b:\n";
    let names: Vec<String> = parse_without_includes(src, &[], &[(FilterKind::Only, "a".to_string())])
        .unwrap()
        .map(|v| v.name)
        .collect();
    assert_eq!(names, vec!["a".to_string()]);
}

#[test]
fn dep_key_lists_satisfied_dependency_names_in_declaration_order() {
    let src = "variants:\n  - a:\n  - b:\nvariants:\n  - c: a\n  - d: b\n";
    let variants: Vec<_> = parse_without_includes(src, &[], &[]).unwrap().collect();
    let with_c = variants.iter().find(|v| v.name.contains('c')).expect("c variant present");
    assert_eq!(with_c.dict["dep"], "[a]");
    let with_d = variants.iter().find(|v| v.name.contains('d')).expect("d variant present");
    assert_eq!(with_d.dict["dep"], "[b]");
}
