//! Utility generation through tailwind-rs, fed with real extractor output.
//! Most tokens the extractor produces are not utilities; they must be
//! skipped without breaking generation.

use tailwind_purge::{extract, KeepList, Stage, UtilityStage};

fn keep_list_from(content: &str) -> KeepList {
    extract(content).collect()
}

#[test]
fn test_keep_list_utility_is_generated() {
    let stage = UtilityStage::new(&keep_list_from("div(class=\"p-4\")"), false);

    let css = stage.process("@tailwind utilities;\n").unwrap();

    assert!(css.contains(".p-4"), "missing .p-4 rule in:\n{}", css);
    assert!(css.contains("padding"), "missing padding declaration in:\n{}", css);
    assert!(!css.contains("@tailwind"));
}

#[test]
fn test_non_utility_tokens_do_not_break_generation() {
    let keep_list = keep_list_from("url(/assets/img.png) a:hover / : -x md:text-lg café-au-lait :focus");
    assert!(keep_list.contains("/assets/img"));
    assert!(keep_list.contains("-au-lait"));

    let stage = UtilityStage::new(&keep_list, false);
    let result = std::panic::catch_unwind(|| stage.process("@tailwind utilities;\n.x { }\n"));

    let css = result
        .expect("utility generation panicked on non-utility tokens")
        .unwrap();
    assert!(!css.contains("@tailwind"));
    assert!(css.ends_with(".x { }\n"));
}

#[test]
fn test_mixed_tokens_keep_valid_utilities() {
    let keep_list = keep_list_from("a(href=\"/docs\") nav.flex(class=\"p-4 not-a-real-utility :hover\")");
    let stage = UtilityStage::new(&keep_list, false);

    let css = stage.process("@tailwind base;\n@tailwind utilities;\n").unwrap();
    assert!(css.contains(".p-4"), "missing .p-4 rule in:\n{}", css);
    assert!(!css.contains("@tailwind"));
}
