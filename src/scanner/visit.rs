//! Depth-first traversal of a translation unit's declarations.

use super::FunctionDeclaration;
use crate::frontend::TranslationUnit;

/// Call `visit` for every function declaration in `tu`, in source order.
///
/// The walk is a pre-order traversal over the whole tree, so declarations
/// nested in namespaces, classes, templates, linkage specifications,
/// preprocessor blocks and function bodies (local classes) are all reached.
/// Every node is entered exactly once.
pub fn traverse_declarations<'tu, F>(tu: &'tu TranslationUnit, mut visit: F)
where
    F: FnMut(&FunctionDeclaration<'tu>),
{
    let mut cursor = tu.root().walk();
    loop {
        for declaration in FunctionDeclaration::from_node(cursor.node(), tu) {
            visit(&declaration);
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Names of all function definitions (declarations with a body), in order.
pub fn function_definitions(tu: &TranslationUnit) -> Vec<String> {
    let mut names = Vec::new();
    traverse_declarations(tu, |declaration| {
        if declaration.has_body() {
            names.push(declaration.name().to_string());
        }
    });
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{collect_diagnostics, Language, MacroTable, TreeSitterFrontend};
    use std::path::Path;

    fn definitions(source: &str, language: Language) -> Vec<String> {
        let tu = TreeSitterFrontend::new()
            .parse_source(Path::new("t"), source.as_bytes().to_vec(), language)
            .unwrap();
        function_definitions(&tu)
    }

    #[test]
    fn test_definitions_skip_forward_declarations() {
        let names = definitions(
            "int add(int a,int b){return a+b;} void helper();",
            Language::C,
        );
        assert_eq!(names, vec!["add"]);
    }

    #[test]
    fn test_counts_definitions_not_declarations() {
        let source = r#"
static int one(void);
int two(int);
extern void three(void);

static int one(void) { return 1; }
int two(int x) { return x * 2; }
void four(void) { }
"#;
        assert_eq!(definitions(source, Language::C), vec!["one", "two", "four"]);
    }

    #[test]
    fn test_no_definitions() {
        let source = "struct point { int x, y; };\nint f(void);\ntypedef int (*cb)(int);\n";
        assert!(definitions(source, Language::C).is_empty());
    }

    #[test]
    fn test_cpp_constructs_read_as_c() {
        assert!(definitions("class Foo { int x; };", Language::C).is_empty());
        assert_eq!(
            definitions("namespace n { void f() {} }", Language::C),
            vec!["f"]
        );
    }

    #[test]
    fn test_if_zero_is_not_reported() {
        let source = "#if 0\nvoid dead(void) {}\n#endif\nvoid live(void) {}\n";
        assert_eq!(definitions(source, Language::C), vec!["live"]);
    }

    #[test]
    fn test_command_macro_picks_one_branch() {
        let source = r#"
#ifdef USE_FAST
static int pick(void) { return 1; }
#else
static int pick(void) { return 2; }
static int fallback(void) { return 3; }
#endif
"#;
        let macros = MacroTable::from_arguments(
            &["cc".to_string(), "-DUSE_FAST".to_string()],
            Language::C,
        );
        let tu = TreeSitterFrontend::new()
            .parse_with_macros(Path::new("t"), source.as_bytes().to_vec(), Language::C, macros)
            .unwrap();
        assert_eq!(function_definitions(&tu), vec!["pick"]);
    }

    #[test]
    fn test_extern_c_guard_in_c() {
        let source = r#"
#ifdef __cplusplus
extern "C" {
#endif

int f(void) { return 0; }

#ifdef __cplusplus
}
#endif
"#;
        let tu = TreeSitterFrontend::new()
            .parse_source(Path::new("t.c"), source.as_bytes().to_vec(), Language::C)
            .unwrap();
        assert_eq!(function_definitions(&tu), vec!["f"]);
        assert!(collect_diagnostics(&tu).is_empty());
    }

    #[test]
    fn test_undecided_conditionals_keep_every_branch() {
        let source = r#"
#ifdef USE_FAST
static int pick(void) { return 1; }
#else
static int pick(void) { return 2; }
#endif
int after(void) { return pick(); }
"#;
        assert_eq!(
            definitions(source, Language::C),
            vec!["pick", "pick", "after"]
        );
    }

    #[test]
    fn test_cpp_nesting_order() {
        let source = r#"
namespace outer {
namespace inner {
int first() { return 1; }
}

class Widget {
public:
    Widget() = default;
    Widget(int v) : value(v) {}
    ~Widget() {}
    int get() const { return value; }
    void set(int v);
    virtual void draw() = 0;
private:
    int value;
};

void Widget::set(int v) { value = v; }
}

template <typename T>
T identity(T x) { return x; }

template <>
int identity<int>(int x) { return x; }

extern "C" {
void c_entry(void) {}
}

int with_local() {
    struct Local {
        int method() { return 3; }
    };
    auto lambda = [](int y) { return y + 1; };
    return Local().method() + lambda(1);
}
"#;
        assert_eq!(
            definitions(source, Language::Cpp),
            vec![
                "first",
                "Widget",
                "~Widget",
                "get",
                "set",
                "identity",
                "identity",
                "c_entry",
                "with_local",
                "method",
            ]
        );
    }

    #[test]
    fn test_visits_declarations_once_each() {
        let tu = TreeSitterFrontend::new()
            .parse_source(
                Path::new("t"),
                b"void a(void); void a(void) {} void b(void) {}".to_vec(),
                Language::C,
            )
            .unwrap();

        let mut seen = Vec::new();
        traverse_declarations(&tu, |declaration| {
            seen.push((declaration.name().to_string(), declaration.has_body()));
        });
        assert_eq!(
            seen,
            vec![
                ("a".to_string(), false),
                ("a".to_string(), true),
                ("b".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_syntax_errors_keep_good_definitions() {
        let source = "int good(void) { return 0; }\nint bad( { \nint later(void) { return 1; }\n";
        let names = definitions(source, Language::C);
        assert!(names.contains(&"good".to_string()), "{:?}", names);
    }
}
