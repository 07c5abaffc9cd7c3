//! Read-only view of function declarations in a translation unit.

use tree_sitter::Node;

use crate::frontend::TranslationUnit;

/// Node kinds that may declare functions without defining them.
const DECLARATION_KINDS: &[&str] = &["declaration", "field_declaration"];

/// Wrappers that only group a declarator and never change what it declares.
const TRANSPARENT_DECLARATORS: &[&str] = &["parenthesized_declarator", "attributed_declarator"];

/// Declarators that turn the name they wrap into an object, not a function.
const OBJECT_DECLARATORS: &[&str] = &["pointer_declarator", "reference_declarator", "array_declarator"];

/// A function declaration or definition.
#[derive(Debug, Clone)]
pub struct FunctionDeclaration<'tu> {
    node: Node<'tu>,
    name: String,
    has_body: bool,
}

impl<'tu> FunctionDeclaration<'tu> {
    /// All function declarations introduced directly by `node`.
    ///
    /// A definition yields one entry; a declaration statement yields one per
    /// function declarator (`int f(void), g(int);` yields two). Any other node
    /// yields nothing.
    pub fn from_node(node: Node<'tu>, tu: &TranslationUnit) -> Vec<Self> {
        if node.kind() == "function_definition" {
            // C error recovery reads `class Foo { ... };` or `namespace n { ... }`
            // as a definition with a plain identifier declarator.
            let name = node
                .child_by_field_name("declarator")
                .and_then(|declarator| resolve_declarator(declarator, tu))
                .filter(|resolved| resolved.is_function);
            return match name {
                Some(resolved) => vec![Self {
                    node,
                    name: resolved.name,
                    has_body: definition_has_body(node),
                }],
                None => {
                    log::trace!(
                        "definition without a function declarator at {}:{}",
                        tu.path().display(),
                        node.start_position().row + 1
                    );
                    Vec::new()
                }
            };
        }

        if !DECLARATION_KINDS.contains(&node.kind()) {
            return Vec::new();
        }

        let mut cursor = node.walk();
        let declarations = node
            .children_by_field_name("declarator", &mut cursor)
            .filter_map(|declarator| resolve_declarator(declarator, tu))
            .filter(|resolved| resolved.is_function)
            .map(|resolved| Self {
                node,
                name: resolved.name,
                has_body: false,
            })
            .collect();
        declarations
    }

    /// The simple name: no scope qualifiers and no template arguments.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True only for definitions.
    pub fn has_body(&self) -> bool {
        self.has_body
    }

    /// 1-indexed line of the declaration.
    pub fn line(&self) -> usize {
        self.node.start_position().row + 1
    }
}

/// Defaulted, deleted and pure-virtual members are definitions without a body.
fn definition_has_body(node: Node) -> bool {
    if node.child_by_field_name("body").is_some() {
        return true;
    }
    // Function-try-blocks hang the try statement off the definition directly.
    let mut cursor = node.walk();
    let has_try_block = node
        .children(&mut cursor)
        .any(|child| child.kind() == "try_statement");
    has_try_block
}

struct ResolvedName {
    name: String,
    is_function: bool,
}

/// Follow a declarator down to the name it declares.
///
/// `is_function` is true when the nearest non-grouping declarator around the
/// name is a function declarator, so `int (*fp)(int)` is an object while
/// `int (*get(void))(int)` is a function.
fn resolve_declarator(mut node: Node, tu: &TranslationUnit) -> Option<ResolvedName> {
    let mut innermost: Option<&'static str> = None;

    loop {
        let kind = node.kind();
        match kind {
            "identifier" | "field_identifier" | "type_identifier" => {
                return Some(named(tu.node_text(node).to_string(), innermost));
            }
            "destructor_name" => {
                let name: String = tu
                    .node_text(node)
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                return Some(named(name, innermost));
            }
            "operator_name" => {
                return Some(named(operator_name(tu.node_text(node)), innermost));
            }
            "operator_cast" => {
                return Some(ResolvedName {
                    name: conversion_name(node, tu),
                    is_function: true,
                });
            }
            "qualified_identifier" | "template_function" | "template_method" => {
                node = node.child_by_field_name("name")?;
            }
            "function_declarator" => {
                innermost = Some("function_declarator");
                node = node.child_by_field_name("declarator")?;
            }
            "init_declarator" => {
                node = node.child_by_field_name("declarator")?;
            }
            _ if OBJECT_DECLARATORS.contains(&kind) => {
                innermost = Some("object");
                node = match node.child_by_field_name("declarator") {
                    Some(inner) => inner,
                    None => first_declarator_child(node)?,
                };
            }
            _ if TRANSPARENT_DECLARATORS.contains(&kind) => {
                node = first_declarator_child(node)?;
            }
            _ => return None,
        }
    }
}

fn named(name: String, innermost: Option<&str>) -> ResolvedName {
    ResolvedName {
        name,
        is_function: innermost == Some("function_declarator"),
    }
}

/// First named child that is part of the declarator chain, skipping
/// qualifiers, attributes and calling-convention modifiers.
fn first_declarator_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let child = node.named_children(&mut cursor).find(|child| {
        !matches!(
            child.kind(),
            "type_qualifier" | "attribute_declaration" | "attribute_specifier" | "ms_call_modifier"
                | "ms_pointer_modifier" | "ms_based_modifier" | "comment"
        )
    });
    child
}

/// `operator +` -> `operator+`, `operator  new [ ]` -> `operator new[]`.
fn operator_name(text: &str) -> String {
    let rest = text.trim_start_matches("operator");
    let compact: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
    let starts_with_word = compact
        .chars()
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false);
    if starts_with_word {
        // Keep the space after `operator` and between words (`operator co_await`).
        let words: Vec<&str> = rest.split_whitespace().collect();
        let mut name = String::from("operator ");
        name.push_str(&words.join(" ").replace(" [", "[").replace("[ ", "[").replace(" ]", "]"));
        name
    } else {
        format!("operator{}", compact)
    }
}

/// `operator int()` -> `operator int`, `operator const char*()` -> `operator const char *`.
///
/// Everything up to the parameter list is the converted-to type, including
/// pointer and reference declarators.
fn conversion_name(node: Node, tu: &TranslationUnit) -> String {
    let end = parameter_list(node)
        .map(|parameters| parameters.start_byte())
        .unwrap_or_else(|| node.end_byte());
    let text = tu
        .source()
        .get(node.start_byte()..end)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .unwrap_or("");
    render_conversion(text)
}

/// Parameter list of an `operator_cast`, wherever its abstract declarator nests it.
fn parameter_list(node: Node) -> Option<Node> {
    let mut pending = vec![node.child_by_field_name("declarator")?];
    while let Some(current) = pending.pop() {
        if current.kind() == "parameter_list" {
            return Some(current);
        }
        let mut cursor = current.walk();
        pending.extend(current.named_children(&mut cursor));
    }
    None
}

/// Collapse whitespace and space pointer/reference marks the way type names print:
/// `int*` -> `int *`, `char * *` -> `char **`, `int * const` -> `int *const`.
fn render_conversion(text: &str) -> String {
    let mut name = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        let after_mark = name.ends_with(['*', '&']);
        if c == '*' || c == '&' {
            if !name.is_empty() && !after_mark {
                name.push(' ');
            }
        } else if pending_space && !name.is_empty() && !after_mark {
            name.push(' ');
        }
        name.push(c);
        pending_space = false;
    }
    name
}
