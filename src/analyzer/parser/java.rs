//! Java AST Extraction
//!
//! Walks parsed compilation units to feed the class index and call graph:
//! class/method metadata with HTTP-mapping annotations, a per-unit symbol
//! table for receiver-type resolution, and one call edge per method
//! invocation.
//!
//! Receiver resolution is heuristic by design. A qualified call `q.m()` looks
//! `q` up among declared locals, fields and parameters; a dotted qualifier
//! starting with an uppercase segment is treated as a class name. Unqualified
//! and fluent calls chain from the caller's previously recorded callee, and
//! anything else falls back to an unresolved sentinel.

use std::collections::HashMap;
use std::path::Path;

use tree_sitter::Node;

use crate::constants::{HTTP_MAPPING_ANNOTATIONS, UNKNOWN_CALLER, UNRESOLVED_BASE_TYPE};
use crate::graph::{CallGraph, ClassIndex, ClassRecord, MethodInfo};
use crate::types::Signature;

use super::ParsedAst;

/// Node kinds that introduce a type declaration
const TYPE_DECLARATION_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
];

/// Record every class declared in the unit into the index
pub fn extract_class_info(ast: &ParsedAst, file_path: &Path, index: &mut ClassIndex) {
    for class_node in nodes_of_kind(ast.root(), &["class_declaration"]) {
        let Some(class_name) = field_text(ast, class_node, "name") else {
            continue;
        };

        let mut record = ClassRecord {
            file_path: file_path.to_path_buf(),
            ..Default::default()
        };

        if let Some(body) = class_node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                if member.kind() != "method_declaration" {
                    continue;
                }
                let Some(method_name) = field_text(ast, member, "name") else {
                    continue;
                };
                record.methods.insert(
                    method_name,
                    MethodInfo {
                        requires_params: parameter_count(member) > 0,
                        has_mapping_annotation: has_mapping_annotation(ast, member),
                    },
                );
            }
        }

        index.insert(class_name, record);
    }
}

/// Append one edge per method invocation in the unit
///
/// Invocations are visited children-first so that the receiver of a fluent
/// chain is recorded before the call hanging off it.
pub fn build_call_graph(ast: &ParsedAst, graph: &mut CallGraph) {
    let symbols = variable_symbols(ast);

    for node in postorder(ast.root()) {
        if node.kind() != "method_invocation" {
            continue;
        }
        let Some(member) = field_text(ast, node, "name") else {
            continue;
        };

        let caller = enclosing_method(ast, node);
        let base_type = resolve_base_type(ast, node, &caller, &symbols, graph);
        graph.add_edge(caller, Signature::new(base_type, member));
    }
}

/// Source text of `class_name.method_name`, resolved within one unit
pub fn method_source(ast: &ParsedAst, class_name: &str, method_name: &str) -> Option<String> {
    for decl in nodes_of_kind(ast.root(), TYPE_DECLARATION_KINDS) {
        if field_text(ast, decl, "name").as_deref() != Some(class_name) {
            continue;
        }
        let Some(body) = decl.child_by_field_name("body") else {
            continue;
        };
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() == "method_declaration"
                && field_text(ast, member, "name").as_deref() == Some(method_name)
            {
                return Some(ast.text_of(member).to_string());
            }
        }
    }
    None
}

/// Declared symbol table for the unit: locals, fields and parameters,
/// generics stripped from the declared type
fn variable_symbols(ast: &ParsedAst) -> HashMap<String, String> {
    let mut symbols = HashMap::new();

    for node in nodes_of_kind(
        ast.root(),
        &[
            "local_variable_declaration",
            "field_declaration",
            "formal_parameter",
        ],
    ) {
        let Some(type_text) = field_text(ast, node, "type") else {
            continue;
        };
        let base = strip_generics(&type_text).to_string();

        if node.kind() == "formal_parameter" {
            if let Some(name) = field_text(ast, node, "name") {
                symbols.insert(name, base);
            }
            continue;
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "variable_declarator"
                && let Some(name) = field_text(ast, child, "name")
            {
                symbols.insert(name, base.clone());
            }
        }
    }

    symbols
}

/// Base type of an invocation's receiver
fn resolve_base_type(
    ast: &ParsedAst,
    node: Node<'_>,
    caller: &Signature,
    symbols: &HashMap<String, String>,
    graph: &CallGraph,
) -> String {
    match node.child_by_field_name("object") {
        // `q.m()` / `a.b.m()`: resolve the qualifier symbol, else fall back
        // to its leading class-looking segment or the raw text
        Some(obj) if matches!(obj.kind(), "identifier" | "field_access") => {
            let qualifier = ast.text_of(obj).to_string();
            let fallback = leading_class_segment(&qualifier);
            let base = symbols
                .get(&qualifier)
                .map(String::as_str)
                .unwrap_or(fallback);
            strip_generics(base).to_string()
        }
        // `new Foo().m()`: the creation names the class
        Some(obj) if obj.kind() == "object_creation_expression" => field_text(ast, obj, "type")
            .map(|t| strip_generics(&t).to_string())
            .unwrap_or_else(|| UNRESOLVED_BASE_TYPE.to_string()),
        // Unqualified or fluent: chain from the caller's last recorded callee
        _ => graph
            .last_callee_of(caller)
            .map(|callee| callee.class_name().to_string())
            .unwrap_or_else(|| UNRESOLVED_BASE_TYPE.to_string()),
    }
}

/// `Class:method` of the nearest enclosing method declaration
fn enclosing_method(ast: &ParsedAst, node: Node<'_>) -> Signature {
    let mut current = node.parent();
    while let Some(n) = current {
        if n.kind() == "method_declaration" {
            let method = field_text(ast, n, "name").unwrap_or_else(|| "unknown".to_string());
            let class_name = enclosing_type_name(ast, n).unwrap_or_else(|| "unknown".to_string());
            return Signature::new(class_name, method);
        }
        current = n.parent();
    }
    let (class_name, method) = UNKNOWN_CALLER.split_once(':').unwrap_or(("unknown", "unknown"));
    Signature::new(class_name, method)
}

/// Name of the nearest enclosing class/interface/enum declaration
fn enclosing_type_name(ast: &ParsedAst, node: Node<'_>) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if TYPE_DECLARATION_KINDS.contains(&n.kind()) {
            return field_text(ast, n, "name");
        }
        current = n.parent();
    }
    None
}

fn has_mapping_annotation(ast: &ParsedAst, method: Node<'_>) -> bool {
    let mut cursor = method.walk();
    for child in method.children(&mut cursor) {
        if child.kind() != "modifiers" {
            continue;
        }
        let mut inner = child.walk();
        for modifier in child.children(&mut inner) {
            if !matches!(modifier.kind(), "annotation" | "marker_annotation") {
                continue;
            }
            if let Some(name) = field_text(ast, modifier, "name") {
                let name = name.trim_start_matches('@');
                if HTTP_MAPPING_ANNOTATIONS.contains(&name) {
                    return true;
                }
            }
        }
    }
    false
}

fn parameter_count(method: Node<'_>) -> usize {
    method
        .child_by_field_name("parameters")
        .map(|params| params.named_child_count())
        .unwrap_or(0)
}

/// For a dotted qualifier whose first segment looks like a class, return that
/// segment; otherwise the full qualifier
fn leading_class_segment(qualifier: &str) -> &str {
    if let Some((head, _)) = qualifier.split_once('.')
        && head.chars().next().is_some_and(|c| c.is_uppercase())
    {
        head
    } else {
        qualifier
    }
}

fn strip_generics(type_text: &str) -> &str {
    type_text.split('<').next().unwrap_or(type_text)
}

fn field_text(ast: &ParsedAst, node: Node<'_>, field: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| ast.text_of(n).to_string())
}

/// All descendants of `root` (root included) whose kind is in `kinds`, in
/// document order
fn nodes_of_kind<'t>(root: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if kinds.contains(&node.kind()) {
            found.push(node);
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    found
}

/// All descendants in post-order (children before parents)
fn postorder(root: Node<'_>) -> Vec<Node<'_>> {
    let mut ordered = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        ordered.push(node);
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    ordered.reverse();
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParsedAst {
        ParsedAst::parse(source.to_string()).unwrap()
    }

    #[test]
    fn test_class_info_params_and_mapping() {
        let ast = parse(
            r#"
            class UserController {
                @GetMapping("/u")
                public String list(String q) { return q; }
                public void refresh() {}
            }
            "#,
        );
        let mut index = ClassIndex::new();
        extract_class_info(&ast, Path::new("UserController.java"), &mut index);

        assert!(index.is_entry_point(&Signature::new("UserController", "list")));
        assert!(!index.is_entry_point(&Signature::new("UserController", "refresh")));
        assert!(index.is_has_parameters(&Signature::new("UserController", "list")));
        assert!(!index.is_has_parameters(&Signature::new("UserController", "refresh")));
    }

    #[test]
    fn test_marker_annotation_recognized() {
        let ast = parse(
            r#"
            class Api {
                @POST
                public void submit(String body) {}
            }
            "#,
        );
        let mut index = ClassIndex::new();
        extract_class_info(&ast, Path::new("Api.java"), &mut index);
        assert!(index.is_entry_point(&Signature::new("Api", "submit")));
    }

    #[test]
    fn test_call_graph_field_receiver() {
        let ast = parse(
            r#"
            class A {
                Svc svc;
                public String h(String p) { svc.q(p); return p; }
            }
            "#,
        );
        let mut graph = CallGraph::new();
        build_call_graph(&ast, &mut graph);

        let callees = graph.callees_of(&Signature::new("A", "h"));
        assert_eq!(callees, &[Signature::new("Svc", "q")]);
    }

    #[test]
    fn test_call_graph_local_and_param_receivers() {
        let ast = parse(
            r#"
            class A {
                public void h(Request req) {
                    Helper helper = new Helper();
                    helper.run(req.body());
                }
            }
            "#,
        );
        let mut graph = CallGraph::new();
        build_call_graph(&ast, &mut graph);

        let callees = graph.callees_of(&Signature::new("A", "h"));
        assert!(callees.contains(&Signature::new("Helper", "run")));
        assert!(callees.contains(&Signature::new("Request", "body")));
    }

    #[test]
    fn test_call_graph_uppercase_dotted_qualifier() {
        let ast = parse(
            r#"
            class A {
                public void h(String s) { System.out.println(s); }
            }
            "#,
        );
        let mut graph = CallGraph::new();
        build_call_graph(&ast, &mut graph);

        let callees = graph.callees_of(&Signature::new("A", "h"));
        assert_eq!(callees, &[Signature::new("System", "println")]);
    }

    #[test]
    fn test_call_graph_object_creation_receiver() {
        let ast = parse(
            r#"
            class A {
                public void h(String s) { new Runner().go(s); }
            }
            "#,
        );
        let mut graph = CallGraph::new();
        build_call_graph(&ast, &mut graph);

        let callees = graph.callees_of(&Signature::new("A", "h"));
        assert_eq!(callees, &[Signature::new("Runner", "go")]);
    }

    #[test]
    fn test_call_graph_fluent_chain_uses_previous_callee() {
        let ast = parse(
            r#"
            class A {
                Svc svc;
                public void h(String s) { svc.find(s).render(); }
            }
            "#,
        );
        let mut graph = CallGraph::new();
        build_call_graph(&ast, &mut graph);

        let callees = graph.callees_of(&Signature::new("A", "h"));
        assert_eq!(callees[0], Signature::new("Svc", "find"));
        assert_eq!(callees[1], Signature::new("Svc", "render"));
    }

    #[test]
    fn test_generics_stripped_from_receiver_type() {
        let ast = parse(
            r#"
            class A {
                public void h(String s) {
                    List<String> names = build(s);
                    names.clear();
                }
            }
            "#,
        );
        let mut graph = CallGraph::new();
        build_call_graph(&ast, &mut graph);

        let callees = graph.callees_of(&Signature::new("A", "h"));
        assert!(callees.contains(&Signature::new("List", "clear")));
    }

    #[test]
    fn test_invocation_outside_method_is_unknown_caller() {
        let ast = parse(
            r#"
            class A {
                static { Config.init(); }
            }
            "#,
        );
        let mut graph = CallGraph::new();
        build_call_graph(&ast, &mut graph);

        let unknown = Signature::parse(UNKNOWN_CALLER).unwrap();
        assert_eq!(graph.callees_of(&unknown), &[Signature::new("Config", "init")]);
    }

    #[test]
    fn test_method_source_extraction() {
        let ast = parse(
            r#"
            class Svc {
                public void q(String s) {
                    stmt.executeQuery("select * from t where x=" + s);
                }
            }
            "#,
        );
        let source = method_source(&ast, "Svc", "q").unwrap();
        assert!(source.contains("executeQuery"));
        assert!(method_source(&ast, "Svc", "missing").is_none());
        assert!(method_source(&ast, "Other", "q").is_none());
    }
}
