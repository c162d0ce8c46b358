//! Retention planning against whole kit forests
//!
//! Forests are written in pre-order as `NAME(t|f)` tokens, `t` for a kit an
//! Integration runs and `f` for an unused one. `|` closes the children of
//! the most recently opened kit.

use std::collections::BTreeSet;

use kitgc::gc::{GcPlan, ImageUsage, KitGraph, trim_all};
use kitgc::models::{
    Integration, IntegrationKit, IntegrationKitSpec, IntegrationKitStatus, IntegrationSpec,
    IntegrationStatus,
};
use kube::ResourceExt;

const NAMESPACE: &str = "camel";

fn image(name: &str) -> String {
    format!("registry.local/{}/kit-{}:1", NAMESPACE, name)
}

fn kit(name: &str, parent: Option<&str>) -> IntegrationKit {
    let mut kit = IntegrationKit::new(name, IntegrationKitSpec::default());
    kit.metadata.namespace = Some(NAMESPACE.to_string());
    kit.status = Some(IntegrationKitStatus {
        phase: "Ready".to_string(),
        image: image(name),
        base_image: parent
            .map(image)
            .unwrap_or_else(|| "quay.io/camel/base:21".to_string()),
        ..Default::default()
    });
    kit
}

fn integration(kit: &str) -> Integration {
    let mut it = Integration::new(&format!("it-{}", kit), IntegrationSpec::default());
    it.metadata.namespace = Some(NAMESPACE.to_string());
    it.status = Some(IntegrationStatus {
        phase: "Running".to_string(),
        image: image(kit),
        ..Default::default()
    });
    it
}

#[derive(Debug)]
enum Token {
    Kit { name: String, used: bool },
    Close,
}

fn tokenize(tree: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = tree.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '|' {
            tokens.push(Token::Close);
            continue;
        }
        let mut name = c.to_string();
        while let Some(&next) = chars.peek() {
            if next == '(' {
                break;
            }
            name.push(next);
            chars.next();
        }
        let marker: String = chars.by_ref().take(3).collect();
        let used = match marker.as_str() {
            "(t)" => true,
            "(f)" => false,
            other => panic!("bad usage marker {other:?} after {name}"),
        };
        tokens.push(Token::Kit { name, used });
    }
    tokens
}

struct Forest {
    kits: Vec<IntegrationKit>,
    integrations: Vec<Integration>,
}

impl Forest {
    fn parse(tree: &str) -> Self {
        let mut forest = Forest {
            kits: Vec::new(),
            integrations: Vec::new(),
        };
        let mut tokens = tokenize(tree).into_iter();
        if let Some(Token::Kit { name, used }) = tokens.next() {
            forest.add(&name, None, used);
            forest.descend(&name, &mut tokens);
        }
        forest
    }

    fn descend(&mut self, parent: &str, tokens: &mut impl Iterator<Item = Token>) {
        while let Some(Token::Kit { name, used }) = tokens.next() {
            self.add(&name, Some(parent), used);
            self.descend(&name, tokens);
        }
    }

    fn add(&mut self, name: &str, parent: Option<&str>, used: bool) {
        self.kits.push(kit(name, parent));
        if used {
            self.integrations.push(integration(name));
        }
    }

    fn usage(&self) -> ImageUsage {
        ImageUsage::analyze(&self.integrations)
    }

    fn plan(&self) -> GcPlan {
        GcPlan::with_squash(&self.kits, &self.usage()).unwrap()
    }
}

fn delete_set(plan: &GcPlan) -> BTreeSet<String> {
    plan.to_delete.iter().map(|k| k.name_any()).collect()
}

fn squash_chains(plan: &GcPlan) -> Vec<String> {
    plan.to_squash.iter().map(|c| c.names().concat()).collect()
}

fn expect(tree: &str, to_delete: &str, to_squash: &[&str]) {
    let plan = Forest::parse(tree).plan();
    let expected: BTreeSet<String> = to_delete.chars().map(String::from).collect();
    assert_eq!(delete_set(&plan), expected, "delete set of {tree:?}");
    assert_eq!(squash_chains(&plan), to_squash, "squash chains of {tree:?}");
}

#[test]
fn test_parser_follows_close_markers() {
    let forest = Forest::parse("a(f)b(t)|c(f)d(t)||");
    let parents: Vec<(String, String)> = forest
        .kits
        .iter()
        .map(|k| (k.name_any(), k.base_image().to_string()))
        .collect();
    assert_eq!(parents[1], ("b".to_string(), image("a")));
    assert_eq!(parents[2], ("c".to_string(), image("a")));
    assert_eq!(parents[3], ("d".to_string(), image("c")));
    assert_eq!(forest.integrations.len(), 2);
}

#[test]
fn test_nothing_to_do() {
    let plan = Forest::parse("").plan();
    assert!(plan.is_empty());
}

#[test]
fn test_single_used_kit() {
    expect("a(t)", "", &[]);
}

#[test]
fn test_single_unused_kit() {
    expect("a(f)", "a", &[]);
}

#[test]
fn test_basic_tree() {
    expect("a(f)b(t)", "a", &["ba"]);
}

#[test]
fn test_simple_tree_line() {
    expect("a(f)b(f)c(f)d(f)e(t)", "abcd", &["edcba"]);
}

#[test]
fn test_tree() {
    expect(
        "a(f)b(f)e(f)|f(f)k(t)|||c(t)|d(f)g(t)|h(f)|i(f)|j(t)|||",
        "befhi",
        &["kfb"],
    );
}

#[test]
fn test_two_used_roots_are_untouched() {
    let mut forest = Forest::parse("a(t)");
    forest.add("b", None, true);
    assert!(forest.plan().is_empty());
}

#[test]
fn test_shared_parent_is_kept() {
    let forest = Forest::parse("a(f)b(t)|c(t)|");
    let mut graph = KitGraph::build(&forest.kits, &forest.usage()).unwrap();
    trim_all(&mut graph);
    let a = graph.node(graph.find("a").unwrap());
    assert_eq!(a.used_by_children(), Some(2));
    assert!(a.is_used());
    assert!(forest.plan().is_empty());
}

#[test]
fn test_chain_of_three_squashes_into_leaf() {
    // Intermediate and root kits are both flattened away
    expect("a(f)b(f)c(t)", "ab", &["cba"]);
}

#[test]
fn test_orphan_is_deleted_alone() {
    let mut forest = Forest::parse("a(t)");
    forest.add("z", None, false);
    let plan = forest.plan();
    assert_eq!(delete_set(&plan), BTreeSet::from(["z".to_string()]));
    assert!(plan.to_squash.is_empty());
}

#[test]
fn test_squash_never_crosses_a_used_kit() {
    expect("a(f)b(t)c(f)d(t)", "ac", &["dc", "ba"]);
}

#[test]
fn test_structural_properties_hold() {
    let tree = "a(f)b(f)e(f)|f(f)k(t)|||c(t)|d(f)g(t)|h(f)|i(f)|j(t)|||";
    let forest = Forest::parse(tree);
    let mut graph = KitGraph::build(&forest.kits, &forest.usage()).unwrap();
    let trim = trim_all(&mut graph);

    for &root in graph.roots() {
        let order = graph.parent_before_child(root);
        for (position, &id) in order.iter().enumerate() {
            if let Some(parent) = graph.node(id).parent() {
                let parent_position = order.iter().position(|&p| p == parent).unwrap();
                assert!(parent_position < position);
            }
        }
    }

    for id in 0..graph.len() {
        let node = graph.node(id);
        assert!(node.used_by_children().is_some());
        if node.is_directly_used() {
            assert!(node.is_used());
        }
    }

    for chain in &trim.to_squash {
        assert!(graph.node(chain[0]).is_used());
        for &ancestor in &chain[1..] {
            assert!(!graph.node(ancestor).is_used());
        }
    }
}
