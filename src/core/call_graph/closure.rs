// src/core/call_graph/closure.rs
use std::collections::{BTreeSet, HashSet, VecDeque};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MemberAccessClassifier, MethodSymbol, PropertySymbol, SymbolResolver};

/// Order in which discovered methods leave the worklist.
/// Affects traversal only, never the computed closure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorklistOrder {
    #[default]
    Fifo,
    Lifo,
}

/// Discovered and resolved methods. `resolved` is always a subset of `discovered`.
struct Frontier {
    discovered: HashSet<MethodSymbol>,
    resolved: HashSet<MethodSymbol>,
    pending: VecDeque<MethodSymbol>,
}

impl Frontier {
    fn new(seed: &MethodSymbol) -> Self {
        let mut frontier = Self {
            discovered: HashSet::new(),
            resolved: HashSet::new(),
            pending: VecDeque::new(),
        };
        frontier.discover(seed.clone());
        frontier
    }

    /// Returns false when the method was already known
    fn discover(&mut self, method: MethodSymbol) -> bool {
        if self.discovered.insert(method.clone()) {
            self.pending.push_back(method);
            true
        } else {
            false
        }
    }

    /// Take an unresolved method and mark it resolved
    fn next(&mut self, order: WorklistOrder) -> Option<MethodSymbol> {
        let method = match order {
            WorklistOrder::Fifo => self.pending.pop_front(),
            WorklistOrder::Lifo => self.pending.pop_back(),
        }?;
        self.resolved.insert(method.clone());
        Some(method)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureStats {
    /// Methods taken off the worklist
    pub iterations: usize,
    /// Method bodies handed to the classifier
    pub bodies_classified: usize,
}

/// Properties and methods reachable from a seed method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureResult {
    pub properties: BTreeSet<PropertySymbol>,
    /// Every resolved method, the seed included
    pub methods: BTreeSet<MethodSymbol>,
    /// Resolved methods whose declaration is not among the loaded sources
    pub skipped: BTreeSet<MethodSymbol>,
    pub stats: ClosureStats,
}

/// Worklist-driven fixed point over the call graph of user-defined methods
pub struct ClosureBuilder<'r> {
    resolver: &'r dyn SymbolResolver,
    classifier: MemberAccessClassifier<'r>,
    order: WorklistOrder,
}

impl<'r> ClosureBuilder<'r> {
    pub fn new(resolver: &'r dyn SymbolResolver, order: WorklistOrder) -> Self {
        Self {
            resolver,
            classifier: MemberAccessClassifier::new(resolver),
            order,
        }
    }

    pub fn build_closure(&self, seed: &MethodSymbol) -> ClosureResult {
        let mut frontier = Frontier::new(seed);
        let mut result = ClosureResult::default();

        while let Some(method) = frontier.next(self.order) {
            result.stats.iterations += 1;

            let Some(body) = self.resolver.method_body(&method) else {
                debug!("No declaration found for {}, skipping", method.id);
                result.skipped.insert(method);
                continue;
            };

            let classification = self.classifier.classify(&body);
            result.stats.bodies_classified += 1;
            debug!(
                "Resolved {}: {} property reads, {} calls",
                method.id,
                classification.property_reads.len(),
                classification.method_calls.len()
            );

            result.properties.extend(classification.property_reads);
            for called in classification.method_calls {
                if frontier.discover(called.clone()) {
                    debug!("Discovered {}", called.id);
                }
            }
        }

        result.methods = frontier.resolved.into_iter().collect();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tree_sitter::Node;

    use crate::core::semantic::test_support::{method, model};
    use crate::core::semantic::{MethodBody, SemanticModel, Symbol, SymbolId, TypeKey};
    use crate::core::UnitId;

    fn full_names<T, F: Fn(&T) -> String>(items: &BTreeSet<T>, f: F) -> Vec<String> {
        let mut names: Vec<String> = items.iter().map(f).collect();
        names.sort();
        names
    }

    const SCENARIO: &[(&str, &str)] = &[
        ("FirstClass.cs", r#"
using System;

namespace SimpleProject
{
    public class FirstClass
    {
        public void DoSomething()
        {
            Console.WriteLine("FirstClass: Starting to do something...");
            SecondClass second = new SecondClass();
            Console.WriteLine($"Name: {second.Name}");
            Console.WriteLine($"Id: {second.Id}");
            string result = second.GetMessage();
            Console.WriteLine($"Received - {result}");
        }

        public void Idle()
        {
        }
    }
}
"#),
        ("SecondClass.cs", r#"
using System;

namespace SimpleProject
{
    public class SecondClass
    {
        public string Name { get; set; } = "SecondClass Instance";
        public int Id { get; set; } = 100;

        public string GetMessage()
        {
            ThirdClass third = new ThirdClass();
            string processedData = third.ProcessData();
            return "Hello from SecondClass!";
        }
    }
}
"#),
        ("ThirdClass.cs", r#"
namespace SimpleProject
{
    public class ThirdClass
    {
        public string ProcessData()
        {
            return "processed".ToUpper();
        }
    }
}
"#),
    ];

    #[test]
    fn test_scenario_closure() {
        let model = model(SCENARIO);
        let seed = method(&model, "SimpleProject.FirstClass", "DoSomething");
        let result = ClosureBuilder::new(&model, WorklistOrder::Fifo).build_closure(&seed);

        assert_eq!(full_names(&result.properties, |p| p.full_name()), vec!["SecondClass.Name"]);
        assert_eq!(
            full_names(&result.methods, |m| m.full_name()),
            vec!["FirstClass.DoSomething", "SecondClass.GetMessage", "ThirdClass.ProcessData"]
        );
        assert!(result.skipped.is_empty());
        assert_eq!(result.stats.iterations, 3);
        assert_eq!(result.stats.bodies_classified, 3);
    }

    #[test]
    fn test_empty_body_closure_is_seed_only() {
        let model = model(SCENARIO);
        let seed = method(&model, "SimpleProject.FirstClass", "Idle");
        let result = ClosureBuilder::new(&model, WorklistOrder::Fifo).build_closure(&seed);

        assert!(result.properties.is_empty());
        assert_eq!(full_names(&result.methods, |m| m.full_name()), vec!["FirstClass.Idle"]);
    }

    #[test]
    fn test_idempotent_and_order_independent() {
        let model = model(SCENARIO);
        let seed = method(&model, "SimpleProject.FirstClass", "DoSomething");

        let fifo = ClosureBuilder::new(&model, WorklistOrder::Fifo).build_closure(&seed);
        let again = ClosureBuilder::new(&model, WorklistOrder::Fifo).build_closure(&seed);
        let lifo = ClosureBuilder::new(&model, WorklistOrder::Lifo).build_closure(&seed);

        assert_eq!(fifo, again);
        assert_eq!(fifo.properties, lifo.properties);
        assert_eq!(fifo.methods, lifo.methods);
    }

    const CYCLES: &[(&str, &str)] = &[
        ("Cycle.cs", r#"
namespace Loops
{
    public class A
    {
        private B b = new B();
        public string Label { get; set; }
        public void Ping() { b.Pong(); Ping(); }
    }

    public class B
    {
        private A a = new A();
        public void Pong() { var l = a.Label; a.Ping(); }
    }
}
"#),
    ];

    #[test]
    fn test_mutual_and_self_recursion_terminate() {
        let model = model(CYCLES);
        let seed = method(&model, "Loops.A", "Ping");
        let result = ClosureBuilder::new(&model, WorklistOrder::Fifo).build_closure(&seed);

        assert_eq!(full_names(&result.methods, |m| m.full_name()), vec!["A.Ping", "B.Pong"]);
        assert_eq!(full_names(&result.properties, |p| p.full_name()), vec!["A.Label"]);
        assert_eq!(result.stats.iterations, 2);
    }

    const SHADOWING: &[(&str, &str)] = &[
        ("Host.cs", r#"
namespace N
{
    public class Widget { public string Title { get; set; } }
    public class Gadget { public string Title { get; set; } }

    public class Host
    {
        Widget w = new Widget();

        void Run()
        {
            if (true) { Gadget w = new Gadget(); }
            var s = w.Title;
        }
    }
}
"#),
    ];

    #[test]
    fn test_closed_block_local_does_not_shadow_field() {
        let model = model(SHADOWING);
        let seed = method(&model, "N.Host", "Run");
        let result = ClosureBuilder::new(&model, WorklistOrder::Fifo).build_closure(&seed);

        let ids: Vec<String> = result.properties.iter().map(|p| p.id.to_string()).collect();
        assert_eq!(ids, vec!["N.Widget.Title"]);
    }

    const EXTENSIONS_AND_NESTING: &[(&str, &str)] = &[
        ("Host.cs", r#"
namespace N
{
    public class Widget { public string Title { get; set; } }

    public static class WidgetExt
    {
        public static string Shout(this Widget w) => w.Title;
    }

    public class Host
    {
        public void Run()
        {
            var w = new Widget();
            var loud = w.Shout();
            new Outer.Inner().Run();
        }
    }

    public class Outer
    {
        public static void Helper() { }

        public class Inner
        {
            public void Run() { Helper(); }
        }
    }
}
"#),
    ];

    #[test]
    fn test_extension_and_enclosing_type_calls_are_followed() {
        let model = model(EXTENSIONS_AND_NESTING);
        let seed = method(&model, "N.Host", "Run");
        let result = ClosureBuilder::new(&model, WorklistOrder::Fifo).build_closure(&seed);

        assert_eq!(
            full_names(&result.methods, |m| m.full_name()),
            vec!["Host.Run", "Inner.Run", "Outer.Helper", "WidgetExt.Shout"]
        );
        assert_eq!(full_names(&result.properties, |p| p.full_name()), vec!["Widget.Title"]);
    }

    /// Counts body lookups and can hide one declaration
    struct CountingResolver<'a> {
        inner: &'a SemanticModel,
        hidden: Option<SymbolId>,
        lookups: RefCell<HashMap<String, usize>>,
    }

    impl SymbolResolver for CountingResolver<'_> {
        fn resolve_symbol(&self, unit: UnitId, node: Node<'_>) -> Option<Symbol> {
            self.inner.resolve_symbol(unit, node)
        }

        fn is_user_defined_type(&self, key: &TypeKey) -> bool {
            self.inner.is_user_defined_type(key)
        }

        fn is_target_type(&self, descriptor: &str) -> bool {
            self.inner.is_target_type(descriptor)
        }

        fn method_body(&self, method: &MethodSymbol) -> Option<MethodBody<'_>> {
            *self.lookups.borrow_mut().entry(method.full_name()).or_default() += 1;
            if self.hidden.as_ref() == Some(&method.id) {
                return None;
            }
            self.inner.method_body(method)
        }
    }

    const DIAMOND: &[(&str, &str)] = &[
        ("Diamond.cs", r#"
namespace Shapes
{
    public class Top
    {
        private Left left = new Left();
        private Right right = new Right();
        public void Start() { left.Go(); right.Go(); left.Go(); }
    }

    public class Left
    {
        private Bottom bottom = new Bottom();
        public void Go() { bottom.End(); }
    }

    public class Right
    {
        private Bottom bottom = new Bottom();
        public void Go() { bottom.End(); }
    }

    public class Bottom
    {
        public string Tag { get; set; }
        public void End() { var t = this.Tag; }
    }
}
"#),
    ];

    #[test]
    fn test_each_method_classified_once() {
        let model = model(DIAMOND);
        let resolver = CountingResolver { inner: &model, hidden: None, lookups: RefCell::new(HashMap::new()) };
        let seed = method(&model, "Shapes.Top", "Start");
        let result = ClosureBuilder::new(&resolver, WorklistOrder::Lifo).build_closure(&seed);

        assert_eq!(result.methods.len(), 4);
        assert_eq!(full_names(&result.properties, |p| p.full_name()), vec!["Bottom.Tag"]);
        let lookups = resolver.lookups.borrow();
        assert_eq!(lookups.len(), 4);
        assert!(lookups.values().all(|count| *count == 1));
    }

    #[test]
    fn test_missing_declaration_is_skipped_not_fatal() {
        let model = model(DIAMOND);
        let left_go = method(&model, "Shapes.Left", "Go");
        let resolver = CountingResolver {
            inner: &model,
            hidden: Some(left_go.id.clone()),
            lookups: RefCell::new(HashMap::new()),
        };
        let seed = method(&model, "Shapes.Top", "Start");
        let result = ClosureBuilder::new(&resolver, WorklistOrder::Fifo).build_closure(&seed);

        assert!(result.methods.contains(&left_go));
        assert!(result.skipped.contains(&left_go));
        // Bottom.End is still reached through Right.Go
        assert_eq!(result.methods.len(), 4);
        assert_eq!(result.stats.bodies_classified, 3);
    }
}
