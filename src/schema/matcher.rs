//! Sub-schema matching and validation.
//!
//! `validate` walks a node tree against a schema. Every (node, schema) pair
//! it visits is recorded as a `SchemaMatch` when the node covers the focus
//! offset; schema violations are collected as `Problem`s. For `anyOf` and
//! `oneOf` the best alternative wins, equally good ones are merged, and the
//! order in which matches are produced is the only priority between them.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::{AdditionalProperties, Items, ResolvedSchema, SchemaNode};
use crate::yaml::{Document, NodeId, NodeKind, NodeType};

/// One schema applicable to one node.
#[derive(Debug, Clone, Copy)]
pub struct SchemaMatch<'s> {
    pub schema: &'s SchemaNode,
    pub node: NodeId,
    /// Set for matches found under a `not` branch.
    pub inverted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    Type,
    Enum,
    Required,
    AdditionalProperty,
    Pattern,
    Length,
    Range,
    ItemCount,
    Not,
    OneOf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub kind: ProblemKind,
    pub message: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Default)]
struct Outcome {
    problems: Vec<Problem>,
    properties_matches: usize,
    properties_value_matches: usize,
    enum_value_match: bool,
}

impl Outcome {
    fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    fn merge(&mut self, other: Outcome) {
        self.problems.extend(other.problems);
    }

    fn merge_property_match(&mut self, other: Outcome) {
        let value_match =
            other.enum_value_match || (!other.has_problems() && other.properties_matches > 0);
        self.merge(other);
        self.properties_matches += 1;
        if value_match {
            self.properties_value_matches += 1;
        }
    }

    /// Greater is a better match.
    fn compare(&self, other: &Outcome) -> Ordering {
        other
            .has_problems()
            .cmp(&self.has_problems())
            .then(self.enum_value_match.cmp(&other.enum_value_match))
            .then(self.properties_value_matches.cmp(&other.properties_value_matches))
            .then(self.properties_matches.cmp(&other.properties_matches))
    }
}

struct Collector<'s> {
    focus: Option<usize>,
    matches: Vec<SchemaMatch<'s>>,
}

impl<'s> Collector<'s> {
    fn new(focus: Option<usize>) -> Self {
        Self {
            focus,
            matches: Vec::new(),
        }
    }

    fn sub(&self) -> Self {
        Self::new(self.focus)
    }

    fn add(&mut self, doc: &Document, entry: SchemaMatch<'s>) {
        let node = doc.node(entry.node);
        let covered = self
            .focus
            .map_or(true, |offset| node.start <= offset && offset <= node.end);
        if covered {
            self.matches.push(entry);
        }
    }

    fn merge(&mut self, other: Collector<'s>) {
        self.matches.extend(other.matches);
    }
}

impl Document {
    /// Schemas applicable to the nodes covering `focus_offset`, in the
    /// order the matcher produces them.
    pub fn matching_schemas<'s>(&self, schema: &'s ResolvedSchema, focus_offset: usize) -> Vec<SchemaMatch<'s>> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        let mut collector = Collector::new(Some(focus_offset));
        let mut outcome = Outcome::default();
        Validator::new(self, schema).validate(root, &schema.schema, &mut outcome, &mut collector);
        collector.matches
    }

    /// Every schema violation in this document.
    pub fn validate_schema(&self, schema: &ResolvedSchema) -> Vec<Problem> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        let mut collector = Collector::new(None);
        let mut outcome = Outcome::default();
        Validator::new(self, schema).validate(root, &schema.schema, &mut outcome, &mut collector);
        outcome.problems
    }
}

struct Validator<'d, 's> {
    doc: &'d Document,
    root: &'s ResolvedSchema,
    /// (node, schema) pairs on the current recursion path.
    active: RefCell<Vec<(NodeId, &'s SchemaNode)>>,
}

impl<'d, 's> Validator<'d, 's> {
    fn new(doc: &'d Document, root: &'s ResolvedSchema) -> Self {
        Self {
            doc,
            root,
            active: RefCell::new(Vec::new()),
        }
    }

    fn validate(&self, node: NodeId, schema: &'s SchemaNode, outcome: &mut Outcome, collector: &mut Collector<'s>) {
        if let Some((_, value)) = self.doc.property(node) {
            if let Some(value) = value {
                self.validate(value, schema, outcome, collector);
            }
            return;
        }
        let Some(schema) = self.root.resolve(schema) else {
            warn!(reference = ?schema.reference, "unresolved $ref, treating as empty schema");
            return;
        };

        let cycle = self
            .active
            .borrow()
            .iter()
            .any(|(active, s)| *active == node && std::ptr::eq(*s, schema));
        if cycle {
            debug!(node = node.index(), "schema refers back to itself, skipping");
            return;
        }
        self.active.borrow_mut().push((node, schema));
        self.validate_resolved(node, schema, outcome, collector);
        self.active.borrow_mut().pop();
    }

    fn validate_resolved(&self, node: NodeId, schema: &'s SchemaNode, outcome: &mut Outcome, collector: &mut Collector<'s>) {
        self.validate_common(node, schema, outcome, collector);
        collector.add(self.doc, SchemaMatch { schema, node, inverted: false });

        match &self.doc.node(node).kind {
            NodeKind::Object { properties } => self.validate_object(node, properties, schema, outcome, collector),
            NodeKind::Array { items } => self.validate_array(node, items, schema, outcome, collector),
            NodeKind::String { value, .. } => self.validate_string(node, value, schema, outcome),
            NodeKind::Number(number) => self.validate_number(node, number, schema, outcome),
            NodeKind::Boolean(_) | NodeKind::Null | NodeKind::Property { .. } => {}
        }
    }

    fn problem(&self, node: NodeId, kind: ProblemKind, message: String) -> Problem {
        let n = self.doc.node(node);
        Problem {
            kind,
            message,
            start: n.start,
            end: n.end,
        }
    }

    fn validate_common(&self, node: NodeId, schema: &'s SchemaNode, outcome: &mut Outcome, collector: &mut Collector<'s>) {
        if let Some(types) = &schema.schema_type {
            if !types.names().iter().any(|name| self.has_type(node, name)) {
                let message = format!("Incorrect type. Expected \"{}\".", types.names().join(" | "));
                outcome.problems.push(self.problem(node, ProblemKind::Type, message));
            }
        }

        for sub in schema.all_of.iter().flatten() {
            self.validate(node, sub, outcome, collector);
        }

        if let Some(not) = &schema.not {
            let mut sub_outcome = Outcome::default();
            let mut sub_collector = collector.sub();
            self.validate(node, not, &mut sub_outcome, &mut sub_collector);
            if !sub_outcome.has_problems() {
                outcome.problems.push(self.problem(
                    node,
                    ProblemKind::Not,
                    "Matches a schema that is not allowed.".to_string(),
                ));
            }
            for entry in sub_collector.matches {
                collector.add(self.doc, SchemaMatch { inverted: !entry.inverted, ..entry });
            }
        }

        if let Some(alternatives) = &schema.any_of {
            self.validate_alternatives(node, alternatives, false, outcome, collector);
        }
        if let Some(alternatives) = &schema.one_of {
            self.validate_alternatives(node, alternatives, true, outcome, collector);
        }

        if let Some(values) = &schema.enum_values {
            let value = self.doc.value_of(node);
            outcome.enum_value_match = values.contains(&value);
            if !outcome.enum_value_match {
                let accepted: Vec<String> = values.iter().map(Value::to_string).collect();
                outcome.problems.push(self.problem(
                    node,
                    ProblemKind::Enum,
                    format!("Value is not accepted. Valid values: {}.", accepted.join(", ")),
                ));
            }
        }

        if let Some(expected) = &schema.const_value {
            outcome.enum_value_match = self.doc.value_of(node) == *expected;
            if !outcome.enum_value_match {
                outcome.problems.push(self.problem(
                    node,
                    ProblemKind::Enum,
                    format!("Value must be {expected}."),
                ));
            }
        }
    }

    fn validate_alternatives(
        &self,
        node: NodeId,
        alternatives: &'s [SchemaNode],
        exclusive: bool,
        outcome: &mut Outcome,
        collector: &mut Collector<'s>,
    ) {
        let mut best: Option<(Outcome, Collector<'s>)> = None;
        let mut valid = 0;

        for alternative in alternatives {
            let mut sub_outcome = Outcome::default();
            let mut sub_collector = collector.sub();
            self.validate(node, alternative, &mut sub_outcome, &mut sub_collector);
            if !sub_outcome.has_problems() {
                valid += 1;
            }

            best = Some(match best {
                None => (sub_outcome, sub_collector),
                Some((mut best_outcome, mut best_collector)) => {
                    if !exclusive && !sub_outcome.has_problems() && !best_outcome.has_problems() {
                        best_collector.merge(sub_collector);
                        best_outcome.properties_matches += sub_outcome.properties_matches;
                        best_outcome.properties_value_matches += sub_outcome.properties_value_matches;
                        (best_outcome, best_collector)
                    } else {
                        match sub_outcome.compare(&best_outcome) {
                            Ordering::Greater => (sub_outcome, sub_collector),
                            Ordering::Equal => {
                                best_collector.merge(sub_collector);
                                best_outcome.enum_value_match |= sub_outcome.enum_value_match;
                                (best_outcome, best_collector)
                            }
                            Ordering::Less => (best_outcome, best_collector),
                        }
                    }
                }
            });
        }

        if exclusive && valid > 1 {
            outcome.problems.push(self.problem(
                node,
                ProblemKind::OneOf,
                "Matches multiple schemas when only one must validate.".to_string(),
            ));
        }
        if let Some((best_outcome, best_collector)) = best {
            outcome.properties_matches += best_outcome.properties_matches;
            outcome.properties_value_matches += best_outcome.properties_value_matches;
            outcome.enum_value_match |= best_outcome.enum_value_match;
            outcome.merge(best_outcome);
            collector.merge(best_collector);
        }
    }

    fn validate_object(
        &self,
        node: NodeId,
        properties: &[NodeId],
        schema: &'s SchemaNode,
        outcome: &mut Outcome,
        collector: &mut Collector<'s>,
    ) {
        // Last duplicate wins, as in a decoded value.
        let mut seen: BTreeMap<&str, (NodeId, Option<NodeId>)> = BTreeMap::new();
        for property in properties {
            if let Some((key, value)) = self.doc.property(*property) {
                if let Some(name) = self.doc.string_value(key) {
                    seen.insert(name, (key, value));
                }
            }
        }

        for name in schema.required.iter().flatten() {
            if !seen.contains_key(name.as_str()) {
                let n = self.doc.node(node);
                outcome.problems.push(Problem {
                    kind: ProblemKind::Required,
                    message: format!("Missing property \"{name}\"."),
                    start: n.start,
                    end: (n.start + 1).min(n.end),
                });
            }
        }

        let mut unprocessed: Vec<&str> = seen.keys().copied().collect();

        for (name, property_schema) in schema.properties.iter().flatten() {
            let Some((_, value)) = seen.get(name.as_str()) else {
                continue;
            };
            unprocessed.retain(|key| *key != name.as_str());
            if let Some(value) = value {
                let mut sub = Outcome::default();
                self.validate(*value, property_schema, &mut sub, collector);
                outcome.merge_property_match(sub);
            }
        }

        for (pattern, property_schema) in schema.pattern_properties.iter().flatten() {
            let regex = match Regex::new(pattern) {
                Ok(regex) => regex,
                Err(e) => {
                    warn!("invalid patternProperties regex '{pattern}': {e}");
                    continue;
                }
            };
            for name in unprocessed.clone() {
                if !regex.is_match(name) {
                    continue;
                }
                unprocessed.retain(|key| *key != name);
                if let Some((_, Some(value))) = seen.get(name) {
                    let mut sub = Outcome::default();
                    self.validate(*value, property_schema, &mut sub, collector);
                    outcome.merge_property_match(sub);
                }
            }
        }

        match &schema.additional_properties {
            Some(AdditionalProperties::Schema(additional)) => {
                for name in &unprocessed {
                    if let Some((_, Some(value))) = seen.get(name) {
                        let mut sub = Outcome::default();
                        self.validate(*value, additional, &mut sub, collector);
                        outcome.merge_property_match(sub);
                    }
                }
            }
            Some(AdditionalProperties::Allowed(false)) => {
                for name in &unprocessed {
                    if let Some((key, _)) = seen.get(name) {
                        outcome.problems.push(self.problem(
                            *key,
                            ProblemKind::AdditionalProperty,
                            format!("Property {name} is not allowed."),
                        ));
                    }
                }
            }
            Some(AdditionalProperties::Allowed(true)) | None => {}
        }
    }

    fn validate_array(
        &self,
        node: NodeId,
        items: &[NodeId],
        schema: &'s SchemaNode,
        outcome: &mut Outcome,
        collector: &mut Collector<'s>,
    ) {
        match &schema.items {
            Some(Items::Single(item_schema)) => {
                for item in items {
                    let mut sub = Outcome::default();
                    self.validate(*item, item_schema, &mut sub, collector);
                    outcome.merge_property_match(sub);
                }
            }
            Some(Items::Tuple(item_schemas)) => {
                for (item, item_schema) in items.iter().zip(item_schemas) {
                    let mut sub = Outcome::default();
                    self.validate(*item, item_schema, &mut sub, collector);
                    outcome.merge_property_match(sub);
                }
            }
            None => {}
        }

        if let Some(min) = schema.min_items {
            if items.len() < min {
                outcome.problems.push(self.problem(
                    node,
                    ProblemKind::ItemCount,
                    format!("Array has too few items. Expected {min} or more."),
                ));
            }
        }
        if let Some(max) = schema.max_items {
            if items.len() > max {
                outcome.problems.push(self.problem(
                    node,
                    ProblemKind::ItemCount,
                    format!("Array has too many items. Expected {max} or fewer."),
                ));
            }
        }
    }

    fn validate_string(&self, node: NodeId, value: &str, schema: &SchemaNode, outcome: &mut Outcome) {
        let length = value.chars().count();
        if let Some(min) = schema.min_length {
            if length < min {
                outcome.problems.push(self.problem(
                    node,
                    ProblemKind::Length,
                    format!("String is shorter than the minimum length of {min}."),
                ));
            }
        }
        if let Some(max) = schema.max_length {
            if length > max {
                outcome.problems.push(self.problem(
                    node,
                    ProblemKind::Length,
                    format!("String is longer than the maximum length of {max}."),
                ));
            }
        }
        if let Some(pattern) = &schema.pattern {
            match Regex::new(pattern) {
                Ok(regex) if !regex.is_match(value) => {
                    outcome.problems.push(self.problem(
                        node,
                        ProblemKind::Pattern,
                        format!("String does not match the pattern of \"{pattern}\"."),
                    ));
                }
                Ok(_) => {}
                Err(e) => warn!("invalid pattern regex '{pattern}': {e}"),
            }
        }
    }

    fn validate_number(&self, node: NodeId, number: &serde_json::Number, schema: &SchemaNode, outcome: &mut Outcome) {
        let Some(value) = number.as_f64() else {
            return;
        };
        if let Some(min) = schema.minimum {
            if value < min {
                outcome.problems.push(self.problem(
                    node,
                    ProblemKind::Range,
                    format!("Value is below the minimum of {min}."),
                ));
            }
        }
        if let Some(max) = schema.maximum {
            if value > max {
                outcome.problems.push(self.problem(
                    node,
                    ProblemKind::Range,
                    format!("Value is above the maximum of {max}."),
                ));
            }
        }
    }

    fn has_type(&self, node: NodeId, name: &str) -> bool {
        let n = self.doc.node(node);
        match (name, n.node_type()) {
            ("integer", NodeType::Number) => match &n.kind {
                NodeKind::Number(number) => {
                    number.is_i64() || number.is_u64() || number.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                _ => false,
            },
            (name, node_type) => name == node_type.as_str(),
        }
    }
}
