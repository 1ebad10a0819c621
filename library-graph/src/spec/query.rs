//! Query parsing and normalization.

use std::collections::HashMap;
use std::collections::HashSet;

use apollo_parser::cst;

use super::MAX_FIELDS;
use super::PARSER_RECURSION_LIMIT;
use super::SpecError;
use super::selection::Directive;
use super::selection::InputValue;
use super::selection::Selection;
use super::selection::Variables;
use super::selection::is_included;
use super::selection::name_of;
use super::selection::selection_set_from_cst;
use super::selection::type_condition_from_cst;
use crate::execution;
use crate::json_ext::Object;
use crate::schema::FieldKind;
use crate::schema::TypeGraph;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Operation {
    pub(crate) name: Option<String>,
    pub(crate) kind: OperationKind,
    variable_defaults: HashMap<String, InputValue>,
    selection_set: Vec<Selection>,
}

impl Operation {
    fn from_cst(operation: cst::OperationDefinition) -> Result<Self, SpecError> {
        let name = operation.name().map(|name| name.text().to_string());
        let kind = match operation.operation_type() {
            Some(ty) if ty.mutation_token().is_some() => OperationKind::Mutation,
            Some(ty) if ty.subscription_token().is_some() => OperationKind::Subscription,
            _ => OperationKind::Query,
        };

        let mut variable_defaults = HashMap::new();
        for definition in operation
            .variable_definitions()
            .into_iter()
            .flat_map(|definitions| definitions.variable_definitions())
        {
            let Some(default_value) = definition.default_value().and_then(|default| default.value())
            else {
                continue;
            };
            let variable = definition
                .variable()
                .ok_or_else(|| SpecError::ParsingError("missing variable name".to_string()))?;
            variable_defaults.insert(
                name_of(variable.name())?,
                InputValue::from_cst(default_value)?,
            );
        }

        Ok(Operation {
            name,
            kind,
            variable_defaults,
            selection_set: selection_set_from_cst(operation.selection_set())?,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Fragment {
    type_condition: String,
    selection_set: Vec<Selection>,
}

/// A parsed GraphQL document.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    operations: Vec<Operation>,
    fragments: HashMap<String, Fragment>,
}

impl Query {
    pub fn parse(query: &str) -> Result<Self, SpecError> {
        let parser = apollo_parser::Parser::new(query).recursion_limit(PARSER_RECURSION_LIMIT);
        let tree = parser.parse();

        let errors = tree
            .errors()
            .map(|err| format!("{} at index {}", err.message(), err.index()))
            .collect::<Vec<_>>();

        if !errors.is_empty() {
            let errors = errors.join(", ");
            tracing::debug!("parsing error(s): {}", errors);
            return Err(SpecError::ParsingError(errors));
        }

        let document = tree.document();
        let mut operations = Vec::new();
        let mut fragments = HashMap::new();
        for definition in document.definitions() {
            match definition {
                cst::Definition::OperationDefinition(operation) => {
                    operations.push(Operation::from_cst(operation)?);
                }
                cst::Definition::FragmentDefinition(fragment) => {
                    let name = fragment
                        .fragment_name()
                        .ok_or_else(|| SpecError::ParsingError("missing fragment name".into()))
                        .and_then(|fragment_name| name_of(fragment_name.name()))?;
                    let type_condition = fragment
                        .type_condition()
                        .ok_or_else(|| SpecError::ParsingError("missing type condition".into()))
                        .and_then(type_condition_from_cst)?;
                    fragments.insert(
                        name,
                        Fragment {
                            type_condition,
                            selection_set: selection_set_from_cst(fragment.selection_set())?,
                        },
                    );
                }
                _ => {
                    return Err(SpecError::ParsingError(
                        "only operations and fragments may be defined in a query document"
                            .to_string(),
                    ));
                }
            }
        }

        Ok(Query {
            operations,
            fragments,
        })
    }

    /// Picks the operation to run.
    pub(crate) fn operation(&self, operation_name: Option<&str>) -> Result<&Operation, SpecError> {
        let operation = match operation_name {
            Some(name) => self
                .operations
                .iter()
                .find(|operation| operation.name.as_deref() == Some(name))
                .ok_or_else(|| SpecError::UnknownOperation(name.to_string()))?,
            None => match self.operations.as_slice() {
                [operation] => operation,
                [] => return Err(SpecError::NoOperation),
                _ => return Err(SpecError::MissingOperationName),
            },
        };

        match operation.kind {
            OperationKind::Query => Ok(operation),
            OperationKind::Mutation => Err(SpecError::MutationNotSupported),
            OperationKind::Subscription => Err(SpecError::SubscriptionNotSupported),
        }
    }

    /// Expands fragments, substitutes variables and merges fields sharing a
    /// response key, yielding one execution request per root field.
    pub fn to_requests(
        &self,
        operation_name: Option<&str>,
        variables: &Object,
        graph: &TypeGraph,
    ) -> Result<Vec<execution::Request>, SpecError> {
        let operation = self.operation(operation_name)?;
        self.check_fragment_cycles()?;

        let mut normalizer = Normalizer {
            query: self,
            graph,
            variables: Variables {
                values: variables,
                defaults: &operation.variable_defaults,
            },
            fields: 0,
        };
        let root =
            normalizer.selection_set(&[operation.selection_set.as_slice()], Some(graph.root().name))?;
        Ok(root.into_iter().map(execution::Request::from).collect())
    }

    /// Rejects fragments that spread themselves, directly or through others.
    fn check_fragment_cycles(&self) -> Result<(), SpecError> {
        let mut done = HashSet::new();
        for name in self.fragments.keys() {
            self.visit_fragment(name, &mut Vec::new(), &mut done)?;
        }
        Ok(())
    }

    fn visit_fragment<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<(), SpecError> {
        if path.contains(&name) {
            return Err(SpecError::FragmentCycle(name.to_string()));
        }
        if done.contains(name) {
            return Ok(());
        }
        // unknown fragments are reported where they are spread
        let Some(fragment) = self.fragments.get(name) else {
            return Ok(());
        };

        path.push(name);
        let mut spreads = Vec::new();
        fragment_spreads(&fragment.selection_set, &mut spreads);
        for spread in spreads {
            self.visit_fragment(spread, path, done)?;
        }
        path.pop();
        done.insert(name);
        Ok(())
    }
}

fn fragment_spreads<'a>(selections: &'a [Selection], out: &mut Vec<&'a str>) {
    for selection in selections {
        match selection {
            Selection::Field { selection_set, .. }
            | Selection::InlineFragment { selection_set, .. } => {
                fragment_spreads(selection_set, out)
            }
            Selection::FragmentSpread { name, .. } => out.push(name),
        }
    }
}

/// Every occurrence of one response key in a selection set.
struct FieldGroup<'a> {
    name: &'a str,
    alias: Option<&'a str>,
    arguments: Object,
    selection_sets: Vec<&'a [Selection]>,
    /// Some occurrence has no sub-selection.
    bare: bool,
}

struct Normalizer<'a> {
    query: &'a Query,
    graph: &'a TypeGraph,
    variables: Variables<'a>,
    fields: usize,
}

impl<'a> Normalizer<'a> {
    /// Normalizes the union of `selection_sets`, all applying to `parent`.
    ///
    /// `parent` is `None` below a field the type graph does not know. Unknown
    /// fields are kept so execution can report them.
    fn selection_set(
        &mut self,
        selection_sets: &[&'a [Selection]],
        parent: Option<&str>,
    ) -> Result<Vec<execution::Selection>, SpecError> {
        let mut groups = Vec::new();
        let mut expanded = HashSet::new();
        for selections in selection_sets {
            self.collect_fields(selections, parent, &mut groups, &mut expanded)?;
        }

        let mut out = Vec::with_capacity(groups.len());
        for group in groups {
            self.fields += 1;
            if self.fields > MAX_FIELDS {
                return Err(SpecError::MaxFieldsLimit(MAX_FIELDS));
            }

            let field_type = self.field_type(parent, group.name);
            // an object field selected anywhere without sub-selection is invalid
            let selection_set = if group.bare && field_type.is_some() {
                Vec::new()
            } else {
                self.selection_set(&group.selection_sets, field_type)?
            };
            out.push(execution::Selection {
                name: group.name.to_string(),
                alias: group.alias.map(str::to_string),
                arguments: group.arguments,
                selection_set,
            });
        }
        Ok(out)
    }

    /// Groups the fields of `selections` by response key, expanding each
    /// fragment at most once per selection set.
    fn collect_fields(
        &self,
        selections: &'a [Selection],
        parent: Option<&str>,
        groups: &mut Vec<FieldGroup<'a>>,
        expanded: &mut HashSet<&'a str>,
    ) -> Result<(), SpecError> {
        for selection in selections {
            match selection {
                Selection::Field {
                    name,
                    alias,
                    arguments,
                    directives,
                    selection_set,
                } => {
                    if !self.included(directives) {
                        continue;
                    }
                    let arguments = self.variables.arguments(arguments);
                    let response_key = alias.as_deref().unwrap_or(name.as_str());
                    let group = groups
                        .iter_mut()
                        .find(|group| group.alias.unwrap_or(group.name) == response_key);
                    match group {
                        Some(group) => {
                            if group.name != name.as_str() || group.arguments != arguments {
                                return Err(SpecError::FieldConflict(response_key.to_string()));
                            }
                            group.bare |= selection_set.is_empty();
                            group.selection_sets.push(selection_set.as_slice());
                        }
                        None => groups.push(FieldGroup {
                            name,
                            alias: alias.as_deref(),
                            arguments,
                            selection_sets: vec![selection_set.as_slice()],
                            bare: selection_set.is_empty(),
                        }),
                    }
                }
                Selection::FragmentSpread { name, directives } => {
                    let fragment = self
                        .query
                        .fragments
                        .get(name)
                        .ok_or_else(|| SpecError::UnknownFragment(name.clone()))?;
                    if expanded.contains(name.as_str())
                        || !self.included(directives)
                        || !applies(&fragment.type_condition, parent)
                    {
                        continue;
                    }
                    expanded.insert(name);
                    self.collect_fields(&fragment.selection_set, parent, groups, expanded)?;
                }
                Selection::InlineFragment {
                    type_condition,
                    directives,
                    selection_set,
                } => {
                    let matches = type_condition
                        .as_deref()
                        .is_none_or(|condition| applies(condition, parent));
                    if self.included(directives) && matches {
                        self.collect_fields(selection_set, parent, groups, expanded)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn included(&self, directives: &[Directive]) -> bool {
        is_included(directives, &self.variables)
    }

    /// Name of the object type a field of `parent` returns.
    fn field_type(&self, parent: Option<&str>, field: &str) -> Option<&'static str> {
        let parent = parent?;
        let target = if parent == self.graph.root().name {
            self.graph.root().entry_point(field)?.target
        } else {
            match self.graph.object_type_by_name(parent)?.field(field)?.kind {
                FieldKind::Relationship(relationship) => relationship.target,
                FieldKind::Scalar(_) => return None,
            }
        };
        self.graph.object_type(target).map(|object_type| object_type.name)
    }
}

fn applies(type_condition: &str, parent: Option<&str>) -> bool {
    parent.is_none_or(|parent| parent == type_condition)
}
