use std::collections::HashMap;

use apollo_parser::cst;
use apollo_parser::cst::CstNode;

use super::SpecError;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// An argument or directive value as written in the document.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum InputValue {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Enum(String),
    List(Vec<InputValue>),
    Object(Vec<(String, InputValue)>),
    Variable(String),
}

impl InputValue {
    pub(crate) fn from_cst(value: cst::Value) -> Result<Self, SpecError> {
        Ok(match value {
            cst::Value::Variable(variable) => InputValue::Variable(name_of(variable.name())?),
            cst::Value::StringValue(string) => InputValue::String(String::from(string)),
            cst::Value::FloatValue(float) => {
                let text = float.syntax().to_string();
                InputValue::Float(text.trim().parse().map_err(|_| {
                    SpecError::ParsingError(format!("invalid float value {}", text.trim()))
                })?)
            }
            cst::Value::IntValue(int) => {
                let text = int.syntax().to_string();
                InputValue::Int(text.trim().parse().map_err(|_| {
                    SpecError::ParsingError(format!(
                        "Int cannot represent non 64-bit signed integer value {}",
                        text.trim()
                    ))
                })?)
            }
            cst::Value::BooleanValue(boolean) => {
                InputValue::Boolean(boolean.true_token().is_some())
            }
            cst::Value::NullValue(_) => InputValue::Null,
            cst::Value::EnumValue(value) => InputValue::Enum(name_of(value.name())?),
            cst::Value::ListValue(list) => InputValue::List(
                list.values()
                    .map(InputValue::from_cst)
                    .collect::<Result<_, _>>()?,
            ),
            cst::Value::ObjectValue(object) => InputValue::Object(
                object
                    .object_fields()
                    .map(|field| {
                        let name = name_of(field.name())?;
                        let value = field
                            .value()
                            .ok_or_else(|| missing("object field value"))
                            .and_then(InputValue::from_cst)?;
                        Ok((name, value))
                    })
                    .collect::<Result<_, SpecError>>()?,
            ),
        })
    }

    /// Substitutes variables, returning `None` when the value is an unset
    /// variable without a default.
    pub(crate) fn resolve(&self, variables: &Variables<'_>) -> Option<Value> {
        Some(match self {
            InputValue::Null => Value::Null,
            InputValue::Int(int) => Value::from(*int),
            InputValue::Float(float) => serde_json::Number::from_f64(*float)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            InputValue::String(string) => Value::from(string.as_str()),
            InputValue::Boolean(boolean) => Value::Bool(*boolean),
            InputValue::Enum(name) => Value::from(name.as_str()),
            InputValue::List(values) => Value::Array(
                values
                    .iter()
                    .map(|value| value.resolve(variables).unwrap_or(Value::Null))
                    .collect(),
            ),
            InputValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .filter_map(|(name, value)| {
                        value
                            .resolve(variables)
                            .map(|value| (name.as_str().into(), value))
                    })
                    .collect(),
            ),
            InputValue::Variable(name) => return variables.get(name),
        })
    }
}

/// Variable values of one request, with the defaults of the operation.
pub(crate) struct Variables<'a> {
    pub(crate) values: &'a Object,
    pub(crate) defaults: &'a HashMap<String, InputValue>,
}

impl Variables<'_> {
    fn get(&self, name: &str) -> Option<Value> {
        match self.values.get(name) {
            Some(value) => Some(value.clone()),
            None => self
                .defaults
                .get(name)
                .and_then(|default| default.resolve(&Variables {
                    values: &Object::new(),
                    defaults: &HashMap::new(),
                })),
        }
    }

    /// Resolves a list of arguments into an object, leaving out unset variables.
    pub(crate) fn arguments(&self, arguments: &[(String, InputValue)]) -> Object {
        arguments
            .iter()
            .filter_map(|(name, value)| {
                value
                    .resolve(self)
                    .map(|value| (name.as_str().into(), value))
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Directive {
    pub(crate) name: String,
    pub(crate) arguments: Vec<(String, InputValue)>,
}

impl Directive {
    fn from_cst(directives: Option<cst::Directives>) -> Result<Vec<Self>, SpecError> {
        directives
            .into_iter()
            .flat_map(|directives| directives.directives())
            .map(|directive| {
                Ok(Directive {
                    name: name_of(directive.name())?,
                    arguments: arguments_from_cst(directive.arguments())?,
                })
            })
            .collect()
    }
}

/// Whether `@skip` and `@include` keep the annotated selection.
pub(crate) fn is_included(directives: &[Directive], variables: &Variables<'_>) -> bool {
    directives.iter().all(|directive| {
        let condition = directive
            .arguments
            .iter()
            .find(|(name, _)| name == "if")
            .and_then(|(_, value)| value.resolve(variables));
        match (directive.name.as_str(), condition) {
            ("skip", Some(Value::Bool(true))) => false,
            ("include", Some(Value::Bool(false))) => false,
            _ => true,
        }
    })
}

/// A selection as written in the document, before fragments are expanded.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Selection {
    Field {
        name: String,
        alias: Option<String>,
        arguments: Vec<(String, InputValue)>,
        directives: Vec<Directive>,
        selection_set: Vec<Selection>,
    },
    FragmentSpread {
        name: String,
        directives: Vec<Directive>,
    },
    InlineFragment {
        type_condition: Option<String>,
        directives: Vec<Directive>,
        selection_set: Vec<Selection>,
    },
}

impl Selection {
    pub(crate) fn from_cst(selection: cst::Selection) -> Result<Self, SpecError> {
        Ok(match selection {
            cst::Selection::Field(field) => Selection::Field {
                name: name_of(field.name())?,
                alias: field
                    .alias()
                    .map(|alias| name_of(alias.name()))
                    .transpose()?,
                arguments: arguments_from_cst(field.arguments())?,
                directives: Directive::from_cst(field.directives())?,
                selection_set: selection_set_from_cst(field.selection_set())?,
            },
            cst::Selection::FragmentSpread(spread) => Selection::FragmentSpread {
                name: spread
                    .fragment_name()
                    .ok_or_else(|| missing("fragment name"))
                    .and_then(|fragment_name| name_of(fragment_name.name()))?,
                directives: Directive::from_cst(spread.directives())?,
            },
            cst::Selection::InlineFragment(fragment) => Selection::InlineFragment {
                type_condition: fragment
                    .type_condition()
                    .map(type_condition_from_cst)
                    .transpose()?,
                directives: Directive::from_cst(fragment.directives())?,
                selection_set: selection_set_from_cst(fragment.selection_set())?,
            },
        })
    }
}

pub(crate) fn selection_set_from_cst(
    selection_set: Option<cst::SelectionSet>,
) -> Result<Vec<Selection>, SpecError> {
    selection_set
        .into_iter()
        .flat_map(|selection_set| selection_set.selections())
        .map(Selection::from_cst)
        .collect()
}

pub(crate) fn type_condition_from_cst(condition: cst::TypeCondition) -> Result<String, SpecError> {
    condition
        .named_type()
        .ok_or_else(|| missing("type condition"))
        .and_then(|named_type| name_of(named_type.name()))
}

fn arguments_from_cst(
    arguments: Option<cst::Arguments>,
) -> Result<Vec<(String, InputValue)>, SpecError> {
    arguments
        .into_iter()
        .flat_map(|arguments| arguments.arguments())
        .map(|argument| {
            let name = name_of(argument.name())?;
            let value = argument
                .value()
                .ok_or_else(|| missing("argument value"))
                .and_then(InputValue::from_cst)?;
            Ok((name, value))
        })
        .collect()
}

pub(crate) fn name_of(name: Option<cst::Name>) -> Result<String, SpecError> {
    name.map(|name| name.text().to_string())
        .ok_or_else(|| missing("name"))
}

fn missing(what: &str) -> SpecError {
    SpecError::ParsingError(format!("missing {what}"))
}
