//! The load pipeline.
//!
//! # Phases
//! ```text
//! 1. convert   raw pairs → converters (unknown names → unknown_parameter policy)
//! 2. defaults  declared defaults fill names still absent
//! 3. deferred  markers resolved in schema resolution order
//! 4. validate  (ConfigInstance) hook over the committed data
//! ```
//!
//! # Design Decisions
//! - Phases 1–3 stage into a fresh map; nothing reaches the instance
//!   unless all three succeed
//! - Pairs accepted by policy but unknown to the registry are kept apart
//!   from the declared data

use crate::schema::converter::Converter;
use crate::schema::deferred::{Context, Deferred};
use crate::schema::policy::{Action, Circumstance};
use crate::schema::registry::{DefaultValue, ParameterSpec, Shape};
use crate::schema::{ConfigError, Result, Schema};
use crate::value::{OrderedMap, RawData, RawValue, Value};

use super::LoadOptions;

/// A value during a load, before deferred resolution.
#[derive(Debug)]
pub(crate) enum Staged {
    Ready(Value),
    Pending(Deferred),
}

pub(crate) type Staging = OrderedMap<Staged>;

/// Output of phases 1–3.
pub(crate) struct Loaded {
    pub(crate) data: OrderedMap<Value>,
    pub(crate) extras: OrderedMap<Value>,
}

pub(crate) fn run(schema: &Schema, raw: RawData, options: LoadOptions) -> Result<Loaded> {
    let span = tracing::debug_span!("load", schema = %schema.name());
    let _enter = span.enter();

    let mut staging = Staging::new();
    let mut extras = OrderedMap::new();

    tracing::debug!(supplied = raw.len(), "Converting raw data");
    convert_phase(schema, raw, &mut staging, &mut extras)?;

    if options.compute_defaults {
        let applied = apply_defaults(schema, &mut staging);
        tracing::debug!(applied, "Applied defaults");
    }

    if options.compute_deferred {
        let resolved = resolve_deferred(schema, &mut staging)?;
        tracing::debug!(resolved, "Resolved deferred parameters");
    }

    let data = staging
        .into_iter()
        .filter_map(|(name, staged)| match staged {
            Staged::Ready(value) => Some((name, value)),
            Staged::Pending(_) => None,
        })
        .collect();

    Ok(Loaded { data, extras })
}

fn convert_phase(
    schema: &Schema,
    raw: RawData,
    staging: &mut Staging,
    extras: &mut OrderedMap<Value>,
) -> Result<()> {
    let registry = schema.registry();
    let unknown_value = schema.policy_for(Circumstance::UnknownValue);

    for (name, value) in raw {
        let spec = registry.lookup(&name);
        if let Some((spec, converter)) = spec.and_then(|s| s.converter().map(|c| (s, c))) {
            if let Some(converted) = convert(spec, converter, value, unknown_value)? {
                staging.insert(name, Staged::Ready(converted));
            }
            continue;
        }

        let accepted = match schema.policy_for(Circumstance::UnknownParameter) {
            Action::Ignore => {
                tracing::debug!(parameter = %name, "Ignoring unknown parameter");
                continue;
            }
            Action::Fail => return Err(ConfigError::UnknownParameter(name)),
            Action::Accept => value.into_value(),
            Action::Custom(f) => f(value).map_err(|source| ConfigError::from_user(&name, source))?,
        };

        // A name with only a default is still declared.
        if spec.is_some() {
            staging.insert(name, Staged::Ready(accepted));
        } else {
            tracing::debug!(parameter = %name, "Keeping undeclared parameter");
            extras.insert(name, accepted);
        }
    }
    Ok(())
}

fn convert(
    spec: &ParameterSpec,
    converter: &Converter,
    raw: RawValue,
    unknown_value: &Action,
) -> Result<Option<Value>> {
    let name = spec.name();
    match (spec.shape(), raw) {
        (Shape::Scalar, RawValue::Str(s)) => converter.convert_str(name, s, unknown_value),
        (Shape::Scalar, RawValue::Seq(seq)) => match converter {
            Converter::Identity => Ok(Some(RawValue::Seq(seq).into_value())),
            Converter::Virtual => Err(ConfigError::VirtualParameterSupplied(name.to_string())),
            _ => Err(ConfigError::ShapeMismatch {
                parameter: name.to_string(),
                expected: "single value",
            }),
        },
        (Shape::Sequence, RawValue::Seq(seq)) => converter
            .convert_seq(name, seq, unknown_value)
            .map(|seq| Some(Value::Seq(seq))),
        (Shape::Sequence, RawValue::Str(_)) => Err(ConfigError::ShapeMismatch {
            parameter: name.to_string(),
            expected: "sequence",
        }),
    }
}

fn apply_defaults(schema: &Schema, staging: &mut Staging) -> usize {
    let mut applied = 0;
    for spec in schema.registry().iter() {
        if staging.contains_key(spec.name()) {
            continue;
        }
        let staged = match spec.default_value() {
            Some(DefaultValue::Literal(value)) => Staged::Ready(value.clone()),
            Some(DefaultValue::Deferred(deferred)) => Staged::Pending(deferred.clone()),
            None => continue,
        };
        staging.insert(spec.name(), staged);
        applied += 1;
    }
    applied
}

fn resolve_deferred(schema: &Schema, staging: &mut Staging) -> Result<usize> {
    let mut resolved = 0;
    for name in schema.resolution_order() {
        let deferred = match staging.get(name) {
            Some(Staged::Pending(deferred)) => deferred.clone(),
            _ => continue,
        };
        let value = deferred
            .resolve(&Context::new(staging, name))
            .map_err(|source| ConfigError::from_user(name, source))?;
        staging.insert(name.as_str(), Staged::Ready(value));
        resolved += 1;
    }
    Ok(resolved)
}
