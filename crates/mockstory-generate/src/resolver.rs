use chrono::{NaiveDate, NaiveDateTime};
use rand::RngCore;

use mockstory_core::{MockError, MockValue, Record};
use mockstory_schema::{FieldKind, FieldSource, ResolutionPlan};

use crate::errors::GenerationError;
use crate::generators::{GeneratorContext, GeneratorRegistry};
use crate::model::ResolutionReport;

/// Walks a resolution plan and produces one record.
///
/// Each value is stored before the next field is evaluated, so conditions
/// and derived fields only ever read values resolved earlier in the plan.
pub struct Resolver<'a> {
    registry: &'a GeneratorRegistry,
    today: NaiveDate,
    now: NaiveDateTime,
    past_days: u32,
    future_days: u32,
}

impl<'a> Resolver<'a> {
    pub fn new(
        registry: &'a GeneratorRegistry,
        today: NaiveDate,
        now: NaiveDateTime,
        past_days: u32,
        future_days: u32,
    ) -> Self {
        Self {
            registry,
            today,
            now,
            past_days,
            future_days,
        }
    }

    pub fn resolve(
        &self,
        schema: &str,
        plan: &ResolutionPlan,
        rng: &mut dyn RngCore,
        report: &mut ResolutionReport,
    ) -> Result<Record, GenerationError> {
        let mut resolved = Record::new();
        for step in &plan.steps {
            let value = self.evaluate(schema, &step.field, &step.kind, &resolved, rng, report)?;
            resolved.insert(step.field.clone(), value);
        }
        report.fields = resolved.len();
        report.plan_rebuilt = plan.rebuilt;
        report.overridden = plan.overridden().map(str::to_string).collect();
        report.skipped_overrides = plan.skipped.clone();
        Ok(resolved)
    }

    fn evaluate(
        &self,
        schema: &str,
        field: &str,
        kind: &FieldKind,
        resolved: &Record,
        rng: &mut dyn RngCore,
        report: &mut ResolutionReport,
    ) -> Result<MockValue, GenerationError> {
        match kind {
            FieldKind::Leaf(FieldSource::Literal(value)) => Ok(value.clone()),
            FieldKind::Leaf(FieldSource::Generator(spec)) => {
                let ctx = GeneratorContext {
                    schema,
                    field,
                    today: self.today,
                    now: self.now,
                    past_days: self.past_days,
                    future_days: self.future_days,
                    resolved,
                };
                let value = self.registry.generate(spec, &ctx, rng)?;
                report.record_generator_usage(spec.id());
                Ok(value)
            }
            FieldKind::Leaf(FieldSource::Derive { inputs, derive }) => {
                if let Some(missing) = inputs.iter().find(|input| !resolved.contains_key(*input)) {
                    return Err(MockError::UnresolvedDependency {
                        field: field.to_string(),
                        dependency: missing.clone(),
                    }
                    .into());
                }
                Ok(derive(resolved))
            }
            FieldKind::Conditional { branches, default } => {
                for (index, branch) in branches.iter().enumerate() {
                    if branch.condition.evaluate(field, resolved)? {
                        report.record_branch(field, format!("branch {index}"));
                        return self.evaluate(schema, field, &branch.then, resolved, rng, report);
                    }
                }
                match default {
                    Some(default) => {
                        report.record_branch(field, "default".to_string());
                        self.evaluate(schema, field, default, resolved, rng, report)
                    }
                    None => Err(MockError::NoBranchMatched {
                        field: field.to_string(),
                    }
                    .into()),
                }
            }
        }
    }
}
