use crate::error::RowTransformError;
use crate::idgen::IdGenerator;
use crate::lookup::{LookupMap, MapCache};
use crate::model::Entity;
use crate::row::Row;
use crate::INFORES_MONARCH;

/// Read-only view a transform gets for each row: the job's maps and its id generator.
pub struct TransformContext<'a> {
    maps: &'a MapCache,
    ids: &'a dyn IdGenerator,
}

impl<'a> TransformContext<'a> {
    pub fn new(maps: &'a MapCache, ids: &'a dyn IdGenerator) -> Self {
        TransformContext { maps, ids }
    }

    pub fn map(&self, name: &str) -> Result<&'a LookupMap, RowTransformError> {
        self.maps.get(name).ok_or_else(|| RowTransformError::MissingMap(name.to_string()))
    }

    pub fn next_id(&self) -> String {
        self.ids.next_id()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Skip(String),
}

/// A named predicate applied to a row before the transform body runs.
#[derive(Clone, Copy)]
pub struct Filter {
    pub name: &'static str,
    pub check: fn(&Row, &TransformContext) -> Result<Verdict, RowTransformError>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Filtered { stage: &'static str, reason: String },
    Emitted(Vec<Entity>),
}

pub trait Transform: Send + Sync {
    fn source(&self) -> &'static str;

    fn name(&self) -> &'static str;

    /// Registered `infores:` ids this transform may use as `primary_knowledge_source`.
    fn knowledge_sources(&self) -> &'static [&'static str];

    fn filters(&self) -> &'static [Filter] {
        &[]
    }

    fn transform(&self, row: &Row, ctx: &TransformContext) -> Result<Vec<Entity>, RowTransformError>;

    fn ingest_name(&self) -> String {
        format!("{}_{}", self.source(), self.name())
    }
}

/// Runs the filter stages in order, then the transform, then checks provenance on what came out.
pub fn apply(transform: &dyn Transform, row: &Row, ctx: &TransformContext) -> Result<Outcome, RowTransformError> {
    for filter in transform.filters().iter() {
        if let Verdict::Skip(reason) = (filter.check)(row, ctx)? {
            return Ok(Outcome::Filtered { stage: filter.name, reason });
        }
    }
    let entities = transform.transform(row, ctx)?;
    check_provenance(&entities, transform.knowledge_sources())?;
    Ok(Outcome::Emitted(entities))
}

pub fn check_provenance(entities: &[Entity], knowledge_sources: &[&str]) -> Result<(), RowTransformError> {
    for association in entities.iter().filter_map(Entity::as_association) {
        if !association.aggregator_knowledge_source.iter().any(|a| a == INFORES_MONARCH) {
            return Err(RowTransformError::Provenance { id: association.id.clone(), reason: format!("{} is not an aggregator", INFORES_MONARCH) });
        }
        if !knowledge_sources.contains(&association.primary_knowledge_source.as_str()) {
            return Err(RowTransformError::Provenance {
                id: association.id.clone(),
                reason: format!("primary source '{}' is not registered for this ingest", association.primary_knowledge_source),
            });
        }
    }
    Ok(())
}
