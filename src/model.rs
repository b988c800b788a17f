use itertools::Itertools;
use serde_derive::{Deserialize, Serialize};

use crate::{INFORES_MONARCH, MULTIVALUE_SEPARATOR};

pub const NODE_COLUMNS: [&str; 9] = ["id", "category", "name", "symbol", "synonym", "xref", "in_taxon", "type", "provided_by"];

pub const EDGE_COLUMNS: [&str; 11] = [
    "id",
    "category",
    "subject",
    "predicate",
    "object",
    "primary_knowledge_source",
    "aggregator_knowledge_source",
    "publications",
    "qualifiers",
    "knowledge_level",
    "agent_type",
];

pub mod category {
    pub const GENE: &str = "biolink:Gene";
    pub const PHENOTYPIC_FEATURE: &str = "biolink:PhenotypicFeature";
    pub const GENE_TO_PHENOTYPIC_FEATURE: &str = "biolink:GeneToPhenotypicFeatureAssociation";
    pub const GENE_TO_GENE_HOMOLOGY: &str = "biolink:GeneToGeneHomologyAssociation";
    pub const GENE_TO_EXPRESSION_SITE: &str = "biolink:GeneToExpressionSiteAssociation";
    pub const PUBLICATION_TO_NAMED_THING: &str = "biolink:InformationContentEntityToNamedThingAssociation";
}

pub mod predicate {
    pub const HAS_PHENOTYPE: &str = "biolink:has_phenotype";
    pub const ORTHOLOGOUS_TO: &str = "biolink:orthologous_to";
    pub const EXPRESSED_IN: &str = "biolink:expressed_in";
    pub const MENTIONS: &str = "biolink:mentions";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnowledgeLevel {
    KnowledgeAssertion,
    Observation,
}

impl KnowledgeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeLevel::KnowledgeAssertion => "knowledge_assertion",
            KnowledgeLevel::Observation => "observation",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgentType {
    ManualAgent,
    AutomatedAgent,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::ManualAgent => "manual_agent",
            AgentType::AutomatedAgent => "automated_agent",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Node {
    pub id: String,
    pub category: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub synonym: Option<Vec<String>>,
    pub xref: Option<Vec<String>>,
    pub in_taxon: Option<Vec<String>>,
    pub type_: Option<Vec<String>>,
    pub provided_by: Vec<String>,
}

impl Node {
    pub fn new<I: Into<String>, C: Into<String>>(id: I, category: C) -> Self {
        Node { id: id.into(), category: category.into(), ..Default::default() }
    }

    pub fn gene<I: Into<String>>(id: I) -> Self {
        Node::new(id, category::GENE)
    }

    pub fn with_taxon<T: Into<String>>(mut self, taxon: T) -> Self {
        self.in_taxon = Some(vec![taxon.into()]);
        self
    }

    pub fn with_provided_by<S: Into<String>>(mut self, source: S) -> Self {
        self.provided_by.push(source.into());
        self
    }

    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.category.clone(),
            self.name.clone().unwrap_or_default(),
            self.symbol.clone().unwrap_or_default(),
            join_optional(&self.synonym),
            join_optional(&self.xref),
            join_optional(&self.in_taxon),
            join_optional(&self.type_),
            self.provided_by.join(MULTIVALUE_SEPARATOR),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Association {
    pub id: String,
    pub category: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub primary_knowledge_source: String,
    pub aggregator_knowledge_source: Vec<String>,
    pub publications: Option<Vec<String>>,
    pub qualifiers: Option<Vec<String>>,
    pub knowledge_level: KnowledgeLevel,
    pub agent_type: AgentType,
}

impl Association {
    /// Every association starts out aggregated by Monarch; additional aggregators are appended.
    pub fn new(id: String, category: &str, subject: String, predicate: &str, object: String, primary_knowledge_source: &str) -> Self {
        Association {
            id,
            category: category.to_string(),
            subject,
            predicate: predicate.to_string(),
            object,
            primary_knowledge_source: primary_knowledge_source.to_string(),
            aggregator_knowledge_source: vec![INFORES_MONARCH.to_string()],
            publications: None,
            qualifiers: None,
            knowledge_level: KnowledgeLevel::KnowledgeAssertion,
            agent_type: AgentType::ManualAgent,
        }
    }

    pub fn with_aggregator(mut self, source: &str) -> Self {
        if !self.aggregator_knowledge_source.iter().any(|a| a == source) {
            self.aggregator_knowledge_source.push(source.to_string());
        }
        self
    }

    pub fn with_publications(mut self, publications: Vec<String>) -> Self {
        if !publications.is_empty() {
            self.publications = Some(publications);
        }
        self
    }

    pub fn with_qualifiers(mut self, qualifiers: Vec<String>) -> Self {
        if !qualifiers.is_empty() {
            self.qualifiers = Some(qualifiers);
        }
        self
    }

    pub fn with_levels(mut self, knowledge_level: KnowledgeLevel, agent_type: AgentType) -> Self {
        self.knowledge_level = knowledge_level;
        self.agent_type = agent_type;
        self
    }

    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.category.clone(),
            self.subject.clone(),
            self.predicate.clone(),
            self.object.clone(),
            self.primary_knowledge_source.clone(),
            self.aggregator_knowledge_source.join(MULTIVALUE_SEPARATOR),
            join_optional(&self.publications),
            join_optional(&self.qualifiers),
            self.knowledge_level.as_str().to_string(),
            self.agent_type.as_str().to_string(),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    Node(Node),
    Association(Association),
}

impl Entity {
    pub fn as_association(&self) -> Option<&Association> {
        match self {
            Entity::Association(a) => Some(a),
            Entity::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Entity::Node(n) => Some(n),
            Entity::Association(_) => None,
        }
    }
}

impl From<Node> for Entity {
    fn from(node: Node) -> Self {
        Entity::Node(node)
    }
}

impl From<Association> for Entity {
    fn from(association: Association) -> Self {
        Entity::Association(association)
    }
}

fn join_optional(values: &Option<Vec<String>>) -> String {
    values.as_ref().map(|v| v.iter().join(MULTIVALUE_SEPARATOR)).unwrap_or_default()
}

/// Read-side view of a KGX nodes file row.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize, Ord, PartialOrd)]
pub struct KgxNode {
    pub id: String,
    pub category: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Read-side view of a KGX edges file row.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize, Ord, PartialOrd)]
pub struct KgxEdge {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    #[serde(default)]
    pub primary_knowledge_source: String,
    #[serde(default)]
    pub aggregator_knowledge_source: Option<String>,
    #[serde(default)]
    pub knowledge_level: Option<String>,
    #[serde(default)]
    pub agent_type: Option<String>,
}
