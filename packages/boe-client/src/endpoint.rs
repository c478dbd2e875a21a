//! Request targets: `{base}/{category}[/{resource_id}[/{subsection}]]`.

use std::fmt;

/// Top-level resource families exposed by the open-data API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceCategory {
    Legislation,
    BoeSummary,
    BormeSummary,
    AuxiliaryTables,
}

impl ResourceCategory {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Legislation => "legislacion-consolidada",
            Self::BoeSummary => "boe/sumario",
            Self::BormeSummary => "borme/sumario",
            Self::AuxiliaryTables => "tablas-auxiliares",
        }
    }
}

/// Sections of a consolidated law that can be fetched on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LawSection {
    Metadata,
    Analysis,
    EliMetadata,
    FullText,
    TextIndex,
    /// A single block of the text, e.g. `a1` (article 1) or `dd`.
    TextBlock(String),
}

impl LawSection {
    pub fn path(&self) -> String {
        match self {
            Self::Metadata => "metadatos".to_string(),
            Self::Analysis => "analisis".to_string(),
            Self::EliMetadata => "metadata-eli".to_string(),
            Self::FullText => "texto".to_string(),
            Self::TextIndex => "texto/indice".to_string(),
            Self::TextBlock(block_id) => format!("texto/bloque/{}", block_id),
        }
    }
}

/// Reference tables of codes (departments, legal ranks, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxiliaryTable {
    Departments,
    LegalRanges,
    Matters,
    Scopes,
    ConsolidationStates,
}

impl AuxiliaryTable {
    pub const ALL: [AuxiliaryTable; 5] = [
        Self::Departments,
        Self::LegalRanges,
        Self::Matters,
        Self::Scopes,
        Self::ConsolidationStates,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Departments => "departamentos",
            Self::LegalRanges => "rangos",
            Self::Matters => "materias",
            Self::Scopes => "ambitos",
            Self::ConsolidationStates => "estados-consolidacion",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.name() == name)
    }
}

/// A fully resolved target. Built per call, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
    category: ResourceCategory,
    resource_id: Option<String>,
    subsection: Option<String>,
}

impl Endpoint {
    pub fn new(base: impl Into<String>, category: ResourceCategory) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            category,
            resource_id: None,
            subsection: None,
        }
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Only meaningful together with a resource id.
    pub fn with_subsection(mut self, subsection: impl Into<String>) -> Self {
        self.subsection = Some(subsection.into());
        self
    }

    pub fn category(&self) -> ResourceCategory {
        self.category
    }

    pub fn url(&self) -> String {
        let mut url = format!("{}/{}", self.base, self.category.path());
        if let Some(resource_id) = &self.resource_id {
            url.push('/');
            url.push_str(resource_id);
            if let Some(subsection) = &self.subsection {
                url.push('/');
                url.push_str(subsection);
            }
        }
        url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}
