//! Frequently consulted consolidated laws.
//!
//! Free-text search against the remote service is unreliable, so when a
//! search looks wrong the client points callers at these identifiers instead.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LawCategory {
    Fundamental,
    Organic,
    AdministrativeProcedure,
    Civil,
    Labour,
    Commercial,
    PublicProcurement,
    Procedural,
    IntellectualProperty,
    Consumer,
    Transparency,
    Equality,
    Education,
    Health,
}

impl LawCategory {
    pub const ALL: [LawCategory; 14] = [
        Self::Fundamental,
        Self::Organic,
        Self::AdministrativeProcedure,
        Self::Civil,
        Self::Labour,
        Self::Commercial,
        Self::PublicProcurement,
        Self::Procedural,
        Self::IntellectualProperty,
        Self::Consumer,
        Self::Transparency,
        Self::Equality,
        Self::Education,
        Self::Health,
    ];

    /// Short name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fundamental => "fundamental",
            Self::Organic => "organic",
            Self::AdministrativeProcedure => "procedure",
            Self::Civil => "civil",
            Self::Labour => "labour",
            Self::Commercial => "commercial",
            Self::PublicProcurement => "procurement",
            Self::Procedural => "procedural",
            Self::IntellectualProperty => "intellectual_property",
            Self::Consumer => "consumer",
            Self::Transparency => "transparency",
            Self::Equality => "equality",
            Self::Education => "education",
            Self::Health => "health",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|category| category.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WellKnownLaw {
    pub id: &'static str,
    pub title: &'static str,
    /// ISO date of publication.
    pub published: &'static str,
    pub category: LawCategory,
    pub description: &'static str,
}

const fn law(
    id: &'static str,
    title: &'static str,
    published: &'static str,
    category: LawCategory,
    description: &'static str,
) -> WellKnownLaw {
    WellKnownLaw {
        id,
        title,
        published,
        category,
        description,
    }
}

pub static WELL_KNOWN_LAWS: &[WellKnownLaw] = &[
    law("BOE-A-1978-31229", "Constitución Española", "1978-12-29", LawCategory::Fundamental,
        "Norma suprema del ordenamiento jurídico español"),
    law("BOE-A-1985-5392", "Ley Orgánica 6/1985 del Poder Judicial (LOPJ)", "1985-07-02", LawCategory::Organic,
        "Organización y funcionamiento del Poder Judicial"),
    law("BOE-A-2018-16673", "Ley Orgánica 3/2018 de Protección de Datos (LOPDGDD)", "2018-12-06", LawCategory::Organic,
        "Protección de datos personales y garantía de derechos digitales"),
    law("BOE-A-1995-25444", "Ley Orgánica 10/1995 del Código Penal", "1995-11-24", LawCategory::Organic,
        "Código Penal español"),
    law("BOE-A-2015-10565", "Ley 39/2015 del Procedimiento Administrativo Común", "2015-10-02", LawCategory::AdministrativeProcedure,
        "Procedimiento administrativo común de las Administraciones Públicas"),
    law("BOE-A-2015-10566", "Ley 40/2015 de Régimen Jurídico del Sector Público", "2015-10-02", LawCategory::AdministrativeProcedure,
        "Régimen jurídico del sector público"),
    law("BOE-A-1889-4763", "Real Decreto de 24 de julio de 1889 - Código Civil", "1889-07-25", LawCategory::Civil,
        "Código Civil español"),
    law("BOE-A-2000-323", "Ley 1/2000 de Enjuiciamiento Civil", "2000-01-08", LawCategory::Civil,
        "Ley de Enjuiciamiento Civil"),
    law("BOE-A-2015-11430", "Real Decreto Legislativo 2/2015 - Estatuto de los Trabajadores", "2015-10-24", LawCategory::Labour,
        "Texto refundido del Estatuto de los Trabajadores"),
    law("BOE-A-2015-11724", "Real Decreto Legislativo 5/2015 - Estatuto Básico del Empleado Público", "2015-10-31", LawCategory::Labour,
        "Texto refundido del Estatuto Básico del Empleado Público"),
    law("BOE-A-2010-10544", "Real Decreto Legislativo 1/2010 - Ley de Sociedades de Capital", "2010-07-03", LawCategory::Commercial,
        "Texto refundido de la Ley de Sociedades de Capital"),
    law("BOE-A-1885-6627", "Real Decreto de 22 de agosto de 1885 - Código de Comercio", "1885-10-16", LawCategory::Commercial,
        "Código de Comercio"),
    law("BOE-A-2017-12902", "Ley 9/2017 de Contratos del Sector Público", "2017-11-09", LawCategory::PublicProcurement,
        "Contratos del Sector Público"),
    law("BOE-A-1998-16718", "Ley 29/1998 de la Jurisdicción Contencioso-administrativa", "1998-07-14", LawCategory::Procedural,
        "Reguladora de la Jurisdicción Contencioso-administrativa"),
    law("BOE-A-1996-8930", "Real Decreto Legislativo 1/1996 - Ley de Propiedad Intelectual", "1996-04-22", LawCategory::IntellectualProperty,
        "Texto refundido de la Ley de Propiedad Intelectual"),
    law("BOE-A-2007-20555", "Real Decreto Legislativo 1/2007 - Ley General de Consumidores", "2007-11-30", LawCategory::Consumer,
        "Texto refundido de la Ley General para la Defensa de los Consumidores"),
    law("BOE-A-2013-12887", "Ley 19/2013 de Transparencia y Buen Gobierno", "2013-12-10", LawCategory::Transparency,
        "Transparencia, acceso a la información pública y buen gobierno"),
    law("BOE-A-2007-6115", "Ley Orgánica 3/2007 para la Igualdad Efectiva", "2007-03-23", LawCategory::Equality,
        "Igualdad efectiva de mujeres y hombres"),
    law("BOE-A-2020-17264", "Ley Orgánica 3/2020 de Educación (LOMLOE)", "2020-12-30", LawCategory::Education,
        "Ley Orgánica de modificación de la LOE"),
    law("BOE-A-1986-10499", "Ley 14/1986 General de Sanidad", "1986-04-29", LawCategory::Health,
        "Ley General de Sanidad"),
];

/// Suggested when nothing in the table matches the search.
const CORE_IDS: [&str; 8] = [
    "BOE-A-1978-31229",
    "BOE-A-2018-16673",
    "BOE-A-2015-10565",
    "BOE-A-2015-10566",
    "BOE-A-1889-4763",
    "BOE-A-1995-25444",
    "BOE-A-2015-11430",
    "BOE-A-2017-12902",
];

/// Search tokens shorter than this ("ley", "de") match nearly every entry.
const MIN_SUGGESTION_TOKEN: usize = 4;

pub fn lookup(id: &str) -> Option<&'static WellKnownLaw> {
    WELL_KNOWN_LAWS.iter().find(|law| law.id == id)
}

pub fn by_category(category: LawCategory) -> Vec<&'static WellKnownLaw> {
    WELL_KNOWN_LAWS
        .iter()
        .filter(|law| law.category == category)
        .collect()
}

/// Case-insensitive substring match over title and description.
pub fn search(keyword: &str) -> Vec<&'static WellKnownLaw> {
    let keyword = keyword.trim().to_lowercase();
    if keyword.is_empty() {
        return Vec::new();
    }
    WELL_KNOWN_LAWS
        .iter()
        .filter(|law| law.matches(&keyword))
        .collect()
}

pub fn core_laws() -> Vec<&'static WellKnownLaw> {
    CORE_IDS.iter().filter_map(|id| lookup(id)).collect()
}

/// Laws that mention any significant word of `search_text`, or the core set
/// when none do.
pub fn suggestions_for(search_text: &str) -> Vec<&'static WellKnownLaw> {
    let tokens: Vec<String> = search_text
        .split_whitespace()
        .filter(|token| token.chars().count() >= MIN_SUGGESTION_TOKEN)
        .map(str::to_lowercase)
        .collect();

    let hits: Vec<_> = WELL_KNOWN_LAWS
        .iter()
        .filter(|law| tokens.iter().any(|token| law.matches(token)))
        .collect();

    if hits.is_empty() {
        core_laws()
    } else {
        hits
    }
}

impl WellKnownLaw {
    /// `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.description.to_lowercase().contains(needle)
    }
}
