use crate::config::EngineConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Turns a branch, product, group or collector code into a display name.
pub trait Resolve {
    fn lookup(&self, code: &str) -> Option<&str>;

    fn fallback(&self, code: &str) -> String;

    fn resolve(&self, code: &str) -> String {
        match self.lookup(code) {
            Some(name) => name.to_string(),
            None => self.fallback(code),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum CodeDomain {
    Branch,
    Product,
    Group,
    Collector,
}

impl CodeDomain {
    pub fn fallback_label(&self, code: &str) -> String {
        match self {
            CodeDomain::Branch => format!("Branch {}", code),
            CodeDomain::Product => format!("Product {}", code),
            CodeDomain::Group => format!("Group {}", code),
            CodeDomain::Collector => code.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeMapping {
    domain: CodeDomain,
    names: BTreeMap<String, String>,
}

impl CodeMapping {
    pub fn new(domain: CodeDomain) -> Self {
        Self {
            domain,
            names: BTreeMap::new(),
        }
    }

    pub fn from_pairs<I, K, V>(domain: CodeDomain, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            domain,
            names: pairs
                .into_iter()
                .map(|(code, name)| (code.into(), name.into()))
                .collect(),
        }
    }

    /// Branch mapping with the configured head-office/consolidation codes removed.
    pub fn branches<I, K, V>(pairs: I, config: &EngineConfig) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut mapping = Self::from_pairs(CodeDomain::Branch, pairs);
        mapping
            .names
            .retain(|code, _| !config.excluded_branch_codes.iter().any(|x| x == code));
        mapping
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}

impl Resolve for CodeMapping {
    fn lookup(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    fn fallback(&self, code: &str) -> String {
        self.domain.fallback_label(code)
    }
}

/// Product names for a two-series portfolio: series A's catalogue wins, then B's.
#[derive(Debug, Clone, Copy)]
pub struct ProductCatalog<'a> {
    pub a: &'a CodeMapping,
    pub b: &'a CodeMapping,
}

impl Resolve for ProductCatalog<'_> {
    fn lookup(&self, code: &str) -> Option<&str> {
        self.a.lookup(code).or_else(|| self.b.lookup(code))
    }

    fn fallback(&self, code: &str) -> String {
        CodeDomain::Product.fallback_label(code)
    }
}

/// Every lookup an analysis needs, fetched once per request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeMappings {
    pub branches: CodeMapping,
    pub products_a: CodeMapping,
    pub products_b: CodeMapping,
    pub group1: CodeMapping,
    pub group2: CodeMapping,
    pub collectors: CodeMapping,
}

impl CodeMappings {
    pub fn products(&self) -> ProductCatalog<'_> {
        ProductCatalog {
            a: &self.products_a,
            b: &self.products_b,
        }
    }
}

impl Default for CodeMappings {
    fn default() -> Self {
        Self {
            branches: CodeMapping::new(CodeDomain::Branch),
            products_a: CodeMapping::new(CodeDomain::Product),
            products_b: CodeMapping::new(CodeDomain::Product),
            group1: CodeMapping::new(CodeDomain::Group),
            group2: CodeMapping::new(CodeDomain::Group),
            collectors: CodeMapping::new(CodeDomain::Collector),
        }
    }
}
