//! This module provides the Gene struct, representing a gene, and the Gpr enum, representing a
//! gene protein reaction rule
use std::fmt::{Display, Formatter};

use indexmap::IndexSet;
use thiserror::Error;

/// Structure Representing a Gene
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Gene {
    /// Used to identify the gene
    pub id: String,
    /// Human Readable Gene Name
    pub name: Option<String>,
    /// Whether this gene is currently active (see [`GeneActivity`])
    pub activity: GeneActivity,
}

impl Gene {
    /// Create a new active gene with only an id
    pub fn new(id: &str) -> Gene {
        Gene {
            id: id.to_string(),
            name: None,
            activity: GeneActivity::Active,
        }
    }
}

impl Display for Gene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Whether a gene is active or not
#[derive(Clone, Debug, Eq, PartialEq, Copy)]
pub enum GeneActivity {
    /// Gene is considered active
    Active,
    /// Gene is considered inactive
    Inactive,
}

// region GPR Functionality
/// Representation of a Gene Protein Reaction Rule as an AST
///
/// Gene nodes hold the gene id, activity is looked up when the rule is evaluated.
#[derive(Clone, Debug, PartialEq)]
pub enum Gpr {
    /// Operation on one or two sub-rules (see [`GprOperation`])
    Operation(GprOperation),
    /// A terminal gene node
    GeneNode(String),
}

/// Possible operations on genes
#[derive(Clone, Debug, PartialEq)]
pub enum GprOperation {
    Or { left: Box<Gpr>, right: Box<Gpr> },
    And { left: Box<Gpr>, right: Box<Gpr> },
    Not { val: Box<Gpr> },
}

impl Gpr {
    /// Create a new `left or right` node
    pub fn or(left: Gpr, right: Gpr) -> Gpr {
        Gpr::Operation(GprOperation::Or {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Create a new `left and right` node
    pub fn and(left: Gpr, right: Gpr) -> Gpr {
        Gpr::Operation(GprOperation::And {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Create a new `not val` node
    pub fn not(val: Gpr) -> Gpr {
        Gpr::Operation(GprOperation::Not { val: Box::new(val) })
    }

    /// Create a new gene node
    pub fn gene(id: &str) -> Gpr {
        Gpr::GeneNode(id.to_string())
    }

    /// Evaluate the rule, looking up the activity of each gene with `activity`
    pub fn eval<F>(&self, activity: &F) -> Result<GeneActivity, GprError>
    where
        F: Fn(&str) -> Option<GeneActivity>,
    {
        match self {
            Gpr::Operation(GprOperation::Or { left, right }) => {
                let l = left.eval(activity)?;
                let r = right.eval(activity)?;
                if l == GeneActivity::Active || r == GeneActivity::Active {
                    Ok(GeneActivity::Active)
                } else {
                    Ok(GeneActivity::Inactive)
                }
            }
            Gpr::Operation(GprOperation::And { left, right }) => {
                let l = left.eval(activity)?;
                let r = right.eval(activity)?;
                if l == GeneActivity::Active && r == GeneActivity::Active {
                    Ok(GeneActivity::Active)
                } else {
                    Ok(GeneActivity::Inactive)
                }
            }
            Gpr::Operation(GprOperation::Not { val }) => match val.eval(activity)? {
                GeneActivity::Active => Ok(GeneActivity::Inactive),
                GeneActivity::Inactive => Ok(GeneActivity::Active),
            },
            Gpr::GeneNode(gene) => {
                activity(gene).ok_or_else(|| GprError::GeneNotFound(gene.clone()))
            }
        }
    }

    /// Does this rule reference the gene `id`
    pub fn references(&self, id: &str) -> bool {
        match self {
            Gpr::Operation(GprOperation::Or { left, right })
            | Gpr::Operation(GprOperation::And { left, right }) => {
                left.references(id) || right.references(id)
            }
            Gpr::Operation(GprOperation::Not { val }) => val.references(id),
            Gpr::GeneNode(gene) => gene == id,
        }
    }

    /// Collect the ids of every gene in the rule
    pub fn genes(&self) -> IndexSet<String> {
        let mut genes = IndexSet::new();
        self.collect_genes(&mut genes);
        genes
    }

    fn collect_genes(&self, genes: &mut IndexSet<String>) {
        match self {
            Gpr::Operation(GprOperation::Or { left, right })
            | Gpr::Operation(GprOperation::And { left, right }) => {
                left.collect_genes(genes);
                right.collect_genes(genes);
            }
            Gpr::Operation(GprOperation::Not { val }) => val.collect_genes(genes),
            Gpr::GeneNode(gene) => {
                genes.insert(gene.clone());
            }
        }
    }

    /// Generate a GPR string with gene ids from the GPR AST
    pub fn to_string_id(&self) -> String {
        match self {
            Gpr::Operation(GprOperation::Or { left, right }) => {
                format!("({} or {})", left.to_string_id(), right.to_string_id())
            }
            Gpr::Operation(GprOperation::And { left, right }) => {
                format!("({} and {})", left.to_string_id(), right.to_string_id())
            }
            Gpr::Operation(GprOperation::Not { val }) => format!("(not {})", val),
            Gpr::GeneNode(gene) => gene.to_string(),
        }
    }
}

impl Display for Gpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_id())
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GprError {
    #[error("Gene {0} in GPR is not present in the model")]
    GeneNotFound(String),
}
// endregion GPR Functionality

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(id: &str) -> Option<GeneActivity> {
        match id {
            "active1" | "active2" => Some(GeneActivity::Active),
            "inactive1" | "inactive2" => Some(GeneActivity::Inactive),
            _ => None,
        }
    }

    #[test]
    fn gene_node() {
        assert_eq!(Gpr::gene("active1").eval(&lookup), Ok(GeneActivity::Active));
        assert_eq!(
            Gpr::gene("inactive1").eval(&lookup),
            Ok(GeneActivity::Inactive)
        );
        assert_eq!(
            Gpr::gene("missing").eval(&lookup),
            Err(GprError::GeneNotFound("missing".to_string()))
        );
    }

    #[test]
    fn and_node() {
        let both = Gpr::and(Gpr::gene("active1"), Gpr::gene("active2"));
        assert_eq!(both.eval(&lookup), Ok(GeneActivity::Active));
        let mixed = Gpr::and(Gpr::gene("active1"), Gpr::gene("inactive1"));
        assert_eq!(mixed.eval(&lookup), Ok(GeneActivity::Inactive));
    }

    #[test]
    fn or_node() {
        let mixed = Gpr::or(Gpr::gene("active1"), Gpr::gene("inactive1"));
        assert_eq!(mixed.eval(&lookup), Ok(GeneActivity::Active));
        let neither = Gpr::or(Gpr::gene("inactive1"), Gpr::gene("inactive2"));
        assert_eq!(neither.eval(&lookup), Ok(GeneActivity::Inactive));
    }

    #[test]
    fn not_node() {
        assert_eq!(
            Gpr::not(Gpr::gene("active1")).eval(&lookup),
            Ok(GeneActivity::Inactive)
        );
        assert_eq!(
            Gpr::not(Gpr::gene("inactive1")).eval(&lookup),
            Ok(GeneActivity::Active)
        );
    }

    #[test]
    fn references_and_genes() {
        let gpr = Gpr::or(
            Gpr::and(Gpr::gene("g1"), Gpr::gene("g2")),
            Gpr::not(Gpr::gene("g3")),
        );
        assert!(gpr.references("g3"));
        assert!(!gpr.references("g4"));
        let genes: Vec<String> = gpr.genes().into_iter().collect();
        assert_eq!(genes, vec!["g1", "g2", "g3"]);
    }

    #[test]
    fn display() {
        let gpr = Gpr::or(Gpr::gene("Active1"), Gpr::gene("Active2"));
        assert_eq!(format!("{}", gpr), "(Active1 or Active2)");
        let nested = Gpr::or(
            Gpr::and(Gpr::gene("Rv0001"), Gpr::not(Gpr::gene("Rv0002"))),
            Gpr::gene("Rv0003"),
        );
        assert_eq!(
            format!("{}", nested),
            "((Rv0001 and (not Rv0002)) or Rv0003)"
        );
    }
}
