//! 关系：对用户的友好度与支配度

use serde::{Deserialize, Serialize};

use crate::mind::RelationshipModel;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub friendliness: f64,
    pub dominance: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSystem {
    relation: Relation,
}

impl RelationshipSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> String {
        format!(
            "Relationship: friendliness={:+.2} dominance={:+.2}",
            self.relation.friendliness, self.relation.dominance
        )
    }
}

impl RelationshipModel for RelationshipSystem {
    fn set_relation(&mut self, friendliness: Option<f64>, dominance: Option<f64>) {
        if let Some(f) = friendliness.filter(|f| f.is_finite()) {
            self.relation.friendliness = f.clamp(-1.0, 1.0);
        }
        if let Some(d) = dominance.filter(|d| d.is_finite()) {
            self.relation.dominance = d.clamp(-1.0, 1.0);
        }
    }

    fn relation(&self) -> Relation {
        self.relation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_relation_partial_and_clamped() {
        let mut rel = RelationshipSystem::new();
        rel.set_relation(Some(0.5), None);
        rel.set_relation(None, Some(-4.0));
        assert_eq!(
            rel.relation(),
            Relation {
                friendliness: 0.5,
                dominance: -1.0
            }
        );
    }

    #[test]
    fn test_non_finite_relation_ignored() {
        let mut rel = RelationshipSystem::new();
        rel.set_relation(Some(0.25), Some(0.5));
        rel.set_relation(Some(f64::NAN), Some(f64::NEG_INFINITY));
        assert_eq!(
            rel.relation(),
            Relation {
                friendliness: 0.25,
                dominance: 0.5
            }
        );
    }
}
